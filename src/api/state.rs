use std::sync::Arc;

use crate::{
    db::{RegistryStore, SourceStore},
    error::AppResult,
    models::ContentKind,
    services::{CatalogProvider, PosterEnricher},
};

/// One provider per catalog kind
#[derive(Clone)]
pub struct Catalogs {
    anime: Arc<dyn CatalogProvider>,
    movies: Arc<dyn CatalogProvider>,
    shows: Arc<dyn CatalogProvider>,
}

impl Catalogs {
    pub fn new(
        anime: Arc<dyn CatalogProvider>,
        movies: Arc<dyn CatalogProvider>,
        shows: Arc<dyn CatalogProvider>,
    ) -> Self {
        Self {
            anime,
            movies,
            shows,
        }
    }

    pub fn get(&self, kind: ContentKind) -> &Arc<dyn CatalogProvider> {
        match kind {
            ContentKind::Anime => &self.anime,
            ContentKind::Movie => &self.movies,
            ContentKind::Show => &self.shows,
        }
    }

    /// Resolves a route segment (`anime`, `movies`, `shows`) to its provider
    pub fn from_segment(&self, segment: &str) -> AppResult<&Arc<dyn CatalogProvider>> {
        ContentKind::from_catalog(segment).map(|kind| self.get(kind))
    }
}

/// Shared application state
///
/// Every client is built once at start-up and shared by reference counting.
#[derive(Clone)]
pub struct AppState {
    pub registries: Arc<dyn RegistryStore>,
    pub sources: Arc<dyn SourceStore>,
    pub catalogs: Catalogs,
    /// Listing-size posters
    pub posters: PosterEnricher,
    /// Detail-size posters
    pub detail_posters: PosterEnricher,
    pub admin_group: String,
}
