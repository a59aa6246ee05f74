use futures::future::join_all;

use crate::{
    db::RegistryStore,
    error::AppResult,
    models::{CatalogPage, DetailRecord, ItemId, PageParams, RegistryKind},
    services::{exclusion::exclude_registered, poster::PosterEnricher, providers::CatalogProvider},
};

/// The user and recommend source a listing is screened for
#[derive(Debug, Clone, Copy)]
pub struct Viewer<'a> {
    pub user_id: &'a str,
    pub source_id: &'a str,
}

const SCREENED_REGISTRIES: [RegistryKind; 2] = [RegistryKind::Ignore, RegistryKind::Favorite];

/// Drops registered items for a known viewer, then fills in posters
async fn screen(
    store: &dyn RegistryStore,
    enricher: &PosterEnricher,
    viewer: Option<Viewer<'_>>,
    page: CatalogPage,
) -> AppResult<CatalogPage> {
    let CatalogPage { items, pagination } = page;

    let items = match viewer {
        Some(viewer) => {
            exclude_registered(
                store,
                viewer.user_id,
                viewer.source_id,
                &SCREENED_REGISTRIES,
                items,
            )
            .await?
        }
        None => items,
    };

    Ok(CatalogPage {
        items: enricher.enrich(items).await,
        pagination,
    })
}

/// Catalog search with registered items removed for the viewer
pub async fn search_candidates(
    provider: &dyn CatalogProvider,
    store: &dyn RegistryStore,
    enricher: &PosterEnricher,
    query: &str,
    page: PageParams,
    viewer: Option<Viewer<'_>>,
) -> AppResult<CatalogPage> {
    let candidates = provider.search(query, page).await?;
    screen(store, enricher, viewer, candidates).await
}

/// Trending items with registered items removed for the viewer
pub async fn trending(
    provider: &dyn CatalogProvider,
    store: &dyn RegistryStore,
    enricher: &PosterEnricher,
    page: PageParams,
    viewer: Option<Viewer<'_>>,
) -> AppResult<CatalogPage> {
    let candidates = provider.trending(page).await?;
    screen(store, enricher, viewer, candidates).await
}

/// Detail records for `item_ids`, in request order
///
/// Ids the catalog does not know, and ids whose fetch fails, are left out.
pub async fn detail(
    provider: &dyn CatalogProvider,
    enricher: &PosterEnricher,
    item_ids: &[ItemId],
) -> Vec<DetailRecord> {
    let fetches = item_ids.iter().map(|item_id| async move {
        match provider.fetch_detail(item_id).await {
            Ok(Some(item)) => Some(DetailRecord {
                item_id: item_id.clone(),
                data: enricher.enrich_one(item).await,
            }),
            Ok(None) => {
                tracing::debug!(provider = provider.name(), item_id = %item_id, "Item not found");
                None
            }
            Err(e) => {
                tracing::warn!(
                    provider = provider.name(),
                    item_id = %item_id,
                    error = %e,
                    "Detail fetch failed"
                );
                None
            }
        }
    });

    join_all(fetches).await.into_iter().flatten().collect()
}
