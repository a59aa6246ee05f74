use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client as HttpClient;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{tmdb::TmdbPosterResponse, ContentItem, ImageRef, TmdbMedia},
};

const POSTER_CACHE_TTL: u64 = 604800; // 1 week

/// Where poster paths come from
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PosterSource: Send + Sync {
    /// Poster path for an image-catalog item, `None` when the item has no poster
    async fn poster_path(&self, media: TmdbMedia, id: u64) -> AppResult<Option<String>>;
}

/// TMDB client reading `poster_path` from the movie and tv endpoints
#[derive(Clone)]
pub struct TmdbPosterClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbPosterClient {
    pub fn new(http_client: HttpClient, cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }
}

#[async_trait::async_trait]
impl PosterSource for TmdbPosterClient {
    async fn poster_path(&self, media: TmdbMedia, id: u64) -> AppResult<Option<String>> {
        cached!(
            self.cache,
            CacheKey::Poster(media, id),
            POSTER_CACHE_TTL,
            async move {
                let url = format!("{}/{}/{}", self.api_url, media.path_segment(), id);
                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("api_key", &self.api_key)])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(AppError::UpstreamUnavailable(format!(
                        "TMDB returned status {} for {} {}",
                        response.status(),
                        media.path_segment(),
                        id
                    )));
                }

                let body: TmdbPosterResponse = response.json().await.map_err(|e| {
                    AppError::UpstreamMalformed(format!("Failed to parse TMDB response: {}", e))
                })?;

                Ok::<_, AppError>(body.poster_path)
            }
        )
    }
}

/// Fills in poster URLs from the image catalog
///
/// Never fails: a missing reference, a missing poster or a failed lookup all yield `""`.
#[derive(Clone)]
pub struct PosterEnricher {
    source: Arc<dyn PosterSource>,
    image_base_url: String,
    size: String,
}

impl PosterEnricher {
    pub fn new(source: Arc<dyn PosterSource>, image_base_url: String, size: String) -> Self {
        Self {
            source,
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
            size,
        }
    }

    /// Same source and base URL, different size token
    pub fn with_size(&self, size: impl Into<String>) -> Self {
        Self {
            source: Arc::clone(&self.source),
            image_base_url: self.image_base_url.clone(),
            size: size.into(),
        }
    }

    fn compose_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.image_base_url,
            self.size,
            path.trim_start_matches('/')
        )
    }

    pub async fn poster_url(&self, image_ref: Option<&ImageRef>) -> String {
        let Some(image_ref) = image_ref else {
            return String::new();
        };

        match self.source.poster_path(image_ref.media, image_ref.id).await {
            Ok(Some(path)) if !path.is_empty() => self.compose_url(&path),
            Ok(_) => String::new(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    media = image_ref.media.path_segment(),
                    tmdb_id = image_ref.id,
                    "Poster lookup failed"
                );
                String::new()
            }
        }
    }

    /// Sets the poster of an item whose catalog delegates artwork; other items pass through
    pub async fn enrich_one(&self, mut item: ContentItem) -> ContentItem {
        if item.kind.uses_external_artwork() {
            item.poster = Some(self.poster_url(item.image_ref.as_ref()).await);
        }
        item
    }

    /// Enriches all items concurrently, keeping their order
    pub async fn enrich(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        join_all(items.into_iter().map(|item| self.enrich_one(item))).await
    }
}
