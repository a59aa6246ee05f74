/// Trakt API provider
///
/// Serves both the movie and the show catalog; the two differ only by path segment.
/// Items are keyed by their Trakt id and carry the TMDB id as their image reference.
///
/// API Flow:
/// 1. Search: /search/{movie|show}?query → relevance envelopes, pagination in headers
/// 2. Trending: /{movies|shows}/trending → watcher envelopes, pagination in headers
/// 3. Related: /{movies|shows}/{id}/related → bare records
/// 4. Detail: /{movies|shows}/{id} → bare record
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        trakt::{TraktListEntry, TraktMedia},
        CatalogPage, ContentItem, ContentKind, ItemId, PageParams, Pagination,
    },
    services::providers::{
        decode_list, ensure_success, item_list, read_body, transport_error, CatalogProvider,
    },
};
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};

const PROVIDER: &str = "trakt";
const API_VERSION: &str = "2";
const RELATED_LIMIT: usize = 15;
const DETAIL_CACHE_TTL: u64 = 86400; // 1 day

#[derive(Clone)]
pub struct TraktProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    kind: ContentKind,
    cache: Cache,
}

impl TraktProvider {
    /// Trakt movie catalog
    pub fn movies(http_client: HttpClient, cache: Cache, api_key: String, api_url: String) -> Self {
        Self::new(http_client, cache, api_key, api_url, ContentKind::Movie)
    }

    /// Trakt show catalog
    pub fn shows(http_client: HttpClient, cache: Cache, api_key: String, api_url: String) -> Self {
        Self::new(http_client, cache, api_key, api_url, ContentKind::Show)
    }

    fn new(
        http_client: HttpClient,
        cache: Cache,
        api_key: String,
        api_url: String,
        kind: ContentKind,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            kind,
            cache,
        }
    }

    /// Collection segment: `movies` or `shows`
    fn collection(&self) -> &'static str {
        match self.kind {
            ContentKind::Show => "shows",
            _ => "movies",
        }
    }

    /// Search type segment: `movie` or `show`
    fn search_type(&self) -> &'static str {
        match self.kind {
            ContentKind::Show => "show",
            _ => "movie",
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// GET request with the Trakt client headers
    fn get(&self, path: &str) -> RequestBuilder {
        self.http_client
            .get(self.endpoint(path))
            .header("Content-Type", "application/json")
            .header("trakt-api-version", API_VERSION)
            .header("trakt-api-key", &self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        ensure_success(PROVIDER, response).await
    }

    /// Fetches a list endpoint, forwarding pagination headers
    async fn fetch_page(&self, request: RequestBuilder) -> AppResult<CatalogPage> {
        let response = self.send(request).await?;
        let pagination = Pagination::from_headers(response.headers());
        let body = read_body(PROVIDER, response).await?;

        let kind = self.kind;
        let items = decode_list(PROVIDER, item_list(PROVIDER, &body, ""), |entry: TraktListEntry| {
            entry.into_item(kind)
        });

        Ok(CatalogPage { items, pagination })
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TraktProvider {
    async fn search(&self, query: &str, page: PageParams) -> AppResult<CatalogPage> {
        let request = self
            .get(&format!("/search/{}", self.search_type()))
            .query(&[("query", query), ("extended", "full")])
            .query(&[("page", page.page), ("limit", page.limit)]);

        let result = self.fetch_page(request).await?;

        tracing::info!(
            query = %query,
            results = result.items.len(),
            provider = PROVIDER,
            kind = %self.kind,
            "Catalog search completed"
        );

        Ok(result)
    }

    async fn trending(&self, page: PageParams) -> AppResult<CatalogPage> {
        let request = self
            .get(&format!("/{}/trending", self.collection()))
            .query(&[("extended", "full")])
            .query(&[("page", page.page), ("limit", page.limit)]);

        let result = self.fetch_page(request).await?;

        tracing::info!(
            results = result.items.len(),
            provider = PROVIDER,
            kind = %self.kind,
            "Trending fetched"
        );

        Ok(result)
    }

    async fn related(&self, seed: &ItemId) -> AppResult<Vec<ContentItem>> {
        let limit = RELATED_LIMIT.to_string();
        let request = self
            .get(&format!("/{}/{}/related", self.collection(), seed))
            .query(&[("extended", "full"), ("limit", limit.as_str())]);

        let body = read_body(PROVIDER, self.send(request).await?).await?;

        let kind = self.kind;
        let mut items = decode_list(PROVIDER, item_list(PROVIDER, &body, ""), |media: TraktMedia| {
            Some(media.into_item(kind))
        });
        items.truncate(RELATED_LIMIT);

        tracing::info!(
            seed = %seed,
            results = items.len(),
            provider = PROVIDER,
            "Related items fetched"
        );

        Ok(items)
    }

    async fn fetch_detail(&self, item_id: &ItemId) -> AppResult<Option<ContentItem>> {
        cached!(
            self.cache,
            CacheKey::Detail(self.kind, item_id.clone()),
            DETAIL_CACHE_TTL,
            async move {
                let request = self
                    .get(&format!("/{}/{}", self.collection(), item_id))
                    .query(&[("extended", "full")]);

                let response = request
                    .send()
                    .await
                    .map_err(|e| transport_error(PROVIDER, e))?;

                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }

                let response = ensure_success(PROVIDER, response).await?;
                let media: TraktMedia = response.json().await.map_err(|e| {
                    AppError::UpstreamMalformed(format!("Failed to parse Trakt detail: {}", e))
                })?;

                Ok::<_, AppError>(Some(media.into_item(self.kind)))
            }
        )
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
