/// Jikan (MyAnimeList) API provider
///
/// No API key. Lists come wrapped in `{"data": [...], "pagination": {...}}`, so pagination is
/// read from the body and mapped onto the same fields the Trakt headers fill.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        jikan::{JikanAnime, JikanPagination, JikanRecommendation},
        CatalogPage, ContentItem, ContentKind, ItemId, PageParams, Pagination,
    },
    services::providers::{
        decode_list, ensure_success, item_list, read_body, transport_error, CatalogProvider,
    },
};
use reqwest::{Client as HttpClient, StatusCode};

const PROVIDER: &str = "jikan";
const RELATED_LIMIT: usize = 20;
const DETAIL_CACHE_TTL: u64 = 86400; // 1 day

#[derive(Clone)]
pub struct JikanProvider {
    http_client: HttpClient,
    api_url: String,
    cache: Cache,
}

impl JikanProvider {
    pub fn new(http_client: HttpClient, cache: Cache, api_url: String) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get_json(&self, request: reqwest::RequestBuilder) -> AppResult<serde_json::Value> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        read_body(PROVIDER, ensure_success(PROVIDER, response).await?).await
    }

    /// Maps a `{data, pagination}` list body onto a catalog page
    fn parse_page(body: &serde_json::Value) -> CatalogPage {
        let items = decode_list(PROVIDER, item_list(PROVIDER, body, "/data"), |anime: JikanAnime| {
            Some(anime.into())
        });

        let pagination = body
            .get("pagination")
            .cloned()
            .and_then(|raw| serde_json::from_value::<JikanPagination>(raw).ok())
            .map(Pagination::from)
            .filter(|pagination| !pagination.is_empty());

        CatalogPage { items, pagination }
    }
}

#[async_trait::async_trait]
impl CatalogProvider for JikanProvider {
    async fn search(&self, query: &str, page: PageParams) -> AppResult<CatalogPage> {
        let request = self
            .http_client
            .get(self.endpoint("/anime"))
            .query(&[("q", query)])
            .query(&[("page", page.page), ("limit", page.limit)]);

        let result = Self::parse_page(&self.get_json(request).await?);

        tracing::info!(
            query = %query,
            results = result.items.len(),
            provider = PROVIDER,
            "Catalog search completed"
        );

        Ok(result)
    }

    async fn trending(&self, page: PageParams) -> AppResult<CatalogPage> {
        let request = self
            .http_client
            .get(self.endpoint("/top/anime"))
            .query(&[("filter", "airing")])
            .query(&[("page", page.page), ("limit", page.limit)]);

        let result = Self::parse_page(&self.get_json(request).await?);

        tracing::info!(
            results = result.items.len(),
            provider = PROVIDER,
            "Trending fetched"
        );

        Ok(result)
    }

    async fn related(&self, seed: &ItemId) -> AppResult<Vec<ContentItem>> {
        let request = self
            .http_client
            .get(self.endpoint(&format!("/anime/{}/recommendations", seed)));

        let body = self.get_json(request).await?;
        let mut items = decode_list(
            PROVIDER,
            item_list(PROVIDER, &body, "/data"),
            |recommendation: JikanRecommendation| Some(recommendation.into()),
        );
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
            CacheKey::Detail(ContentKind::Anime, item_id.clone()),
            DETAIL_CACHE_TTL,
            async move {
                let response = self
                    .http_client
                    .get(self.endpoint(&format!("/anime/{}", item_id)))
                    .send()
                    .await
                    .map_err(|e| transport_error(PROVIDER, e))?;

                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }

                let body: serde_json::Value = ensure_success(PROVIDER, response)
                    .await?
                    .json()
                    .await
                    .map_err(|e| transport_error(PROVIDER, e))?;

                let anime: JikanAnime = body
                    .get("data")
                    .cloned()
                    .ok_or_else(|| {
                        AppError::UpstreamMalformed("Jikan detail has no data".to_string())
                    })
                    .and_then(|data| {
                        serde_json::from_value(data).map_err(|e| {
                            AppError::UpstreamMalformed(format!(
                                "Failed to parse Jikan detail: {}",
                                e
                            ))
                        })
                    })?;

                Ok::<_, AppError>(Some(anime.into()))
            }
        )
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_page_with_pagination() {
        let body = json!({
            "pagination": {
                "last_visible_page": 12,
                "has_next_page": true,
                "current_page": 1,
                "items": {"count": 2, "total": 24, "per_page": 2}
            },
            "data": [
                {"mal_id": 52991, "title": "Sousou no Frieren", "year": 2023},
                {"mal_id": 5114, "title": "Fullmetal Alchemist: Brotherhood", "year": 2009}
            ]
        });

        let page = JikanProvider::parse_page(&body);

        let ids: Vec<ItemId> = page.items.iter().map(|item| item.id.clone()).collect();
        assert_eq!(ids, vec![ItemId::Numeric(52991), ItemId::Numeric(5114)]);

        let pagination = page.pagination.unwrap();
        assert_eq!(pagination.page.as_deref(), Some("1"));
        assert_eq!(pagination.page_count.as_deref(), Some("12"));
        assert_eq!(pagination.item_count.as_deref(), Some("24"));
    }

    #[test]
    fn test_parse_page_without_data_is_empty() {
        let body = json!({"status": 429, "message": "Too Many Requests"});
        let page = JikanProvider::parse_page(&body);

        assert!(page.items.is_empty());
        assert_eq!(page.pagination, None);
    }

    #[test]
    fn test_parse_page_skips_entries_without_id() {
        let body = json!({"data": [
            {"title": "No id"},
            {"mal_id": 1, "title": "Cowboy Bebop"}
        ]});

        let page = JikanProvider::parse_page(&body);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Cowboy Bebop");
    }

    #[tokio::test]
    async fn test_endpoint_and_kind() {
        let client = crate::db::create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client);
        let provider = JikanProvider::new(
            reqwest::Client::new(),
            cache,
            "https://api.jikan.moe/v4/".to_string(),
        );

        assert_eq!(
            provider.endpoint("/top/anime"),
            "https://api.jikan.moe/v4/top/anime"
        );
        assert_eq!(provider.name(), "jikan");
    }
}
