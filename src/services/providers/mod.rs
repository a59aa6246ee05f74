//! Content catalog provider abstraction
//!
//! One trait covers the anime catalog (Jikan) and the movie and show catalogs (Trakt). Each
//! implementation knows its own base URL, headers and item envelope, and hands back
//! [`ContentItem`]s whose `id` is the registry item key and whose `image_ref` points at the
//! image catalog when the item has one.

use crate::{
    error::{AppError, AppResult},
    models::{CatalogPage, ContentItem, ItemId, PageParams},
};

pub mod jikan;
pub mod trakt;

pub use jikan::JikanProvider;
pub use trakt::TraktProvider;

/// Trait for content catalogs
///
/// Whole-batch calls (`search`, `trending`, `related`) fail with `UpstreamUnavailable` on
/// transport errors and non-success statuses. None of them retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Search the catalog; an empty query returns the catalog's generic top results
    async fn search(&self, query: &str, page: PageParams) -> AppResult<CatalogPage>;

    /// Currently trending items
    async fn trending(&self, page: PageParams) -> AppResult<CatalogPage>;

    /// Items related to `seed`, capped by the provider
    async fn related(&self, seed: &ItemId) -> AppResult<Vec<ContentItem>>;

    /// Detail record for one item, `None` when the catalog has no such item
    async fn fetch_detail(&self, item_id: &ItemId) -> AppResult<Option<ContentItem>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Turns a non-success upstream response into `UpstreamUnavailable`
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::UpstreamUnavailable(format!(
        "{} API returned status {}: {}",
        provider, status, body
    )))
}

/// Wraps a transport error from a whole-batch call
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> AppError {
    AppError::UpstreamUnavailable(format!("{} request failed: {}", provider, error))
}

/// Reads a success body as JSON
///
/// Only transport failures are errors. A body that is not JSON is malformed and reads as
/// `null`, which [`item_list`] then treats as an empty list.
pub(crate) async fn read_body(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<serde_json::Value> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(provider, e))?;
    Ok(parse_body(provider, &bytes))
}

fn parse_body(provider: &str, bytes: &[u8]) -> serde_json::Value {
    match serde_json::from_slice(bytes) {
        Ok(body) => body,
        Err(e) => {
            let malformed =
                AppError::UpstreamMalformed(format!("{} response is not JSON: {}", provider, e));
            tracing::warn!(provider, error = %malformed, "Treating malformed response as empty");
            serde_json::Value::Null
        }
    }
}

/// Decodes every element of `list` with `convert`, skipping elements that do not decode
pub(crate) fn decode_list<T, F>(provider: &str, list: &[serde_json::Value], convert: F) -> Vec<ContentItem>
where
    T: serde::de::DeserializeOwned,
    F: Fn(T) -> Option<ContentItem>,
{
    list.iter()
        .filter_map(|value| match serde_json::from_value::<T>(value.clone()) {
            Ok(decoded) => convert(decoded),
            Err(e) => {
                tracing::debug!(provider, error = %e, "Skipping undecodable catalog entry");
                None
            }
        })
        .collect()
}

/// The item list of a response body, or an empty list when the shape is not what we expect
///
/// `pointer` is a JSON pointer to the list; `""` means the body itself is the list.
pub(crate) fn item_list<'a>(
    provider: &str,
    body: &'a serde_json::Value,
    pointer: &str,
) -> &'a [serde_json::Value] {
    match body.pointer(pointer).and_then(|list| list.as_array()) {
        Some(list) => list,
        None => {
            let malformed = AppError::UpstreamMalformed(format!(
                "{} response has no item list at '{}'",
                provider, pointer
            ));
            tracing::warn!(provider, error = %malformed, "Treating malformed response as empty");
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{trakt::TraktMedia, ContentKind};
    use serde_json::json;

    #[test]
    fn test_item_list_at_root() {
        let body = json!([{"a": 1}, {"a": 2}]);
        assert_eq!(item_list("trakt", &body, "").len(), 2);
    }

    #[test]
    fn test_item_list_nested() {
        let body = json!({"data": [{"a": 1}], "pagination": {}});
        assert_eq!(item_list("jikan", &body, "/data").len(), 1);
    }

    #[test]
    fn test_item_list_malformed_is_empty() {
        let body = json!({"error": "rate limited"});
        assert!(item_list("jikan", &body, "/data").is_empty());
        assert!(item_list("trakt", &body, "").is_empty());
    }

    #[test]
    fn test_non_json_body_reads_as_empty_list() {
        let body = parse_body("trakt", b"<html>Bad Gateway</html>");
        assert!(body.is_null());
        assert!(item_list("trakt", &body, "").is_empty());

        let body = parse_body("jikan", b"");
        assert!(item_list("jikan", &body, "/data").is_empty());
    }

    #[test]
    fn test_json_body_parses() {
        let body = parse_body("jikan", br#"{"data": [{"mal_id": 1}]}"#);
        assert_eq!(item_list("jikan", &body, "/data").len(), 1);
    }

    #[test]
    fn test_decode_list_skips_bad_entries() {
        let list = vec![
            json!({"title": "Good", "ids": {"trakt": 1}}),
            json!({"title": "Missing ids"}),
            json!({"title": "Also good", "ids": {"trakt": 2}}),
        ];

        let items = decode_list("trakt", &list, |media: TraktMedia| {
            Some(media.into_item(ContentKind::Movie))
        });

        let ids: Vec<ItemId> = items.into_iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![ItemId::Numeric(1), ItemId::Numeric(2)]);
    }
}
