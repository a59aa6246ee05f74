use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use next_favorite_api::{
    api::{create_router, AppState, Catalogs},
    db::{MemoryRegistryStore, MemorySourceStore},
    error::AppResult,
    models::{
        CatalogPage, ContentItem, ContentKind, ImageRef, ItemId, PageParams, Pagination, TmdbMedia,
    },
    services::{CatalogProvider, PosterEnricher, PosterSource},
};

const SOURCE: &str = "source-1";

/// Catalog returning a fixed set of items for every call
struct StubCatalog {
    items: Vec<ContentItem>,
    related_calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl CatalogProvider for StubCatalog {
    async fn search(&self, _query: &str, _page: PageParams) -> AppResult<CatalogPage> {
        Ok(CatalogPage {
            items: self.items.clone(),
            pagination: Some(Pagination {
                page: Some("1".to_string()),
                limit: Some("10".to_string()),
                page_count: Some("4".to_string()),
                item_count: Some("37".to_string()),
            }),
        })
    }

    async fn trending(&self, _page: PageParams) -> AppResult<CatalogPage> {
        Ok(CatalogPage {
            items: self.items.clone(),
            pagination: None,
        })
    }

    async fn related(&self, _seed: &ItemId) -> AppResult<Vec<ContentItem>> {
        self.related_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.clone())
    }

    async fn fetch_detail(&self, item_id: &ItemId) -> AppResult<Option<ContentItem>> {
        Ok(self.items.iter().find(|item| &item.id == item_id).cloned())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Every image-catalog item has the same poster
struct StubPosters;

#[async_trait::async_trait]
impl PosterSource for StubPosters {
    async fn poster_path(&self, _media: TmdbMedia, _id: u64) -> AppResult<Option<String>> {
        Ok(Some("/poster.jpg".to_string()))
    }
}

fn movie(id: u64) -> ContentItem {
    let mut item = ContentItem::new(id, ContentKind::Movie, format!("Movie {}", id));
    item.image_ref = Some(ImageRef {
        media: TmdbMedia::Movie,
        id: id * 10,
    });
    item
}

fn catalog(items: Vec<ContentItem>, calls: &Arc<AtomicUsize>) -> Arc<StubCatalog> {
    Arc::new(StubCatalog {
        items,
        related_calls: Arc::clone(calls),
    })
}

/// Test server over in-memory stores; returns the related-call counter of the movie catalog
fn create_test_server() -> (TestServer, Arc<AtomicUsize>) {
    let related_calls = Arc::new(AtomicUsize::new(0));
    let movies = vec![movie(1), movie(2), movie(3), movie(4)];

    let catalogs = Catalogs::new(
        catalog(
            vec![ContentItem::new(5114u64, ContentKind::Anime, "FMA:B")],
            &related_calls,
        ),
        catalog(movies, &related_calls),
        catalog(vec![], &related_calls),
    );

    let posters = PosterEnricher::new(
        Arc::new(StubPosters),
        "https://img.test/t/p".to_string(),
        "w200".to_string(),
    );

    let state = AppState {
        registries: Arc::new(MemoryRegistryStore::new()),
        sources: Arc::new(MemorySourceStore::new()),
        catalogs,
        detail_posters: posters.with_size("w500"),
        posters,
        admin_group: "admin".to_string(),
    };

    let app = create_router(state, &["http://localhost:3000".to_string()]);
    (TestServer::new(app).unwrap(), related_calls)
}

fn user_header() -> HeaderName {
    HeaderName::from_static("x-user-id")
}

fn groups_header() -> HeaderName {
    HeaderName::from_static("x-user-groups")
}

fn ids(body: &Value) -> Vec<u64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_u64().unwrap())
        .collect()
}

async fn add(server: &TestServer, user: &'static str, registry: &str, item: u64) -> Value {
    add_under(server, user, SOURCE, registry, item).await
}

async fn add_under(
    server: &TestServer,
    user: &'static str,
    source: &str,
    registry: &str,
    item: u64,
) -> Value {
    server
        .post(&format!("/api/v1/registries/{}", registry))
        .add_header(user_header(), HeaderValue::from_static(user))
        .json(&json!({"recommendSourceId": source, "itemId": item}))
        .await
        .json()
}

fn assert_message_body(body: &Value) {
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(object["message"].is_string());
}

#[tokio::test]
async fn test_health_check() {
    let (server, _) = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_recommend_requires_user() {
    let (server, related_calls) = create_test_server();

    let response = server
        .post("/api/v1/catalogs/movies/recommend")
        .json(&json!({"recommendSourceId": SOURCE}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({"message": "Unauthorized"}));
    assert_eq!(related_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_recommend_without_favorites_asks_for_one() {
    let (server, related_calls) = create_test_server();

    let response = server
        .post("/api/v1/catalogs/movies/recommend")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .json(&json!({"recommendSourceId": SOURCE}))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"message": "Please add a favorite first."}));
    assert_eq!(related_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_recommend_excludes_registered_items() {
    let (server, related_calls) = create_test_server();
    add(&server, "u1", "favorites", 1).await;
    add(&server, "u1", "ignores", 3).await;

    let response = server
        .post("/api/v1/catalogs/movies/recommend")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .json(&json!({"recommendSourceId": SOURCE}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(ids(&body), vec![2, 4]);
    assert_eq!(body[0]["poster"], "https://img.test/t/p/w200/poster.jpg");
    assert_eq!(related_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_add_favorite_twice() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/registries/favorites")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .json(&json!({"recommendSourceId": SOURCE, "itemId": 2}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["message"], "Favorite item created successfully");
    assert!(created["id"].is_string());

    let response = server
        .post("/api/v1/registries/favorites")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .json(&json!({"recommendSourceId": SOURCE, "itemId": 2}))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({"message": "Item has already been added to your favorites"}));
}

#[tokio::test]
async fn test_add_to_unknown_registry_is_bad_request() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/registries/watchlist")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .json(&json!({"recommendSourceId": SOURCE, "itemId": 2}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_screens_registered_items_for_known_user() {
    let (server, _) = create_test_server();
    add(&server, "u1", "ignores", 2).await;
    add(&server, "u1", "favorites", 4).await;

    let response = server
        .get(&format!(
            "/api/v1/catalogs/movies/search?query=matrix&recommendSourceId={}",
            SOURCE
        ))
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .await;

    response.assert_status_ok();
    assert_eq!(ids(&response.json()), vec![1, 3]);
    let headers = response.headers();
    assert_eq!(headers["x-pagination-page-count"], "4");
    assert_eq!(headers["x-pagination-item-count"], "37");
}

#[tokio::test]
async fn test_search_anonymous_is_unfiltered() {
    let (server, _) = create_test_server();
    add(&server, "u1", "ignores", 2).await;

    let response = server
        .get(&format!(
            "/api/v1/catalogs/movies/search?query=matrix&recommendSourceId={}",
            SOURCE
        ))
        .await;

    response.assert_status_ok();
    assert_eq!(ids(&response.json()), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_trending_anime_keeps_catalog_artwork() {
    let (server, _) = create_test_server();

    let response = server.get("/api/v1/catalogs/anime/trending").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(ids(&body), vec![5114]);
    assert!(body[0]["poster"].is_null());
    assert!(response.headers().get("x-pagination-page").is_none());
}

#[tokio::test]
async fn test_unknown_catalog_is_bad_request() {
    let (server, _) = create_test_server();
    let response = server.get("/api/v1/catalogs/books/trending").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_details_skip_unknown_ids() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/catalogs/movies/details")
        .json(&json!({"itemIds": [3, 99, 1]}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["itemId"], 3);
    assert_eq!(records[1]["itemId"], 1);
    assert_eq!(
        records[0]["data"]["poster"],
        "https://img.test/t/p/w500/poster.jpg"
    );
}

#[tokio::test]
async fn test_list_and_delete_favorites() {
    let (server, _) = create_test_server();
    for item in [1, 2, 3] {
        add(&server, "u1", "favorites", item).await;
    }

    let response = server
        .get(&format!(
            "/api/v1/registries/favorites?recommendSourceId={}&limit=2",
            SOURCE
        ))
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert!(page["nextCursor"].is_string());

    let entry_id = page["items"][0]["id"].as_str().unwrap().to_string();

    // Someone else cannot delete it
    let response = server
        .delete(&format!("/api/v1/registries/favorites/{}", entry_id))
        .add_header(user_header(), HeaderValue::from_static("u2"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // The owner can, and deleting again still succeeds
    for _ in 0..2 {
        let response = server
            .delete(&format!("/api/v1/registries/favorites/{}", entry_id))
            .add_header(user_header(), HeaderValue::from_static("u1"))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({"message": "Success"}));
    }

    let response = server
        .get(&format!(
            "/api/v1/registries/favorites?recommendSourceId={}",
            SOURCE
        ))
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .await;
    let page: Value = response.json();
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert!(page["nextCursor"].is_null());
}

#[tokio::test]
async fn test_list_registry_rejects_bad_cursor() {
    let (server, _) = create_test_server();

    let response = server
        .get(&format!(
            "/api/v1/registries/ignores?recommendSourceId={}&cursor=garbage",
            SOURCE
        ))
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_source_requires_admin() {
    let (server, _) = create_test_server();
    let source = json!({
        "catalog": "anime",
        "apiUrl": "https://api.jikan.moe/v4",
        "apiKey": "secret",
        "description": "Jikan"
    });

    let response = server
        .post("/api/v1/sources")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .add_header(groups_header(), HeaderValue::from_static("viewers"))
        .json(&source)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = server
        .post("/api/v1/sources")
        .add_header(user_header(), HeaderValue::from_static("root"))
        .add_header(groups_header(), HeaderValue::from_static("admin"))
        .json(&source)
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["catalog"], "anime");
    assert!(created.get("apiKey").is_none());

    let response = server.get("/api/v1/sources").await;
    response.assert_status_ok();
    let sources: Vec<Value> = response.json();
    assert_eq!(sources.len(), 1);
}

#[tokio::test]
async fn test_registries_do_not_leak_across_similar_ids() {
    let (server, _) = create_test_server();
    add_under(&server, "a_b", "c", "favorites", 2).await;

    // "a" + "b_c" joins to the same string as "a_b" + "c"
    let response = server
        .get("/api/v1/registries/favorites?recommendSourceId=b_c")
        .add_header(user_header(), HeaderValue::from_static("a"))
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert!(page["items"].as_array().unwrap().is_empty());

    let response = server
        .get("/api/v1/catalogs/movies/search?query=matrix&recommendSourceId=b_c")
        .add_header(user_header(), HeaderValue::from_static("a"))
        .await;
    assert_eq!(ids(&response.json()), vec![1, 2, 3, 4]);

    let created = add_under(&server, "a", "b_c", "favorites", 2).await;
    assert_eq!(created["message"], "Favorite item created successfully");
}

#[tokio::test]
async fn test_list_without_source_is_json_bad_request() {
    let (server, _) = create_test_server();

    let response = server
        .get("/api/v1/registries/favorites")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_message_body(&response.json());
}

#[tokio::test]
async fn test_add_without_item_id_is_json_bad_request() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/registries/favorites")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .json(&json!({"recommendSourceId": SOURCE}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_message_body(&response.json());
}

#[tokio::test]
async fn test_add_malformed_json_is_json_bad_request() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/v1/registries/ignores")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .text("{\"itemId\": ")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_message_body(&response.json());
}

#[tokio::test]
async fn test_recommend_without_body_asks_for_favorite() {
    let (server, related_calls) = create_test_server();
    add(&server, "u1", "favorites", 1).await;

    let response = server
        .post("/api/v1/catalogs/movies/recommend")
        .add_header(user_header(), HeaderValue::from_static("u1"))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"message": "Please add a favorite first."}));
    assert_eq!(related_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cors_allows_credentials_for_known_origin() {
    let (server, _) = create_test_server();

    let response = server
        .get("/api/v1/catalogs/anime/trending")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("http://localhost:3000"),
        )
        .await;

    response.assert_status_ok();
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "http://localhost:3000"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
}
