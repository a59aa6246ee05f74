use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::clamp_list_limit,
    error::{AppError, AppResult},
    models::{
        CatalogPage, DetailRecord, ItemId, NewRecommendSource, PageParams, RecommendSource,
        RegistryCursor, RegistryKind, RegistryPage,
    },
    services::{
        discovery::{self, Viewer},
        recommendations::{self, Recommendation, NEEDS_FAVORITE_MESSAGE},
        registry::{already_registered_message, register, Registration},
    },
};

use super::{
    extract::{ApiJson, ApiPath, ApiQuery, JsonOrDefault},
    identity::CurrentUser,
    AppState,
};

// Request types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub recommend_source_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub recommend_source_id: Option<String>,
}

/// An absent body or source reads as "no favorites yet"
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    #[serde(default)]
    pub recommend_source_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRequest {
    #[serde(default)]
    pub item_ids: Vec<ItemId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub recommend_source_id: String,
    pub item_id: ItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRegistryParams {
    pub recommend_source_id: String,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

/// Viewer for screening, only when both the user and the source are known
fn viewer<'a>(user: Option<&'a CurrentUser>, source_id: Option<&'a str>) -> Option<Viewer<'a>> {
    match (user, source_id.filter(|id| !id.is_empty())) {
        (Some(user), Some(source_id)) => Some(Viewer {
            user_id: &user.id,
            source_id,
        }),
        _ => None,
    }
}

/// Items as the JSON body, pagination as `x-pagination-*` headers
fn paged_response(page: CatalogPage) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(pagination) = &page.pagination {
        for (name, value) in pagination.header_pairs() {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
    }

    (headers, Json(page.items)).into_response()
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "message": text.into() }))).into_response()
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Search a catalog
pub async fn search(
    State(state): State<AppState>,
    ApiPath(catalog): ApiPath<String>,
    user: Option<CurrentUser>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> AppResult<Response> {
    let provider = state.catalogs.from_segment(&catalog)?;
    let page = PageParams::from_raw(params.page.as_deref(), params.limit.as_deref());

    let result = discovery::search_candidates(
        provider.as_ref(),
        state.registries.as_ref(),
        &state.posters,
        &params.query,
        page,
        viewer(user.as_ref(), params.recommend_source_id.as_deref()),
    )
    .await?;

    Ok(paged_response(result))
}

/// Trending items of a catalog
pub async fn trending(
    State(state): State<AppState>,
    ApiPath(catalog): ApiPath<String>,
    user: Option<CurrentUser>,
    ApiQuery(params): ApiQuery<TrendingParams>,
) -> AppResult<Response> {
    let provider = state.catalogs.from_segment(&catalog)?;
    let page = PageParams::from_raw(params.page.as_deref(), params.limit.as_deref());

    let result = discovery::trending(
        provider.as_ref(),
        state.registries.as_ref(),
        &state.posters,
        page,
        viewer(user.as_ref(), params.recommend_source_id.as_deref()),
    )
    .await?;

    Ok(paged_response(result))
}

/// Recommend items related to one of the user's favorites
pub async fn recommend(
    State(state): State<AppState>,
    ApiPath(catalog): ApiPath<String>,
    user: CurrentUser,
    JsonOrDefault(request): JsonOrDefault<RecommendRequest>,
) -> AppResult<Response> {
    let provider = state.catalogs.from_segment(&catalog)?;

    let outcome = recommendations::recommend(
        state.registries.as_ref(),
        provider.as_ref(),
        &state.posters,
        &user.id,
        &request.recommend_source_id,
    )
    .await?;

    Ok(match outcome {
        Recommendation::Items(items) => Json(items).into_response(),
        Recommendation::NeedsFavorite => message(StatusCode::OK, NEEDS_FAVORITE_MESSAGE),
    })
}

/// Detail records for a batch of item ids
pub async fn details(
    State(state): State<AppState>,
    ApiPath(catalog): ApiPath<String>,
    ApiJson(request): ApiJson<DetailRequest>,
) -> AppResult<Json<Vec<DetailRecord>>> {
    let provider = state.catalogs.from_segment(&catalog)?;
    let records =
        discovery::detail(provider.as_ref(), &state.detail_posters, &request.item_ids).await;
    Ok(Json(records))
}

/// Add an item to the caller's favorites or ignore list
pub async fn add_to_registry(
    State(state): State<AppState>,
    ApiPath(registry): ApiPath<String>,
    user: CurrentUser,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> AppResult<Response> {
    let registry = RegistryKind::from_path(&registry)?;

    let outcome = register(
        state.registries.as_ref(),
        registry,
        &user.id,
        &request.recommend_source_id,
        &request.item_id,
    )
    .await?;

    Ok(match outcome {
        Registration::Created(id) => {
            let noun = match registry {
                RegistryKind::Favorite => "Favorite",
                RegistryKind::Ignore => "Ignore",
            };
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": id,
                    "message": format!("{} item created successfully", noun),
                })),
            )
                .into_response()
        }
        Registration::AlreadyRegistered => {
            message(StatusCode::OK, already_registered_message(registry))
        }
    })
}

/// One page of the caller's favorites or ignore list, newest first
pub async fn list_registry(
    State(state): State<AppState>,
    ApiPath(registry): ApiPath<String>,
    user: CurrentUser,
    ApiQuery(params): ApiQuery<ListRegistryParams>,
) -> AppResult<Json<RegistryPage>> {
    let registry = RegistryKind::from_path(&registry)?;
    let cursor = params
        .cursor
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(RegistryCursor::decode)
        .transpose()?;

    let page = state
        .registries
        .list(
            registry,
            &user.id,
            &params.recommend_source_id,
            cursor,
            clamp_list_limit(params.limit),
        )
        .await?;

    Ok(Json(page))
}

/// Remove an entry from the caller's favorites or ignore list
pub async fn remove_from_registry(
    State(state): State<AppState>,
    ApiPath((registry, entry_id)): ApiPath<(String, String)>,
    user: CurrentUser,
) -> AppResult<Response> {
    let registry = RegistryKind::from_path(&registry)?;
    let entry_id = Uuid::parse_str(&entry_id)
        .map_err(|_| AppError::InvalidInput(format!("Invalid entry id: {}", entry_id)))?;

    state
        .registries
        .delete(registry, entry_id, &user.id)
        .await?;

    Ok(message(StatusCode::OK, "Success"))
}

/// Create a recommend source (admin only)
pub async fn create_source(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<NewRecommendSource>,
) -> AppResult<(StatusCode, Json<RecommendSource>)> {
    if !user.in_group(&state.admin_group) {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let source = state.sources.create(request).await?;
    tracing::info!(source_id = %source.id, catalog = %source.catalog, "Recommend source created");

    Ok((StatusCode::CREATED, Json(source)))
}

/// All recommend sources
pub async fn list_sources(State(state): State<AppState>) -> AppResult<Json<Vec<RecommendSource>>> {
    Ok(Json(state.sources.list().await?))
}
