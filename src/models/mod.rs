use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

pub mod jikan;
pub mod registry;
pub mod tmdb;
pub mod trakt;

pub use registry::{
    NewRecommendSource, RecommendSource, RegistryCursor, RegistryEntry, RegistryKind, RegistryPage,
};
pub use tmdb::TmdbMedia;

/// Provider-specific identifier of a catalog item (Trakt id, MyAnimeList id, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Numeric(u64),
    Text(String),
}

impl ItemId {
    /// Parses a stored or user-supplied id, preferring the numeric form
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<u64>()
            .map(ItemId::Numeric)
            .unwrap_or_else(|_| ItemId::Text(raw.to_string()))
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Numeric(id) => write!(f, "{}", id),
            ItemId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId::Numeric(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId::parse(id)
    }
}

/// The kind of content a catalog serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Anime,
    Movie,
    Show,
}

impl ContentKind {
    /// Resolves the plural catalog segment used in routes (`anime`, `movies`, `shows`)
    pub fn from_catalog(segment: &str) -> AppResult<Self> {
        match segment {
            "anime" => Ok(ContentKind::Anime),
            "movies" => Ok(ContentKind::Movie),
            "shows" => Ok(ContentKind::Show),
            other => Err(AppError::InvalidInput(format!("Unknown catalog: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Anime => "anime",
            ContentKind::Movie => "movie",
            ContentKind::Show => "show",
        }
    }

    /// Whether posters for this kind come from the image catalog rather than the item itself
    pub fn uses_external_artwork(&self) -> bool {
        !matches!(self, ContentKind::Anime)
    }
}

impl std::str::FromStr for ContentKind {
    type Err = AppError;

    /// Parses the singular form produced by [`ContentKind::as_str`]
    fn from_str(raw: &str) -> AppResult<Self> {
        match raw {
            "anime" => Ok(ContentKind::Anime),
            "movie" => Ok(ContentKind::Movie),
            "show" => Ok(ContentKind::Show),
            other => Err(AppError::InvalidInput(format!("Unknown content kind: {}", other))),
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to an item in the image catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub media: TmdbMedia,
    pub id: u64,
}

/// Relevance data a catalog attaches to search and trending results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchers: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<String>,
}

/// A catalog item as returned to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: ItemId,
    pub kind: ContentKind,
    pub title: String,
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Envelope>,
}

impl ContentItem {
    pub fn new(id: impl Into<ItemId>, kind: ContentKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            year: None,
            overview: None,
            poster: None,
            url: None,
            image_ref: None,
            envelope: None,
        }
    }
}

/// Page and limit for catalog listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl PageParams {
    /// Builds page parameters from raw query values, falling back to 1/10 when a value is
    /// absent, non-numeric or zero
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let defaults = Self::default();
        let parse = |raw: Option<&str>, fallback: u32| {
            raw.and_then(|value| value.trim().parse::<u32>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(fallback)
        };

        Self {
            page: parse(page, defaults.page),
            limit: parse(limit, defaults.limit),
        }
    }
}

/// Pagination metadata forwarded to the client as `x-pagination-*` headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub page_count: Option<String>,
    pub item_count: Option<String>,
}

impl Pagination {
    pub const PAGE_HEADER: &'static str = "x-pagination-page";
    pub const LIMIT_HEADER: &'static str = "x-pagination-limit";
    pub const PAGE_COUNT_HEADER: &'static str = "x-pagination-page-count";
    pub const ITEM_COUNT_HEADER: &'static str = "x-pagination-item-count";

    /// Picks the pagination headers out of an upstream response, if any are present
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let pick = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let pagination = Self {
            page: pick(Self::PAGE_HEADER),
            limit: pick(Self::LIMIT_HEADER),
            page_count: pick(Self::PAGE_COUNT_HEADER),
            item_count: pick(Self::ITEM_COUNT_HEADER),
        };

        (!pagination.is_empty()).then_some(pagination)
    }

    pub fn is_empty(&self) -> bool {
        self.header_pairs().is_empty()
    }

    /// Header name and value for every field that is present
    pub fn header_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            (Self::PAGE_HEADER, &self.page),
            (Self::LIMIT_HEADER, &self.limit),
            (Self::PAGE_COUNT_HEADER, &self.page_count),
            (Self::ITEM_COUNT_HEADER, &self.item_count),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

/// One page of catalog results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<ContentItem>,
    pub pagination: Option<Pagination>,
}

/// A detail record keyed by the requested id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub item_id: ItemId,
    pub data: ContentItem,
}
