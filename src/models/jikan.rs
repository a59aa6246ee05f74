use serde::Deserialize;

use super::{ContentItem, ContentKind, ItemId, Pagination};

// ============================================================================
// Jikan API Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JikanImage {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JikanImages {
    #[serde(default)]
    pub jpg: Option<JikanImage>,
}

impl JikanImages {
    fn poster(self) -> Option<String> {
        self.jpg
            .and_then(|jpg| jpg.large_image_url.or(jpg.image_url))
    }
}

/// Anime record from `/anime`, `/top/anime` and `/anime/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct JikanAnime {
    pub mal_id: u64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<JikanImages>,
}

impl From<JikanAnime> for ContentItem {
    fn from(anime: JikanAnime) -> Self {
        ContentItem {
            id: ItemId::Numeric(anime.mal_id),
            kind: ContentKind::Anime,
            title: anime.title,
            year: anime.year,
            overview: anime.synopsis,
            poster: anime.images.and_then(JikanImages::poster),
            url: anime.url,
            image_ref: None,
            envelope: None,
        }
    }
}

/// Abbreviated anime record nested in recommendation results
#[derive(Debug, Clone, Deserialize)]
pub struct JikanEntry {
    pub mal_id: u64,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<JikanImages>,
}

/// One element of `/anime/{id}/recommendations`
#[derive(Debug, Clone, Deserialize)]
pub struct JikanRecommendation {
    pub entry: JikanEntry,
}

impl From<JikanRecommendation> for ContentItem {
    fn from(recommendation: JikanRecommendation) -> Self {
        let entry = recommendation.entry;
        ContentItem {
            id: ItemId::Numeric(entry.mal_id),
            kind: ContentKind::Anime,
            title: entry.title,
            year: None,
            overview: None,
            poster: entry.images.and_then(JikanImages::poster),
            url: entry.url,
            image_ref: None,
            envelope: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanPaginationItems {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub per_page: Option<u64>,
}

/// Body-level pagination returned by list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct JikanPagination {
    #[serde(default)]
    pub current_page: Option<u64>,
    #[serde(default)]
    pub last_visible_page: Option<u64>,
    #[serde(default)]
    pub items: Option<JikanPaginationItems>,
}

impl From<JikanPagination> for Pagination {
    fn from(pagination: JikanPagination) -> Self {
        let items = pagination.items;
        Pagination {
            page: pagination.current_page.map(|v| v.to_string()),
            limit: items
                .as_ref()
                .and_then(|i| i.per_page)
                .map(|v| v.to_string()),
            page_count: pagination.last_visible_page.map(|v| v.to_string()),
            item_count: items.and_then(|i| i.total).map(|v| v.to_string()),
        }
    }
}
