use serde::Deserialize;

use super::{ContentItem, ContentKind, Envelope, ImageRef, ItemId, TmdbMedia};

// ============================================================================
// Trakt API Types
// ============================================================================

/// Cross-catalog ids Trakt attaches to every movie and show
#[derive(Debug, Clone, Deserialize)]
pub struct TraktIds {
    pub trakt: u64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub imdb: Option<String>,
    #[serde(default)]
    pub tmdb: Option<u64>,
}

/// A movie or show record (`extended=full`)
#[derive(Debug, Clone, Deserialize)]
pub struct TraktMedia {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    pub ids: TraktIds,
    #[serde(default)]
    pub overview: Option<String>,
}

impl TraktMedia {
    /// Converts the record into a catalog item of the given kind
    pub fn into_item(self, kind: ContentKind) -> ContentItem {
        let (media, segment) = match kind {
            ContentKind::Show => (TmdbMedia::Tv, "shows"),
            _ => (TmdbMedia::Movie, "movies"),
        };

        ContentItem {
            id: ItemId::Numeric(self.ids.trakt),
            kind,
            title: self.title.unwrap_or_default(),
            year: self.year,
            overview: self.overview,
            poster: None,
            url: self
                .ids
                .slug
                .map(|slug| format!("https://trakt.tv/{}/{}", segment, slug)),
            image_ref: self.ids.tmdb.map(|id| ImageRef { media, id }),
            envelope: None,
        }
    }
}

/// Search and trending results wrap the record with relevance data
#[derive(Debug, Clone, Deserialize)]
pub struct TraktListEntry {
    #[serde(rename = "type", default)]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub watchers: Option<u64>,
    #[serde(default)]
    pub movie: Option<TraktMedia>,
    #[serde(default)]
    pub show: Option<TraktMedia>,
}

impl TraktListEntry {
    /// Unwraps the record matching `kind`, keeping the envelope data
    pub fn into_item(self, kind: ContentKind) -> Option<ContentItem> {
        let media = match kind {
            ContentKind::Show => self.show,
            _ => self.movie,
        }?;

        let mut item = media.into_item(kind);
        item.envelope = Some(Envelope {
            score: self.score,
            watchers: self.watchers,
            match_type: self.entry_type,
        });
        Some(item)
    }
}
