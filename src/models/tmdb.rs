use serde::{Deserialize, Serialize};

/// TMDB media collections that carry posters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TmdbMedia {
    Movie,
    Tv,
}

impl TmdbMedia {
    /// Path segment of the TMDB endpoint for this media type
    pub fn path_segment(&self) -> &'static str {
        match self {
            TmdbMedia::Movie => "movie",
            TmdbMedia::Tv => "tv",
        }
    }
}

/// The subset of `GET /movie/{id}` and `GET /tv/{id}` this service reads
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPosterResponse {
    #[serde(default)]
    pub poster_path: Option<String>,
}
