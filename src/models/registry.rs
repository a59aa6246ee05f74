use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ContentKind, ItemId};
use crate::error::{AppError, AppResult};

/// The two per-user registries a catalog item can be placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Favorite,
    Ignore,
}

impl RegistryKind {
    /// Resolves the plural route segment (`favorites`, `ignores`)
    pub fn from_path(segment: &str) -> AppResult<Self> {
        match segment {
            "favorites" => Ok(RegistryKind::Favorite),
            "ignores" => Ok(RegistryKind::Ignore),
            other => Err(AppError::InvalidInput(format!("Unknown registry: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Favorite => "favorite",
            RegistryKind::Ignore => "ignore",
        }
    }

    /// Human-readable name used in response messages
    pub fn label(&self) -> &'static str {
        match self {
            RegistryKind::Favorite => "favorites",
            RegistryKind::Ignore => "ignore list",
        }
    }
}

/// "User U has registered item I under source S"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub id: Uuid,
    pub user_id: String,
    pub recommend_source_id: String,
    pub item_id: ItemId,
    /// Epoch seconds
    pub created_at: i64,
}

impl RegistryEntry {
    pub fn new(user_id: &str, source_id: &str, item_id: ItemId, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            recommend_source_id: source_id.to_string(),
            item_id,
            created_at,
        }
    }

    /// Denormalized `user_source_item` column value. Never used for lookups,
    /// since `_` may also appear inside the ids.
    pub fn uniqueness_key(&self) -> String {
        format!("{}_{}_{}", self.user_id, self.recommend_source_id, self.item_id)
    }

    /// Denormalized `user_source` column value
    pub fn listing_key(&self) -> String {
        format!("{}_{}", self.user_id, self.recommend_source_id)
    }

    /// Whether this entry is in the listing of `user_id` for `source_id`
    pub fn belongs_to(&self, user_id: &str, source_id: &str) -> bool {
        self.user_id == user_id && self.recommend_source_id == source_id
    }

    /// Whether this entry registers `item_id` for `user_id` under `source_id`
    pub fn registers(&self, user_id: &str, source_id: &str, item_id: &ItemId) -> bool {
        self.belongs_to(user_id, source_id) && self.item_id == *item_id
    }

    /// Position of this entry in the newest-first listing order
    pub fn cursor(&self) -> RegistryCursor {
        RegistryCursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// Continuation point of a registry listing: the last entry already returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegistryCursor {
    pub created_at: i64,
    pub id: Uuid,
}

impl RegistryCursor {
    pub fn encode(&self) -> String {
        format!("{}:{}", self.created_at, self.id)
    }

    pub fn decode(raw: &str) -> AppResult<Self> {
        let invalid = || AppError::InvalidInput(format!("Invalid cursor: {}", raw));
        let (created_at, id) = raw.split_once(':').ok_or_else(invalid)?;

        Ok(Self {
            created_at: created_at.parse().map_err(|_| invalid())?,
            id: Uuid::parse_str(id).map_err(|_| invalid())?,
        })
    }
}

/// One page of a registry listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryPage {
    pub items: Vec<RegistryEntry>,
    pub next_cursor: Option<String>,
}

/// A catalog configuration registrations and recommendations are scoped to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendSource {
    pub id: Uuid,
    pub catalog: ContentKind,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub description: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecommendSource {
    pub catalog: ContentKind,
    pub api_url: String,
    pub api_key: String,
    #[serde(default)]
    pub description: String,
}
