use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RegistryStore, SourceStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        ItemId, NewRecommendSource, RecommendSource, RegistryCursor, RegistryEntry, RegistryKind,
        RegistryPage,
    },
};

/// Registry store kept in process memory
///
/// Mirrors the PostgreSQL store's ordering and uniqueness rules. Used for local runs and tests.
#[derive(Clone, Default)]
pub struct MemoryRegistryStore {
    entries: Arc<RwLock<Vec<(RegistryKind, RegistryEntry)>>>,
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry as-is, bypassing id and timestamp generation
    pub async fn seed(&self, registry: RegistryKind, entry: RegistryEntry) {
        self.entries.write().await.push((registry, entry));
    }

    pub async fn len(&self, registry: RegistryKind) -> usize {
        self.entries
            .read()
            .await
            .iter()
            .filter(|(kind, _)| *kind == registry)
            .count()
    }

    /// Entries of one user for one source, newest first
    async fn sorted(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
    ) -> Vec<RegistryEntry> {
        let mut matching: Vec<RegistryEntry> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(kind, entry)| *kind == registry && entry.belongs_to(user_id, source_id))
            .map(|(_, entry)| entry.clone())
            .collect();

        matching.sort_by(|a, b| b.cursor().cmp(&a.cursor()));
        matching
    }
}

#[async_trait::async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn exists(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        item_id: &ItemId,
    ) -> AppResult<bool> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .any(|(kind, entry)| {
                *kind == registry && entry.registers(user_id, source_id, item_id)
            }))
    }

    async fn existing_items(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        item_ids: &[ItemId],
    ) -> AppResult<HashSet<ItemId>> {
        let entries = self.entries.read().await;
        let registered: HashSet<&ItemId> = entries
            .iter()
            .filter(|(kind, entry)| *kind == registry && entry.belongs_to(user_id, source_id))
            .map(|(_, entry)| &entry.item_id)
            .collect();

        Ok(item_ids
            .iter()
            .filter(|item_id| registered.contains(item_id))
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        item_id: &ItemId,
    ) -> AppResult<Uuid> {
        let entry = RegistryEntry::new(user_id, source_id, item_id.clone(), Utc::now().timestamp());

        // Check and push under one write lock, like the unique index does
        let mut entries = self.entries.write().await;
        if entries.iter().any(|(kind, existing)| {
            *kind == registry && existing.registers(user_id, source_id, item_id)
        }) {
            return Err(AppError::ConflictIgnored);
        }

        let id = entry.id;
        entries.push((registry, entry));
        Ok(id)
    }

    async fn list(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        cursor: Option<RegistryCursor>,
        limit: u32,
    ) -> AppResult<RegistryPage> {
        let mut remaining: Vec<RegistryEntry> = self
            .sorted(registry, user_id, source_id)
            .await
            .into_iter()
            .filter(|entry| cursor.map_or(true, |c| entry.cursor() < c))
            .collect();

        let has_more = remaining.len() > limit as usize;
        remaining.truncate(limit as usize);

        let next_cursor = has_more
            .then(|| remaining.last().map(|entry| entry.cursor().encode()))
            .flatten();

        Ok(RegistryPage {
            items: remaining,
            next_cursor,
        })
    }

    async fn list_all(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
    ) -> AppResult<Vec<RegistryEntry>> {
        Ok(self.sorted(registry, user_id, source_id).await)
    }

    async fn delete(
        &self,
        registry: RegistryKind,
        entry_id: Uuid,
        requesting_user: &str,
    ) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        let Some(position) = entries
            .iter()
            .position(|(kind, entry)| *kind == registry && entry.id == entry_id)
        else {
            return Ok(());
        };

        if entries[position].1.user_id != requesting_user {
            return Err(AppError::Unauthorized);
        }

        entries.remove(position);
        Ok(())
    }
}

/// Recommend source store kept in process memory
#[derive(Clone, Default)]
pub struct MemorySourceStore {
    sources: Arc<RwLock<Vec<RecommendSource>>>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SourceStore for MemorySourceStore {
    async fn create(&self, source: NewRecommendSource) -> AppResult<RecommendSource> {
        let created = RecommendSource {
            id: Uuid::new_v4(),
            catalog: source.catalog,
            api_url: source.api_url,
            api_key: source.api_key,
            description: source.description,
            created_at: Utc::now().timestamp(),
        };

        self.sources.write().await.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> AppResult<Vec<RecommendSource>> {
        Ok(self.sources.read().await.clone())
    }
}
