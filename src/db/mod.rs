use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        ItemId, NewRecommendSource, RecommendSource, RegistryCursor, RegistryEntry, RegistryKind,
        RegistryPage,
    },
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::{MemoryRegistryStore, MemorySourceStore};
pub use postgres::{create_pool, run_migrations, PgRegistryStore, PgSourceStore};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;

pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const MAX_LIST_LIMIT: u32 = 100;

/// Clamps a caller-supplied listing limit into `1..=MAX_LIST_LIMIT`
pub fn clamp_list_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

/// Favorites and ignore registries, scoped per user and per recommend source
///
/// Every lookup goes through the composite keys on [`RegistryEntry`], so a store never
/// returns entries belonging to another user.
#[async_trait::async_trait]
pub trait RegistryStore: Send + Sync {
    /// Whether `user ⊕ source ⊕ item` is present in the registry
    async fn exists(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        item_id: &ItemId,
    ) -> AppResult<bool>;

    /// The subset of `item_ids` present in the registry
    ///
    /// Default implementation issues one `exists` call per item concurrently and fails if any
    /// of them fails. Stores with a multi-get should override it.
    async fn existing_items(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        item_ids: &[ItemId],
    ) -> AppResult<HashSet<ItemId>> {
        let checks = item_ids.iter().map(|item_id| async move {
            let found = self.exists(registry, user_id, source_id, item_id).await?;
            Ok::<_, crate::error::AppError>(found.then(|| item_id.clone()))
        });

        let results = futures::future::try_join_all(checks).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Stores a new entry and returns its generated id
    ///
    /// Fails with `ConflictIgnored` when the entry already exists.
    async fn insert(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        item_id: &ItemId,
    ) -> AppResult<Uuid>;

    /// Entries for `user ⊕ source`, newest first, continuing after `cursor`
    async fn list(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        cursor: Option<RegistryCursor>,
        limit: u32,
    ) -> AppResult<RegistryPage>;

    /// Every entry for `user ⊕ source`, newest first
    async fn list_all(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
    ) -> AppResult<Vec<RegistryEntry>>;

    /// Removes an entry owned by `requesting_user`
    ///
    /// Deleting a missing entry succeeds; deleting someone else's fails with `Unauthorized`.
    async fn delete(
        &self,
        registry: RegistryKind,
        entry_id: Uuid,
        requesting_user: &str,
    ) -> AppResult<()>;
}

/// Recommend source configurations
#[async_trait::async_trait]
pub trait SourceStore: Send + Sync {
    async fn create(&self, source: NewRecommendSource) -> AppResult<RecommendSource>;

    async fn list(&self) -> AppResult<Vec<RecommendSource>>;
}
