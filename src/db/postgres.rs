use std::collections::HashSet;

use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::{RegistryStore, SourceStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        ContentKind, ItemId, NewRecommendSource, RecommendSource, RegistryCursor, RegistryEntry,
        RegistryKind, RegistryPage,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations in `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct RegistryRow {
    id: Uuid,
    user_id: String,
    recommend_source_id: String,
    item_id: String,
    created_at: i64,
}

impl From<RegistryRow> for RegistryEntry {
    fn from(row: RegistryRow) -> Self {
        RegistryEntry {
            id: row.id,
            user_id: row.user_id,
            recommend_source_id: row.recommend_source_id,
            item_id: ItemId::parse(&row.item_id),
            created_at: row.created_at,
        }
    }
}

/// Registry store backed by the `registry_entries` table
#[derive(Clone)]
pub struct PgRegistryStore {
    pool: PgPool,
}

impl PgRegistryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RegistryStore for PgRegistryStore {
    async fn exists(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        item_id: &ItemId,
    ) -> AppResult<bool> {
        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM registry_entries
                WHERE registry = $1
                  AND user_id = $2
                  AND recommend_source_id = $3
                  AND item_id = $4
            )
            "#,
        )
        .bind(registry.as_str())
        .bind(user_id)
        .bind(source_id)
        .bind(item_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    async fn existing_items(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        item_ids: &[ItemId],
    ) -> AppResult<HashSet<ItemId>> {
        if item_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let lookup: Vec<String> = item_ids.iter().map(ItemId::to_string).collect();

        let found: HashSet<String> = sqlx::query_scalar(
            r#"
            SELECT item_id FROM registry_entries
            WHERE registry = $1
              AND user_id = $2
              AND recommend_source_id = $3
              AND item_id = ANY($4)
            "#,
        )
        .bind(registry.as_str())
        .bind(user_id)
        .bind(source_id)
        .bind(lookup)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        Ok(item_ids
            .iter()
            .filter(|item_id| found.contains(&item_id.to_string()))
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

        let result = sqlx::query(
            r#"
            INSERT INTO registry_entries
                (id, registry, user_id, recommend_source_id, item_id,
                 user_source_item, user_source, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(registry.as_str())
        .bind(&entry.user_id)
        .bind(&entry.recommend_source_id)
        .bind(entry.item_id.to_string())
        .bind(entry.uniqueness_key())
        .bind(entry.listing_key())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(entry.id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::ConflictIgnored)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
        cursor: Option<RegistryCursor>,
        limit: u32,
    ) -> AppResult<RegistryPage> {
        // One extra row tells us whether another page exists
        let rows: Vec<RegistryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, recommend_source_id, item_id, created_at
            FROM registry_entries
            WHERE registry = $1
              AND user_id = $2
              AND recommend_source_id = $3
              AND ($4::BIGINT IS NULL OR (created_at, id) < ($4::BIGINT, $5::UUID))
            ORDER BY created_at DESC, id DESC
            LIMIT $6
            "#,
        )
        .bind(registry.as_str())
        .bind(user_id)
        .bind(source_id)
        .bind(cursor.map(|c| c.created_at))
        .bind(cursor.map(|c| c.id))
        .bind(i64::from(limit) + 1)
        .fetch_all(&self.pool)
        .await?;

        let mut items: Vec<RegistryEntry> = rows.into_iter().map(RegistryEntry::from).collect();
        let has_more = items.len() > limit as usize;
        items.truncate(limit as usize);

        let next_cursor = has_more
            .then(|| items.last().map(|entry| entry.cursor().encode()))
            .flatten();

        Ok(RegistryPage { items, next_cursor })
    }

    async fn list_all(
        &self,
        registry: RegistryKind,
        user_id: &str,
        source_id: &str,
    ) -> AppResult<Vec<RegistryEntry>> {
        let rows: Vec<RegistryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, recommend_source_id, item_id, created_at
            FROM registry_entries
            WHERE registry = $1 AND user_id = $2 AND recommend_source_id = $3
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(registry.as_str())
        .bind(user_id)
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RegistryEntry::from).collect())
    }

    async fn delete(
        &self,
        registry: RegistryKind,
        entry_id: Uuid,
        requesting_user: &str,
    ) -> AppResult<()> {
        let owner: Option<String> = sqlx::query_scalar(
            "SELECT user_id FROM registry_entries WHERE id = $1 AND registry = $2",
        )
        .bind(entry_id)
        .bind(registry.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match owner {
            None => Ok(()),
            Some(owner) if owner != requesting_user => Err(AppError::Unauthorized),
            Some(_) => {
                sqlx::query("DELETE FROM registry_entries WHERE id = $1 AND registry = $2")
                    .bind(entry_id)
                    .bind(registry.as_str())
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }
        }
    }
}

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: Uuid,
    catalog: String,
    api_url: String,
    api_key: String,
    description: String,
    created_at: i64,
}

impl TryFrom<SourceRow> for RecommendSource {
    type Error = AppError;

    fn try_from(row: SourceRow) -> AppResult<Self> {
        Ok(RecommendSource {
            id: row.id,
            catalog: row.catalog.parse::<ContentKind>()?,
            api_url: row.api_url,
            api_key: row.api_key,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

/// Recommend source store backed by the `recommend_sources` table
#[derive(Clone)]
pub struct PgSourceStore {
    pool: PgPool,
}

impl PgSourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SourceStore for PgSourceStore {
    async fn create(&self, source: NewRecommendSource) -> AppResult<RecommendSource> {
        let row: SourceRow = sqlx::query_as(
            r#"
            INSERT INTO recommend_sources (id, catalog, api_url, api_key, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, catalog, api_url, api_key, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source.catalog.as_str())
        .bind(&source.api_url)
        .bind(&source.api_key)
        .bind(&source.description)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn list(&self) -> AppResult<Vec<RecommendSource>> {
        let rows: Vec<SourceRow> = sqlx::query_as(
            r#"
            SELECT id, catalog, api_url, api_key, description, created_at
            FROM recommend_sources
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RecommendSource::try_from).collect()
    }
}
