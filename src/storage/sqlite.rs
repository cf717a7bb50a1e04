// src/storage/sqlite.rs

//! Implements PlanRepository for SQLite.
//!
//! Feature vectors are stored as little-endian f32 BLOBs; plan and context
//! snapshots as JSON TEXT. The 30-day hit rate in `stats` reads the
//! generation_events table living in the same database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::core::types::{CachedPlan, PlanSource, PrimaryGoal};
use crate::storage::repository::{CacheStats, PlanRepository};

pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the repository and run schema bootstrap.
    pub async fn connect(pool: SqlitePool) -> Result<Self> {
        crate::storage::migration::run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_record(row: &SqliteRow) -> Result<CachedPlan> {
        let plan_json: String = row.get("plan_json");
        let context_json: String = row.get("context_json");
        let source: String = row.get("source");
        let blob: Vec<u8> = row.get("feature_vector");
        let created_at: NaiveDateTime = row.get("created_at");
        let last_accessed_at: NaiveDateTime = row.get("last_accessed_at");

        Ok(CachedPlan {
            id: row.get("id"),
            exact_hash: row.get("exact_hash"),
            semantic_hash: row.get("semantic_hash"),
            compound_key: row.get("compound_key"),
            feature_vector: Self::blob_to_vector(&blob),
            plan: serde_json::from_str(&plan_json).context("deserialize cached plan_json")?,
            context: serde_json::from_str(&context_json)
                .context("deserialize cached context_json")?,
            source: match source.as_str() {
                "adapted" => PlanSource::Adapted,
                _ => PlanSource::Ai,
            },
            origin_plan_id: row.get("origin_plan_id"),
            user_id: row.get("user_id"),
            access_count: row.get("access_count"),
            created_at: Utc.from_utc_datetime(&created_at),
            last_accessed_at: Utc.from_utc_datetime(&last_accessed_at),
        })
    }
}

const SELECT_COLUMNS: &str = "id, exact_hash, semantic_hash, compound_key, feature_vector, \
     plan_json, context_json, source, origin_plan_id, user_id, access_count, \
     created_at, last_accessed_at";

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn insert(&self, record: &CachedPlan) -> Result<String> {
        let plan_json = serde_json::to_string(&record.plan)?;
        let context_json = serde_json::to_string(&record.context)?;

        sqlx::query(
            r#"
            INSERT INTO cached_plans (
                id, exact_hash, semantic_hash, compound_key, feature_vector,
                plan_json, context_json, source, origin_plan_id, user_id,
                access_count, created_at, last_accessed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.exact_hash)
        .bind(&record.semantic_hash)
        .bind(&record.compound_key)
        .bind(Self::vector_to_blob(&record.feature_vector))
        .bind(plan_json)
        .bind(context_json)
        .bind(record.source.as_str())
        .bind(&record.origin_plan_id)
        .bind(&record.user_id)
        .bind(record.access_count)
        .bind(record.created_at.naive_utc())
        .bind(record.last_accessed_at.naive_utc())
        .execute(&self.pool)
        .await
        .context("insert cached plan")?;

        Ok(record.id.clone())
    }

    async fn find_by_exact_hash(&self, hash: &str) -> Result<Option<CachedPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM cached_plans \
             WHERE exact_hash = ? ORDER BY access_count DESC LIMIT 1"
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn find_by_semantic_hash(&self, hash: &str, limit: i64) -> Result<Vec<CachedPlan>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM cached_plans \
             WHERE semantic_hash = ? ORDER BY access_count DESC LIMIT ?"
        ))
        .bind(hash)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn find_by_compound_key(
        &self,
        key: &str,
        goal_filter: Option<PrimaryGoal>,
        limit: i64,
    ) -> Result<Vec<CachedPlan>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM cached_plans \
             WHERE compound_key = ? ORDER BY access_count DESC LIMIT ?"
        ))
        .bind(key)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>>>()?;

        if let Some(goal) = goal_filter {
            records.retain(|r| r.context.objective.primary_goal == goal);
        }
        Ok(records)
    }

    async fn increment_access(&self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE cached_plans \
             SET access_count = access_count + 1, last_accessed_at = ? \
             WHERE id = ?",
        )
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("increment access count")?;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(DISTINCT semantic_hash) AS archetypes,
                COALESCE(AVG(access_count), 0.0) AS avg_access,
                COALESCE(SUM(CASE WHEN source = 'ai' THEN 1 ELSE 0 END), 0) AS ai_plans,
                COALESCE(SUM(CASE WHEN source = 'adapted' THEN 1 ELSE 0 END), 0) AS adapted_plans
            FROM cached_plans
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let since = (Utc::now() - Duration::days(30)).naive_utc();
        let hits_row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN strategy IN ('cache_exact', 'cache_adapted')
                             THEN 1 ELSE 0 END), 0) AS hits
            FROM generation_events
            WHERE success = 1 AND created_at >= ?
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let event_total: i64 = hits_row.get("total");
        let event_hits: i64 = hits_row.get("hits");
        let hit_rate = if event_total > 0 {
            event_hits as f64 / event_total as f64
        } else {
            0.0
        };

        Ok(CacheStats {
            total_plans: row.get("total"),
            unique_archetypes: row.get("archetypes"),
            avg_access_count: row.get("avg_access"),
            ai_plans: row.get("ai_plans"),
            adapted_plans: row.get("adapted_plans"),
            cache_hit_rate_30d: hit_rate,
        })
    }

    async fn delete_older_than(&self, days: i64, only_if_never_accessed: bool) -> Result<u64> {
        let cutoff = (Utc::now() - Duration::days(days)).naive_utc();
        let result = if only_if_never_accessed {
            sqlx::query("DELETE FROM cached_plans WHERE created_at < ? AND access_count = 0")
                .bind(cutoff)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("DELETE FROM cached_plans WHERE created_at < ?")
                .bind(cutoff)
                .execute(&self.pool)
                .await?
        };
        Ok(result.rows_affected())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<CachedPlan>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM cached_plans \
             WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }
}
