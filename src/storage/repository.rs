// src/storage/repository.rs

//! Repository trait for cached plan records.

use async_trait::async_trait;
use serde::Serialize;

use crate::core::types::{CachedPlan, PrimaryGoal};

/// Aggregate view of the cache, for reporting and the cost policy's
/// maturity signal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub total_plans: i64,
    /// Distinct semantic hashes, i.e. the number of user archetypes covered.
    pub unique_archetypes: i64,
    pub avg_access_count: f64,
    pub ai_plans: i64,
    pub adapted_plans: i64,
    /// Share of successful generations served from cache over the last 30
    /// days (exact, direct and adapted hits).
    pub cache_hit_rate_30d: f64,
}

/// Storage operations consumed by the cache manager. Implementations must
/// provide atomic access-count increments; concurrent inserts of
/// near-duplicate contexts are tolerated (entries are additive).
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Persist a new record, returning its id.
    async fn insert(&self, record: &CachedPlan) -> anyhow::Result<String>;

    async fn find_by_exact_hash(&self, hash: &str) -> anyhow::Result<Option<CachedPlan>>;

    /// Records sharing a semantic hash, most-reused first.
    async fn find_by_semantic_hash(
        &self,
        hash: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<CachedPlan>>;

    /// Pre-filter lookup by compound key. The goal filter is applied after
    /// the fetch; the store has no structured view into the context JSON.
    async fn find_by_compound_key(
        &self,
        key: &str,
        goal_filter: Option<PrimaryGoal>,
        limit: i64,
    ) -> anyhow::Result<Vec<CachedPlan>>;

    /// Atomic `access_count += 1` plus last-access timestamp bump.
    async fn increment_access(&self, id: &str) -> anyhow::Result<()>;

    async fn stats(&self) -> anyhow::Result<CacheStats>;

    /// Delete entries older than `days`; with `only_if_never_accessed` only
    /// those that never produced a hit. Returns the number deleted.
    async fn delete_older_than(
        &self,
        days: i64,
        only_if_never_accessed: bool,
    ) -> anyhow::Result<u64>;

    async fn find_by_user(&self, user_id: &str) -> anyhow::Result<Vec<CachedPlan>>;
}
