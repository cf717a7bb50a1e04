// src/cache/mod.rs

//! Read/write façade over the plan repository.
//!
//! Failure semantics: read paths degrade to a miss (a miss is always safe,
//! the caller falls through to AI), but `save_plan` propagates errors.
//! A silently dropped cache write would break the feedback loop that makes
//! future requests cheaper.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::types::{CachedPlan, PlanSource, UserPlanningContext, WeekPlan};
use crate::fingerprint;
use crate::storage::{CacheStats, PlanRepository};

pub struct CacheManager {
    repo: Arc<dyn PlanRepository>,
}

impl CacheManager {
    pub fn new(repo: Arc<dyn PlanRepository>) -> Self {
        Self { repo }
    }

    /// Persist a freshly produced plan with its derived hashes and feature
    /// vector. Returns the new record id. Write errors propagate.
    pub async fn save_plan(
        &self,
        plan: &WeekPlan,
        ctx: &UserPlanningContext,
        source: PlanSource,
        origin_plan_id: Option<String>,
    ) -> Result<String> {
        let hashes = fingerprint::all_hashes(ctx);
        let now = Utc::now();
        let record = CachedPlan {
            id: Uuid::new_v4().to_string(),
            exact_hash: hashes.exact,
            semantic_hash: hashes.semantic,
            compound_key: hashes.compound,
            feature_vector: fingerprint::extract_features(ctx),
            plan: plan.clone(),
            context: ctx.clone(),
            source,
            origin_plan_id,
            user_id: ctx.user_id.clone(),
            access_count: 0,
            created_at: now,
            last_accessed_at: now,
        };

        let id = self.repo.insert(&record).await?;
        info!(
            plan_id = %id,
            source = source.as_str(),
            compound_key = %record.compound_key,
            "cached new plan"
        );
        Ok(id)
    }

    /// Exact-hash lookup. On hit, bumps the access counter and returns the
    /// plan data only. Read errors degrade to `None`.
    pub async fn find_exact_match(&self, ctx: &UserPlanningContext) -> Option<WeekPlan> {
        let hash = fingerprint::exact_hash(ctx);
        let record = match self.repo.find_by_exact_hash(&hash).await {
            Ok(r) => r?,
            Err(e) => {
                warn!(error = %e, "exact-match lookup failed, treating as miss");
                return None;
            }
        };

        if let Err(e) = self.repo.increment_access(&record.id).await {
            warn!(plan_id = %record.id, error = %e, "failed to bump access count");
        }
        debug!(plan_id = %record.id, "exact cache hit");
        Some(record.plan)
    }

    /// Exact-hash probe without the access-count side effect.
    pub async fn has_cached_plan(&self, ctx: &UserPlanningContext) -> bool {
        let hash = fingerprint::exact_hash(ctx);
        match self.repo.find_by_exact_hash(&hash).await {
            Ok(r) => r.is_some(),
            Err(e) => {
                warn!(error = %e, "cache probe failed");
                false
            }
        }
    }

    pub async fn find_semantic_matches(
        &self,
        ctx: &UserPlanningContext,
        limit: i64,
    ) -> Vec<CachedPlan> {
        let hash = fingerprint::semantic_hash(ctx);
        match self.repo.find_by_semantic_hash(&hash, limit).await {
            Ok(records) => {
                debug!(count = records.len(), "semantic candidates fetched");
                records
            }
            Err(e) => {
                warn!(error = %e, "semantic lookup failed, returning no candidates");
                Vec::new()
            }
        }
    }

    pub async fn find_by_compound_key(
        &self,
        ctx: &UserPlanningContext,
        limit: i64,
    ) -> Vec<CachedPlan> {
        let key = fingerprint::compound_key(ctx);
        match self
            .repo
            .find_by_compound_key(&key, Some(ctx.objective.primary_goal), limit)
            .await
        {
            Ok(records) => {
                debug!(key = %key, count = records.len(), "compound-key candidates fetched");
                records
            }
            Err(e) => {
                warn!(key = %key, error = %e, "compound-key lookup failed");
                Vec::new()
            }
        }
    }

    /// Record a direct cache serve: pure reuse, no new record.
    pub async fn record_direct_hit(&self, plan_id: &str) -> Result<()> {
        self.repo.increment_access(plan_id).await
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        self.repo.stats().await
    }

    /// Delete never-accessed entries older than `days`. Returns the count.
    pub async fn cleanup_old_plans(&self, days: i64) -> Result<u64> {
        let deleted = self.repo.delete_older_than(days, true).await?;
        if deleted > 0 {
            info!(deleted, days, "pruned stale cache entries");
        }
        Ok(deleted)
    }

    /// Seed the cache with a plan for a popular archetype. The record is
    /// owned by `owner_id`, not by whatever placeholder id the synthetic
    /// context carries.
    pub async fn preload_plan(
        &self,
        plan: &WeekPlan,
        owner_id: &str,
        synthetic_ctx: &UserPlanningContext,
    ) -> Result<String> {
        let mut ctx = synthetic_ctx.clone();
        ctx.user_id = owner_id.to_string();
        info!(user_id = %owner_id, "preloading archetype plan");
        self.save_plan(plan, &ctx, PlanSource::Ai, None).await
    }

    pub async fn user_plan_count(&self, user_id: &str) -> usize {
        match self.repo.find_by_user(user_id).await {
            Ok(records) => records.len(),
            Err(e) => {
                warn!(error = %e, "user plan lookup failed");
                0
            }
        }
    }
}
