// src/orchestrator/mod.rs

//! Top-level state machine for one plan-generation request.
//!
//! Strictly sequential: exact match, similarity search, cost decision, then
//! one of {AI, adapt, direct serve}. Every decision lands in the analytics
//! log, failures included. Fallbacks only ever move toward AI, never toward
//! serving a plan the adapter rejected.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::adaptation::PlanAdapter;
use crate::analytics::{AnalyticsStore, GenerationEvent};
use crate::cache::CacheManager;
use crate::config::PlanCacheConfig;
use crate::core::types::{
    GenerationMetadata, PlanGenerationResult, PlanSource, ResultSource, UserPlanningContext,
    UserTier,
};
use crate::cost::{CacheSignals, CostOptimizer, Decision, SpendTracker, Strategy};
use crate::fingerprint;
use crate::generator::{AiGenerator, PlanModel};
use crate::matcher::{CachedPlanMatch, SimilarityMatcher};
use crate::storage::PlanRepository;
use crate::targets::TargetCalculator;

pub struct PlanOrchestrator {
    cache: Arc<CacheManager>,
    matcher: SimilarityMatcher,
    optimizer: CostOptimizer,
    adapter: PlanAdapter,
    generator: AiGenerator,
    analytics: Arc<dyn AnalyticsStore>,
    config: Arc<PlanCacheConfig>,
}

impl PlanOrchestrator {
    pub fn new(
        repo: Arc<dyn PlanRepository>,
        analytics: Arc<dyn AnalyticsStore>,
        spend: Arc<dyn SpendTracker>,
        model: Arc<dyn PlanModel>,
        targets: Arc<dyn TargetCalculator>,
        config: Arc<PlanCacheConfig>,
    ) -> Self {
        let cache = Arc::new(CacheManager::new(repo));
        Self {
            matcher: SimilarityMatcher::new(cache.clone(), config.clone()),
            optimizer: CostOptimizer::new(spend, config.clone()),
            adapter: PlanAdapter::new(targets, config.clone()),
            generator: AiGenerator::new(model, config.clone()),
            analytics,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Drop never-accessed cache entries older than the configured retention
    /// window. Returns how many were deleted.
    pub async fn prune_cache(&self) -> Result<u64> {
        self.cache.cleanup_old_plans(self.config.retention_days).await
    }

    /// Produce a week plan for this context by the cheapest safe path.
    /// Returns a complete, validated plan or an error; never a partial plan.
    pub async fn generate_plan(
        &self,
        ctx: &UserPlanningContext,
        week_number: u32,
        tier: UserTier,
    ) -> Result<PlanGenerationResult> {
        let start = Instant::now();
        match self.run(ctx, week_number, tier, start).await {
            Ok(result) => Ok(result),
            Err(e) => {
                // Record the failure before rethrowing; callers own the
                // user-facing handling.
                self.log_event(
                    ctx,
                    ResultSource::Ai,
                    Some("generation failed".to_string()),
                    0.0,
                    start,
                    false,
                    Some(format!("{e:#}")),
                    None,
                )
                .await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        ctx: &UserPlanningContext,
        week_number: u32,
        tier: UserTier,
        start: Instant,
    ) -> Result<PlanGenerationResult> {
        // Step 1: exact replay.
        if let Some(plan) = self.cache.find_exact_match(ctx).await {
            info!(user = %fingerprint::hash_user_id(&ctx.user_id), "exact cache hit");
            self.log_event(
                ctx,
                ResultSource::CacheExact,
                Some("exact hash hit".to_string()),
                0.0,
                start,
                true,
                None,
                Some(1.0),
            )
            .await;
            return Ok(PlanGenerationResult {
                plan,
                source: ResultSource::CacheExact,
                metadata: GenerationMetadata {
                    similarity_score: Some(1.0),
                    cost_usd: 0.0,
                    response_time_ms: start.elapsed().as_millis() as u64,
                    ..Default::default()
                },
            });
        }

        // Step 2: similarity candidates.
        let matches = self
            .matcher
            .find_similar(ctx, self.config.default_match_limit)
            .await;

        // Step 3: cost decision. A stats outage degrades to a cold-cache
        // view, which biases toward AI, the safe direction.
        let total_plans = match self.cache.stats().await {
            Ok(stats) => stats.total_plans,
            Err(e) => {
                warn!(error = %e, "cache stats unavailable, assuming cold cache");
                0
            }
        };
        let signals = CacheSignals {
            total_plans,
            user_plan_count: self.cache.user_plan_count(&ctx.user_id).await as i64,
        };
        let decision = self
            .optimizer
            .should_use_ai(ctx, &matches, tier, signals)
            .await?;
        info!(strategy = decision.strategy.as_str(), reason = %decision.reason, "cost decision");

        // Step 4: branch on strategy.
        match decision.strategy {
            Strategy::Ai => self.generate_via_ai(ctx, week_number, &decision, start).await,
            Strategy::CacheAdapted => match matches.first() {
                Some(best) => {
                    self.adapt_or_fallback(ctx, week_number, best, &decision, start)
                        .await
                }
                // A cache strategy with zero candidates only happens when a
                // spend gate fired; generating anyway would bypass the gate.
                None => anyhow::bail!("no cached plan available: {}", decision.reason),
            },
            Strategy::CacheDirect => match matches.first() {
                Some(best) => self.serve_direct(ctx, best, &decision, start).await,
                None => anyhow::bail!("no cached plan available: {}", decision.reason),
            },
        }
    }

    async fn generate_via_ai(
        &self,
        ctx: &UserPlanningContext,
        week_number: u32,
        decision: &Decision,
        start: Instant,
    ) -> Result<PlanGenerationResult> {
        let output = self
            .generator
            .generate_with_retry(ctx, week_number, self.config.max_retries)
            .await
            .context("AI generation failed")?;

        // A cache-write failure is a real failure: it silently erodes future
        // hit rates, so it propagates instead of being swallowed.
        let plan_id = self
            .cache
            .save_plan(&output.plan, ctx, PlanSource::Ai, None)
            .await?;

        self.log_event(
            ctx,
            ResultSource::Ai,
            Some(decision.reason.clone()),
            output.metadata.cost_usd,
            start,
            true,
            None,
            None,
        )
        .await;

        Ok(PlanGenerationResult {
            plan: output.plan,
            source: ResultSource::Ai,
            metadata: GenerationMetadata {
                plan_id: Some(plan_id),
                cost_usd: output.metadata.cost_usd,
                response_time_ms: start.elapsed().as_millis() as u64,
                decision_reason: Some(decision.reason.clone()),
                ..Default::default()
            },
        })
    }

    async fn adapt_or_fallback(
        &self,
        ctx: &UserPlanningContext,
        week_number: u32,
        best: &CachedPlanMatch,
        decision: &Decision,
        start: Instant,
    ) -> Result<PlanGenerationResult> {
        let Some(adapted) = self.adapter.adapt_plan(&best.plan, ctx) else {
            // An explicit fallback, never a silent substitution.
            info!(
                cached_plan_id = %best.plan.id,
                score = best.score,
                "adaptation rejected, falling back to AI"
            );
            return self.generate_via_ai(ctx, week_number, decision, start).await;
        };

        let plan_id = self
            .cache
            .save_plan(
                &adapted.plan,
                ctx,
                PlanSource::Adapted,
                Some(best.plan.id.clone()),
            )
            .await?;

        info!(
            plan_id = %plan_id,
            origin = %best.plan.id,
            confidence = adapted.confidence,
            changes = adapted.adaptations.len(),
            "served adapted plan"
        );
        self.log_event(
            ctx,
            ResultSource::CacheAdapted,
            Some(decision.reason.clone()),
            0.0,
            start,
            true,
            None,
            Some(best.score),
        )
        .await;

        Ok(PlanGenerationResult {
            plan: adapted.plan,
            source: ResultSource::CacheAdapted,
            metadata: GenerationMetadata {
                plan_id: Some(plan_id),
                cached_plan_id: Some(best.plan.id.clone()),
                similarity_score: Some(best.score),
                cost_usd: 0.0,
                response_time_ms: start.elapsed().as_millis() as u64,
                adaptations: Some(adapted.adaptations),
                confidence: Some(adapted.confidence),
                decision_reason: Some(decision.reason.clone()),
            },
        })
    }

    async fn serve_direct(
        &self,
        ctx: &UserPlanningContext,
        best: &CachedPlanMatch,
        decision: &Decision,
        start: Instant,
    ) -> Result<PlanGenerationResult> {
        // Pure reuse: bump the counter, no new record. A failed bump is not
        // worth failing the serve over.
        if let Err(e) = self.cache.record_direct_hit(&best.plan.id).await {
            warn!(plan_id = %best.plan.id, error = %e, "failed to record direct hit");
        }

        // Zero marginal cost, so analytics buckets direct serves with exact
        // hits.
        self.log_event(
            ctx,
            ResultSource::CacheExact,
            Some(decision.reason.clone()),
            0.0,
            start,
            true,
            None,
            Some(best.score),
        )
        .await;

        Ok(PlanGenerationResult {
            plan: best.plan.plan.clone(),
            source: ResultSource::CacheExact,
            metadata: GenerationMetadata {
                cached_plan_id: Some(best.plan.id.clone()),
                similarity_score: Some(best.score),
                cost_usd: 0.0,
                response_time_ms: start.elapsed().as_millis() as u64,
                decision_reason: Some(decision.reason.clone()),
                ..Default::default()
            },
        })
    }

    /// Generate a span of weeks sequentially with a pause between calls.
    /// Deliberately not concurrent: a parallel burst would trip the
    /// provider's rate limit and race past the daily-call gate. Aborts the
    /// whole batch on the first error.
    pub async fn generate_multiple_weeks(
        &self,
        ctx: &UserPlanningContext,
        start_week: u32,
        end_week: u32,
        tier: UserTier,
    ) -> Result<Vec<PlanGenerationResult>> {
        let mut results = Vec::with_capacity((end_week.saturating_sub(start_week) + 1) as usize);
        for week in start_week..=end_week {
            let result = self
                .generate_plan(ctx, week, tier)
                .await
                .with_context(|| format!("multi-week generation aborted at week {week}"))?;
            results.push(result);

            if week < end_week {
                tokio::time::sleep(std::time::Duration::from_millis(
                    self.config.multi_week_pause_ms,
                ))
                .await;
            }
        }
        Ok(results)
    }

    #[allow(clippy::too_many_arguments)]
    async fn log_event(
        &self,
        ctx: &UserPlanningContext,
        strategy: ResultSource,
        reason: Option<String>,
        cost_usd: f64,
        start: Instant,
        success: bool,
        error: Option<String>,
        similarity: Option<f32>,
    ) {
        let event = GenerationEvent {
            user_hash: fingerprint::hash_user_id(&ctx.user_id),
            strategy,
            reason,
            cost_usd,
            duration_ms: start.elapsed().as_millis() as i64,
            success,
            error,
            similarity,
            created_at: Utc::now(),
        };
        // Losing one analytics row must not fail a served plan; the spend
        // gates will see the next successful write.
        if let Err(e) = self.analytics.record(&event).await {
            warn!(error = %e, "failed to record generation event");
        }
    }
}
