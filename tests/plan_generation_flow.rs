// tests/plan_generation_flow.rs

//! End-to-end flows through the orchestrator against an in-memory database:
//! cold start, exact replay, direct reuse, adaptation, fallbacks and the
//! hard spend gates.

mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use plancache::analytics::{AnalyticsStore, SqliteAnalyticsStore};
use plancache::core::types::{PlanSource, ResultSource, UserTier};
use plancache::cost::SpendTracker;
use plancache::orchestrator::PlanOrchestrator;
use plancache::storage::{PlanRepository, SqlitePlanRepository};
use plancache::targets::StandardTargetCalculator;

use common::{CountingModel, build_week_plan, context, fast_config, memory_pool, orchestrator};

#[tokio::test]
async fn cold_cache_generates_with_ai() {
    let pool = memory_pool().await;
    let model = CountingModel::new();
    let orch = orchestrator(&pool, model.clone());

    let ctx = context("ana", 80.0);
    let result = orch
        .generate_plan(&ctx, 1, UserTier::Free)
        .await
        .expect("cold-cache generation");

    assert_eq!(result.source, ResultSource::Ai);
    assert!(result.metadata.cost_usd > 0.0);
    assert!(result.metadata.plan_id.is_some());
    assert_eq!(result.plan.days.len(), 7);
    assert_eq!(model.call_count(), 1);

    // The AI call landed in the event log the spend gates read from.
    let analytics = SqliteAnalyticsStore::new(pool.clone());
    assert_eq!(AnalyticsStore::today_ai_calls(&analytics).await.unwrap(), 1);
    assert!(AnalyticsStore::monthly_spend(&analytics).await.unwrap() > 0.0);
}

#[tokio::test]
async fn identical_context_replays_exactly() {
    let pool = memory_pool().await;
    let model = CountingModel::new();
    let orch = orchestrator(&pool, model.clone());

    let ctx = context("ana", 80.0);
    let first = orch.generate_plan(&ctx, 1, UserTier::Free).await.unwrap();
    let second = orch.generate_plan(&ctx, 1, UserTier::Free).await.unwrap();

    assert_eq!(first.source, ResultSource::Ai);
    assert_eq!(second.source, ResultSource::CacheExact);
    assert_eq!(second.metadata.cost_usd, 0.0);
    assert_eq!(second.metadata.similarity_score, Some(1.0));
    assert_eq!(second.plan, first.plan);
    assert_eq!(model.call_count(), 1);

    // The replay bumped the stored record's access counter.
    let repo = SqlitePlanRepository::new(pool.clone());
    let record = repo
        .find_by_exact_hash(&plancache::fingerprint::exact_hash(&ctx))
        .await
        .unwrap()
        .expect("cached record");
    assert_eq!(record.access_count, 1);
}

#[tokio::test]
async fn near_identical_context_is_served_direct() {
    let pool = memory_pool().await;
    let model = CountingModel::new();
    let orch = orchestrator(&pool, model.clone());

    let seed = context("ana", 80.0);
    orch.generate_plan(&seed, 1, UserTier::Free).await.unwrap();

    // Same user, one kilo later: different exact hash, near-perfect
    // similarity, nothing worth regenerating.
    let ctx = context("ana", 81.0);
    let result = orch.generate_plan(&ctx, 1, UserTier::Free).await.unwrap();

    assert_eq!(result.source, ResultSource::CacheExact);
    assert_eq!(result.metadata.cost_usd, 0.0);
    assert!(result.metadata.cached_plan_id.is_some());
    assert!(result.metadata.similarity_score.unwrap() > 0.95);
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn adaptable_context_reuses_plan_with_scaling() {
    let pool = memory_pool().await;
    let model = CountingModel::new();
    let orch = orchestrator(&pool, model.clone());

    let seed = context("ben", 80.0);
    let seeded = orch.generate_plan(&seed, 1, UserTier::Free).await.unwrap();

    // New premium user, four kilos heavier: big enough to need a nutrition
    // rescale, small enough to stay viable.
    let ctx = context("cara", 84.0);
    let result = orch
        .generate_plan(&ctx, 1, UserTier::Premium)
        .await
        .unwrap();

    assert_eq!(result.source, ResultSource::CacheAdapted);
    assert_eq!(result.metadata.cost_usd, 0.0);
    assert_eq!(result.metadata.cached_plan_id, seeded.metadata.plan_id);
    assert_eq!(result.metadata.confidence, Some(1.0));
    assert!(!result.metadata.adaptations.as_ref().unwrap().is_empty());
    assert_eq!(model.call_count(), 1);

    // Scaled meals track the heavier user's targets.
    let training_day = &result.plan.days[0];
    assert_eq!(training_day.nutrition.target_calories, ctx.targets.calories.training_day);
    let meal_sum: f64 = training_day.nutrition.meals.iter().map(|m| m.calories).sum();
    assert!((meal_sum - ctx.targets.calories.training_day).abs() / ctx.targets.calories.training_day < 0.05);

    // The adapted plan was cached with its lineage.
    let repo = SqlitePlanRepository::new(pool.clone());
    let stats = repo.stats().await.unwrap();
    assert_eq!(stats.total_plans, 2);
    assert_eq!(stats.adapted_plans, 1);
    let adapted_record = repo
        .find_by_exact_hash(&plancache::fingerprint::exact_hash(&ctx))
        .await
        .unwrap()
        .expect("adapted record");
    assert_eq!(adapted_record.source, PlanSource::Adapted);
    assert_eq!(adapted_record.origin_plan_id, seeded.metadata.plan_id);
}

#[tokio::test]
async fn unviable_delta_falls_back_to_ai() {
    let pool = memory_pool().await;
    let model = CountingModel::new();
    let orch = orchestrator(&pool, model.clone());

    orch.generate_plan(&context("dan", 80.0), 1, UserTier::Free)
        .await
        .unwrap();

    // 25 kg apart: similar on paper, but adaptation must refuse and the
    // request must regenerate rather than serve a rescaled stranger's plan.
    let ctx = context("eve", 105.0);
    let result = orch
        .generate_plan(&ctx, 1, UserTier::Premium)
        .await
        .unwrap();

    assert_eq!(result.source, ResultSource::Ai);
    assert_eq!(model.call_count(), 2);

    let repo = SqlitePlanRepository::new(pool.clone());
    let stats = repo.stats().await.unwrap();
    assert_eq!(stats.adapted_plans, 0);
    assert_eq!(stats.ai_plans, 2);
}

struct ExhaustedBudget;

#[async_trait]
impl SpendTracker for ExhaustedBudget {
    async fn today_ai_calls(&self) -> Result<i64> {
        Ok(i64::MAX)
    }
    async fn monthly_spend(&self) -> Result<f64> {
        Ok(f64::MAX)
    }
}

fn gated_orchestrator(
    pool: &sqlx::SqlitePool,
    model: Arc<CountingModel>,
) -> PlanOrchestrator {
    let repo = Arc::new(SqlitePlanRepository::new(pool.clone()));
    let analytics = Arc::new(SqliteAnalyticsStore::new(pool.clone()));
    PlanOrchestrator::new(
        repo,
        analytics,
        Arc::new(ExhaustedBudget),
        model,
        Arc::new(StandardTargetCalculator),
        Arc::new(fast_config()),
    )
}

#[tokio::test]
async fn spend_gate_with_empty_cache_fails_without_ai_call() {
    let pool = memory_pool().await;
    let model = CountingModel::new();
    let orch = gated_orchestrator(&pool, model.clone());

    let err = orch
        .generate_plan(&context("fay", 80.0), 1, UserTier::Enterprise)
        .await
        .expect_err("nothing cached and AI is gated off");
    assert!(err.to_string().contains("no cached plan available"));
    assert_eq!(model.call_count(), 0);

    // The failure itself was recorded.
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM generation_events WHERE success = 0")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(row.0, 1);
}

#[tokio::test]
async fn spend_gate_serves_best_match_without_ai() {
    let pool = memory_pool().await;
    let seed_model = CountingModel::new();
    let seeder = orchestrator(&pool, seed_model.clone());
    seeder
        .generate_plan(&context("gus", 80.0), 1, UserTier::Free)
        .await
        .unwrap();

    let gated_model = CountingModel::new();
    let orch = gated_orchestrator(&pool, gated_model.clone());
    let result = orch
        .generate_plan(&context("hal", 82.0), 1, UserTier::Enterprise)
        .await
        .expect("budget exhausted but a good match exists");

    assert_eq!(result.source, ResultSource::CacheExact);
    assert_eq!(result.metadata.cost_usd, 0.0);
    assert_eq!(gated_model.call_count(), 0);
}

#[tokio::test]
async fn pruning_applies_the_configured_retention_window() {
    let pool = memory_pool().await;
    let model = CountingModel::new();
    let orch = orchestrator(&pool, model.clone());

    // One fresh plan through the normal path.
    orch.generate_plan(&context("jil", 80.0), 1, UserTier::Free)
        .await
        .unwrap();

    // And one never-accessed record well past the 90-day default retention.
    let stale_ctx = context("kim", 90.0);
    let created = chrono::Utc::now() - chrono::Duration::days(120);
    let stale = plancache::core::types::CachedPlan {
        id: uuid::Uuid::new_v4().to_string(),
        exact_hash: plancache::fingerprint::exact_hash(&stale_ctx),
        semantic_hash: plancache::fingerprint::semantic_hash(&stale_ctx),
        compound_key: plancache::fingerprint::compound_key(&stale_ctx),
        feature_vector: plancache::fingerprint::extract_features(&stale_ctx),
        plan: build_week_plan(&stale_ctx, 1),
        context: stale_ctx.clone(),
        source: PlanSource::Ai,
        origin_plan_id: None,
        user_id: stale_ctx.user_id.clone(),
        access_count: 0,
        created_at: created,
        last_accessed_at: created,
    };
    let repo = SqlitePlanRepository::new(pool.clone());
    repo.insert(&stale).await.unwrap();

    assert_eq!(orch.prune_cache().await.unwrap(), 1);
    assert_eq!(repo.stats().await.unwrap().total_plans, 1);
    // Nothing left in the window; a second pass is a no-op.
    assert_eq!(orch.prune_cache().await.unwrap(), 0);
}

#[tokio::test]
async fn multi_week_pays_for_the_first_week_only() {
    let pool = memory_pool().await;
    let model = CountingModel::new();
    let orch = orchestrator(&pool, model.clone());

    let ctx = context("ida", 80.0);
    let results = orch
        .generate_multiple_weeks(&ctx, 1, 3, UserTier::Free)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].source, ResultSource::Ai);
    assert!(results[0].metadata.cost_usd > 0.0);
    // The context is unchanged, so later weeks replay the cached plan.
    for later in &results[1..] {
        assert_eq!(later.source, ResultSource::CacheExact);
        assert_eq!(later.metadata.cost_usd, 0.0);
    }
    assert_eq!(model.call_count(), 1);
}
