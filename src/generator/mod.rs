// src/generator/mod.rs

//! Wrapper around the black-box generative model call.
//!
//! Adds timing, a request-level timeout, token/cost estimation, typed error
//! classification and retry with exponential backoff. Rate-limit errors are
//! never retried: waiting does not help and each probe burns daily-quota
//! headroom.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::PlanCacheConfig;
use crate::core::errors::{AiError, ModelError};
use crate::core::types::{UserPlanningContext, WeekPlan};

/// The generative model collaborator. Assumed to handle its own prompt
/// construction and chunking internally; failures arrive already tagged
/// with a kind.
#[async_trait]
pub trait PlanModel: Send + Sync {
    async fn generate_week(
        &self,
        ctx: &UserPlanningContext,
        week_number: u32,
    ) -> Result<WeekPlan, ModelError>;

    fn name(&self) -> &str {
        "plan-model"
    }
}

#[derive(Debug, Clone)]
pub struct AiCallMetadata {
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub model: String,
    pub chunked: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub plan: WeekPlan,
    pub metadata: AiCallMetadata,
}

pub struct AiGenerator {
    model: Arc<dyn PlanModel>,
    config: Arc<PlanCacheConfig>,
}

impl AiGenerator {
    pub fn new(model: Arc<dyn PlanModel>, config: Arc<PlanCacheConfig>) -> Self {
        Self { model, config }
    }

    /// One timed, timeout-guarded model call.
    pub async fn generate(
        &self,
        ctx: &UserPlanningContext,
        week_number: u32,
    ) -> Result<GenerationOutput, AiError> {
        let timeout = Duration::from_millis(self.config.model_timeout_ms);
        let start = Instant::now();

        let result = tokio::time::timeout(timeout, self.model.generate_week(ctx, week_number)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let plan = match result {
            Err(_) => {
                return Err(AiError::Timeout { elapsed_ms });
            }
            Ok(Err(ModelError::Timeout(msg))) => {
                warn!(%msg, elapsed_ms, "model reported timeout");
                return Err(AiError::Timeout { elapsed_ms });
            }
            Ok(Err(ModelError::RateLimited(msg))) => {
                warn!(%msg, "model rate limited");
                return Err(AiError::RateLimited { message: msg });
            }
            Ok(Err(ModelError::Other(msg))) => {
                return Err(AiError::Generation { message: msg });
            }
            Ok(Ok(plan)) => plan,
        };

        let tokens_used = estimate_tokens(&plan);
        let cost_usd = tokens_used as f64 / 1000.0 * self.config.cost_per_1k_tokens_usd;
        debug!(week_number, tokens_used, cost_usd, elapsed_ms, "AI generation complete");

        Ok(GenerationOutput {
            plan,
            metadata: AiCallMetadata {
                tokens_used,
                cost_usd,
                duration_ms: elapsed_ms,
                model: self.config.model_name.clone(),
                chunked: true,
            },
        })
    }

    /// Retry transient failures with exponential backoff
    /// (`base_delay * 2^(attempt-1)`); rate-limit errors rethrow
    /// immediately. Returns the last error when attempts exhaust.
    pub async fn generate_with_retry(
        &self,
        ctx: &UserPlanningContext,
        week_number: u32,
        max_retries: u32,
    ) -> Result<GenerationOutput, AiError> {
        let mut attempt = 1;
        loop {
            match self.generate(ctx, week_number).await {
                Ok(output) => {
                    if attempt > 1 {
                        info!(attempt, "AI generation succeeded after retry");
                    }
                    return Ok(output);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_retries => {
                    warn!(attempt, error = %e, "AI generation attempts exhausted");
                    return Err(e);
                }
                Err(e) => {
                    let delay = Duration::from_millis(
                        self.config.retry_base_delay_ms * 2u64.pow(attempt - 1),
                    );
                    warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "AI generation failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Linear pre-flight estimate for callers budgeting a whole program.
    /// The cost optimizer itself uses live spend tracking instead.
    pub fn estimated_cost(&self, total_weeks: u32) -> f64 {
        total_weeks as f64 * self.config.estimated_cost_per_week_usd
    }
}

/// Rough token estimate from the serialized plan size plus a fixed prompt
/// overhead, at ~4 bytes per token.
fn estimate_tokens(plan: &WeekPlan) -> u64 {
    const PROMPT_OVERHEAD_TOKENS: u64 = 1200;
    let body = serde_json::to_string(plan).map(|s| s.len()).unwrap_or(0) as u64;
    PROMPT_OVERHEAD_TOKENS + body / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn context() -> UserPlanningContext {
        UserPlanningContext {
            activity: Activity {
                availability: "any".to_string(),
                country: "US".to_string(),
                daily_activity_level: ActivityLevel::Moderate,
            },
            biometrics: Biometrics {
                age: 30,
                gender: Gender::Male,
                height_cm: 180.0,
                weight_kg: 80.0,
            },
            nutrition: NutritionProfile {
                allergies: vec![],
                diet_type: DietType::Omnivore,
                excluded_foods: vec![],
                intolerances: vec![],
                meals_per_day: 4,
            },
            objective: Objective {
                has_competition: false,
                primary_goal: PrimaryGoal::Cut,
                target_date: None,
                timeline_weeks: 12,
            },
            targets: NutritionTargets {
                calories: CalorieTargets {
                    rest_day: 2200.0,
                    training_day: 2500.0,
                },
                macros: MacroTargets {
                    carbs_g: 250.0,
                    fat_g: 70.0,
                    fiber_g: 35.0,
                    protein_g: 160.0,
                },
            },
            training: TrainingProfile {
                available_equipment: vec![],
                days_per_week: 4,
                experience_level: ExperienceLevel::Intermediate,
                has_injuries: false,
                session_duration_min: 60,
                sport_type: "strength".to_string(),
                training_location: TrainingLocation::Gym,
            },
            user_id: "u1".to_string(),
        }
    }

    fn empty_plan() -> WeekPlan {
        WeekPlan {
            week_number: 1,
            days: vec![],
        }
    }

    /// Fails `failures` times with the given error kind, then succeeds.
    struct FlakyModel {
        failures: u32,
        calls: AtomicU32,
        rate_limited: bool,
    }

    #[async_trait]
    impl PlanModel for FlakyModel {
        async fn generate_week(
            &self,
            _ctx: &UserPlanningContext,
            week_number: u32,
        ) -> Result<WeekPlan, ModelError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                if self.rate_limited {
                    return Err(ModelError::RateLimited("quota exceeded".to_string()));
                }
                return Err(ModelError::Other("transient".to_string()));
            }
            Ok(WeekPlan {
                week_number,
                days: vec![],
            })
        }
    }

    fn fast_config() -> Arc<PlanCacheConfig> {
        let mut cfg = PlanCacheConfig::default();
        cfg.retry_base_delay_ms = 1;
        Arc::new(cfg)
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let model = Arc::new(FlakyModel {
            failures: 2,
            calls: AtomicU32::new(0),
            rate_limited: false,
        });
        let generator = AiGenerator::new(model.clone(), fast_config());
        let output = generator
            .generate_with_retry(&context(), 1, 3)
            .await
            .expect("succeeds on third attempt");
        assert_eq!(output.plan.week_number, 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limit_is_never_retried() {
        let model = Arc::new(FlakyModel {
            failures: 1,
            calls: AtomicU32::new(0),
            rate_limited: true,
        });
        let generator = AiGenerator::new(model.clone(), fast_config());
        let err = generator
            .generate_with_retry(&context(), 1, 3)
            .await
            .expect_err("rate limit propagates");
        assert!(matches!(err, AiError::RateLimited { .. }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_exhaust_with_last_error() {
        let model = Arc::new(FlakyModel {
            failures: 10,
            calls: AtomicU32::new(0),
            rate_limited: false,
        });
        let generator = AiGenerator::new(model.clone(), fast_config());
        let err = generator
            .generate_with_retry(&context(), 1, 3)
            .await
            .expect_err("all attempts fail");
        assert!(matches!(err, AiError::Generation { .. }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    struct SlowModel;

    #[async_trait]
    impl PlanModel for SlowModel {
        async fn generate_week(
            &self,
            _ctx: &UserPlanningContext,
            _week_number: u32,
        ) -> Result<WeekPlan, ModelError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(empty_plan())
        }
    }

    #[tokio::test]
    async fn slow_call_is_classified_as_timeout() {
        let mut cfg = PlanCacheConfig::default();
        cfg.model_timeout_ms = 20;
        let generator = AiGenerator::new(Arc::new(SlowModel), Arc::new(cfg));
        let err = generator.generate(&context(), 1).await.expect_err("times out");
        assert!(matches!(err, AiError::Timeout { .. }));
    }

    #[tokio::test]
    async fn metadata_carries_cost_and_model() {
        let model = Arc::new(FlakyModel {
            failures: 0,
            calls: AtomicU32::new(0),
            rate_limited: false,
        });
        let generator = AiGenerator::new(model, fast_config());
        let output = generator.generate(&context(), 2).await.unwrap();
        assert_eq!(output.metadata.model, "plan-gen-1");
        assert!(output.metadata.tokens_used >= 1200);
        assert!(output.metadata.cost_usd > 0.0);
    }

    #[test]
    fn estimated_cost_is_linear() {
        let model = Arc::new(SlowModel);
        let generator = AiGenerator::new(model, fast_config());
        assert!((generator.estimated_cost(12) - 0.6).abs() < 1e-9);
    }
}
