// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use plancache::analytics::SqliteAnalyticsStore;
use plancache::config::PlanCacheConfig;
use plancache::core::errors::ModelError;
use plancache::core::types::*;
use plancache::generator::PlanModel;
use plancache::orchestrator::PlanOrchestrator;
use plancache::storage::SqlitePlanRepository;
use plancache::targets::{StandardTargetCalculator, TargetCalculator};

/// Install a log subscriber for test output; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// One in-memory database shared by repository and analytics. A single
/// connection, because each SQLite `:memory:` connection is its own database.
pub async fn memory_pool() -> SqlitePool {
    init_tracing();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    plancache::storage::migration::run(&pool)
        .await
        .expect("schema bootstrap");
    pool
}

/// A realistic planning context with targets derived by the standard
/// calculator, so generated and adapted plans agree on the nutrition math.
pub fn context(user_id: &str, weight_kg: f64) -> UserPlanningContext {
    let mut ctx = UserPlanningContext {
        activity: Activity {
            availability: "weekday evenings".to_string(),
            country: "DE".to_string(),
            daily_activity_level: ActivityLevel::Moderate,
        },
        biometrics: Biometrics {
            age: 30,
            gender: Gender::Male,
            height_cm: 178.0,
            weight_kg,
        },
        nutrition: NutritionProfile {
            allergies: vec![],
            diet_type: DietType::Omnivore,
            excluded_foods: vec![],
            intolerances: vec![],
            meals_per_day: 3,
        },
        objective: Objective {
            has_competition: false,
            primary_goal: PrimaryGoal::Cut,
            target_date: None,
            timeline_weeks: 12,
        },
        targets: NutritionTargets {
            calories: CalorieTargets {
                rest_day: 0.0,
                training_day: 0.0,
            },
            macros: MacroTargets {
                carbs_g: 0.0,
                fat_g: 0.0,
                fiber_g: 0.0,
                protein_g: 0.0,
            },
        },
        training: TrainingProfile {
            available_equipment: vec!["barbell".to_string()],
            days_per_week: 4,
            experience_level: ExperienceLevel::Intermediate,
            has_injuries: false,
            session_duration_min: 60,
            sport_type: "strength".to_string(),
            training_location: TrainingLocation::Gym,
        },
        user_id: user_id.to_string(),
    };
    ctx.targets = StandardTargetCalculator.calculate(&ctx);
    ctx
}

/// Seven days whose meals sum exactly to the context's targets; the first
/// `days_per_week` days carry training sessions.
pub fn build_week_plan(ctx: &UserPlanningContext, week_number: u32) -> WeekPlan {
    let t = &ctx.targets;
    let n = ctx.nutrition.meals_per_day.max(1);
    let days = (0..7u8)
        .map(|i| {
            let is_training_day = i < ctx.training.days_per_week;
            let calories = if is_training_day {
                t.calories.training_day
            } else {
                t.calories.rest_day
            };
            let meals = (0..n)
                .map(|m| MealPlan {
                    name: format!("meal {}", m + 1),
                    calories: calories / n as f64,
                    protein_g: t.macros.protein_g / n as f64,
                    carbs_g: t.macros.carbs_g / n as f64,
                    fat_g: t.macros.fat_g / n as f64,
                    fiber_g: t.macros.fiber_g / n as f64,
                    ingredients: vec![Ingredient {
                        name: "rice".to_string(),
                        amount: 100.0,
                        unit: "g".to_string(),
                    }],
                })
                .collect();
            DayPlan {
                day_index: i,
                is_training_day,
                nutrition: DayNutrition {
                    target_calories: calories,
                    target_protein_g: t.macros.protein_g,
                    target_carbs_g: t.macros.carbs_g,
                    target_fat_g: t.macros.fat_g,
                    target_fiber_g: t.macros.fiber_g,
                    meals,
                },
                training: is_training_day.then(|| TrainingSession {
                    focus: "full body".to_string(),
                    duration_min: ctx.training.session_duration_min,
                    exercises: vec!["squat".to_string(), "bench press".to_string()],
                }),
            }
        })
        .collect();
    WeekPlan { week_number, days }
}

/// Model stub that returns a valid plan and counts how often it was called.
pub struct CountingModel {
    pub calls: AtomicU32,
}

impl CountingModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanModel for CountingModel {
    async fn generate_week(
        &self,
        ctx: &UserPlanningContext,
        week_number: u32,
    ) -> Result<WeekPlan, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(build_week_plan(ctx, week_number))
    }
}

/// Short pauses so retry and multi-week tests run in milliseconds.
pub fn fast_config() -> PlanCacheConfig {
    let mut config = PlanCacheConfig::default();
    config.retry_base_delay_ms = 1;
    config.multi_week_pause_ms = 1;
    config
}

pub fn orchestrator(pool: &SqlitePool, model: Arc<dyn PlanModel>) -> PlanOrchestrator {
    let repo = Arc::new(SqlitePlanRepository::new(pool.clone()));
    let analytics = Arc::new(SqliteAnalyticsStore::new(pool.clone()));
    PlanOrchestrator::new(
        repo,
        analytics.clone(),
        analytics,
        model,
        Arc::new(StandardTargetCalculator),
        Arc::new(fast_config()),
    )
}
