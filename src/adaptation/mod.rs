// src/adaptation/mod.rs

//! Rule-governed adaptation of a cached plan to a new context.
//!
//! Rejection is a value, not an exception: every gate (viability,
//! validation, confidence) returns `None` and the orchestrator falls back
//! to AI generation. Confidence is a product of per-step multipliers; the
//! exact values are empirically chosen and behavior-sensitive, so they stay
//! as written.

pub mod viability;

use std::sync::Arc;

use tracing::debug;

pub use viability::{ContextDifferences, calculate_differences, diet_compatible};

use crate::config::PlanCacheConfig;
use crate::core::types::{
    Adaptation, AdaptationCategory, AdaptationKind, AdaptedPlan, CachedPlan, TrainingSession,
    UserPlanningContext, WeekPlan,
};
use crate::targets::TargetCalculator;

const MIN_DAY_CALORIES: f64 = 1000.0;
const MAX_DAY_CALORIES: f64 = 5000.0;
const MACRO_TOLERANCE: f64 = 0.15;

pub struct PlanAdapter {
    targets: Arc<dyn TargetCalculator>,
    config: Arc<PlanCacheConfig>,
}

impl PlanAdapter {
    pub fn new(targets: Arc<dyn TargetCalculator>, config: Arc<PlanCacheConfig>) -> Self {
        Self { targets, config }
    }

    /// Adapt a cached plan to a new context. `None` means "regenerate
    /// instead": viability, validation or confidence refused the reuse.
    pub fn adapt_plan(
        &self,
        cached: &CachedPlan,
        new_ctx: &UserPlanningContext,
    ) -> Option<AdaptedPlan> {
        // Step 1: viability. Hard disqualifiers first so no partial work is
        // wasted.
        let diffs = calculate_differences(new_ctx, &cached.context);
        if !viability::check(&diffs, &self.config) {
            debug!(plan_id = %cached.id, "adaptation refused by viability gate");
            return None;
        }
        if !diet_compatible(cached.context.nutrition.diet_type, new_ctx.nutrition.diet_type) {
            debug!(
                plan_id = %cached.id,
                original = cached.context.nutrition.diet_type.as_str(),
                target = new_ctx.nutrition.diet_type.as_str(),
                "adaptation refused: diet not in compatibility list"
            );
            return None;
        }

        let needs_nutrition = diffs.weight_kg > self.config.nutrition_weight_delta_kg
            || diffs.diet_differs
            || !diffs.added_intolerances.is_empty();
        let needs_training = diffs.days_delta != 0 || diffs.level_differs;

        let mut plan = cached.plan.clone();
        let mut adaptations = Vec::new();
        let mut confidence: f64 = 1.0;

        // Step 2: nutrition rescale.
        if needs_nutrition {
            let new_targets = self.targets.calculate(new_ctx);
            let old_training_cal = cached.context.targets.calories.training_day;
            if old_training_cal <= 0.0 {
                debug!(plan_id = %cached.id, "cached plan has no usable calorie baseline");
                return None;
            }
            let ratio = new_targets.calories.training_day / old_training_cal;

            plan = scale_week_plan(&plan, ratio);
            for day in &mut plan.days {
                day.nutrition.target_calories = if day.is_training_day {
                    new_targets.calories.training_day
                } else {
                    new_targets.calories.rest_day
                };
                day.nutrition.target_protein_g = new_targets.macros.protein_g;
                day.nutrition.target_carbs_g = new_targets.macros.carbs_g;
                day.nutrition.target_fat_g = new_targets.macros.fat_g;
                day.nutrition.target_fiber_g = new_targets.macros.fiber_g;
            }
            adaptations.push(Adaptation {
                category: AdaptationCategory::Nutrition,
                kind: AdaptationKind::Scaling,
                description: format!("scaled all meals and ingredients by {ratio:.3}"),
            });

            // Ingredient-level substitution is noted, not performed here.
            let new_intolerances = diffs.added_intolerances.len();
            if new_intolerances > 0 {
                adaptations.push(Adaptation {
                    category: AdaptationCategory::Nutrition,
                    kind: AdaptationKind::Substitution,
                    description: format!(
                        "new intolerances require ingredient review: {}",
                        diffs.added_intolerances.join(", ")
                    ),
                });
                confidence *= (1.0 - 0.1 * new_intolerances as f64).max(0.5);
            }
        }

        // Step 3: training volume.
        if needs_training && diffs.days_delta != 0 {
            adjust_training_days(&mut plan, new_ctx.training.days_per_week);
            adaptations.push(Adaptation {
                category: AdaptationCategory::Training,
                kind: AdaptationKind::Scaling,
                description: format!(
                    "training days {} -> {}",
                    cached.context.training.days_per_week, new_ctx.training.days_per_week
                ),
            });
            // Consolidating sessions is lossy; synthesizing new ones is
            // lossier.
            confidence *= if diffs.days_delta < 0 { 0.85 } else { 0.80 };
        }

        // Step 4: validation.
        if let Err(reason) = validate_plan(&plan) {
            debug!(plan_id = %cached.id, reason, "adapted plan failed validation");
            return None;
        }

        // Step 5: confidence gate.
        if confidence < self.config.min_confidence {
            debug!(
                plan_id = %cached.id,
                confidence,
                min = self.config.min_confidence,
                "adapted plan below confidence minimum"
            );
            return None;
        }

        Some(AdaptedPlan {
            plan,
            adaptations,
            confidence,
        })
    }

    /// Cheap proxy for how invasive an adaptation would be, used by the cost
    /// policy without running the full adapter.
    pub fn calculate_adaptation_complexity(
        original: &UserPlanningContext,
        new_ctx: &UserPlanningContext,
    ) -> f64 {
        let diffs = calculate_differences(new_ctx, original);
        let mut complexity = (diffs.weight_kg / 50.0).min(0.2);
        if diffs.diet_differs {
            complexity += 0.3;
        }
        complexity += (diffs.added_intolerances.len() as f64 * 0.1).min(0.3);
        if diffs.days_delta != 0 {
            complexity += 0.2;
        }
        complexity.min(1.0)
    }
}

/// Uniform rescale of every meal and ingredient amount. Preserves recipe
/// proportions instead of re-deriving recipes.
pub fn scale_week_plan(plan: &WeekPlan, ratio: f64) -> WeekPlan {
    let mut scaled = plan.clone();
    for day in &mut scaled.days {
        for meal in &mut day.nutrition.meals {
            meal.calories = (meal.calories * ratio).round();
            meal.protein_g = (meal.protein_g * ratio).round();
            meal.carbs_g = (meal.carbs_g * ratio).round();
            meal.fat_g = (meal.fat_g * ratio).round();
            meal.fiber_g = (meal.fiber_g * ratio).round();
            for ingredient in &mut meal.ingredients {
                ingredient.amount = (ingredient.amount * ratio * 10.0).round() / 10.0;
            }
        }
    }
    scaled
}

/// Flip training-day flags until the plan matches the requested weekly
/// count. Promoted rest days get a session cloned from an existing training
/// day; demoted days lose theirs.
fn adjust_training_days(plan: &mut WeekPlan, target_days: u8) {
    let template: Option<TrainingSession> = plan
        .days
        .iter()
        .find_map(|d| d.training.clone())
        .or_else(|| {
            Some(TrainingSession {
                focus: "full body".to_string(),
                duration_min: 60,
                exercises: vec![],
            })
        });

    let mut current = plan.training_day_count();
    let target = target_days as usize;

    if current > target {
        for day in plan.days.iter_mut().rev() {
            if current == target {
                break;
            }
            if day.is_training_day {
                day.is_training_day = false;
                day.training = None;
                current -= 1;
            }
        }
    } else {
        for day in plan.days.iter_mut() {
            if current == target {
                break;
            }
            if !day.is_training_day {
                day.is_training_day = true;
                day.training = template.clone();
                current += 1;
            }
        }
    }
}

/// Domain validity gate shared by adaptation output checks.
pub fn validate_plan(plan: &WeekPlan) -> Result<(), String> {
    for day in &plan.days {
        if day.nutrition.meals.is_empty() {
            return Err(format!("day {} has no meals", day.day_index));
        }
        let calories = day.total_calories();
        if !(MIN_DAY_CALORIES..=MAX_DAY_CALORIES).contains(&calories) {
            return Err(format!(
                "day {} calories {calories:.0} outside [{MIN_DAY_CALORIES}, {MAX_DAY_CALORIES}]",
                day.day_index
            ));
        }
        let checks = [
            ("protein", day.total_protein_g(), day.nutrition.target_protein_g),
            ("carbs", day.total_carbs_g(), day.nutrition.target_carbs_g),
            ("fat", day.total_fat_g(), day.nutrition.target_fat_g),
        ];
        for (name, actual, target) in checks {
            if target > 0.0 && ((actual - target) / target).abs() > MACRO_TOLERANCE {
                return Err(format!(
                    "day {} {name} {actual:.0}g deviates more than 15% from target {target:.0}g",
                    day.day_index
                ));
            }
        }
    }
    Ok(())
}
