// src/adaptation/viability.rs

//! The one adaptability predicate.
//!
//! The matcher evaluates it when ranking candidates and the adapter
//! re-evaluates it before doing any work; both call this module so the
//! thresholds can never disagree between pipeline stages.

use crate::config::PlanCacheConfig;
use crate::core::types::{DietType, UserPlanningContext};

/// Human-debuggable deltas between a new context and a cached one. Used for
/// adaptation planning and analytics explainability, not for scoring.
#[derive(Debug, Clone, Default)]
pub struct ContextDifferences {
    pub age_years: u32,
    pub weight_kg: f64,
    pub timeline_weeks: u32,
    pub days_delta: i8,
    pub level_gap: u8,
    pub goal_differs: bool,
    pub diet_differs: bool,
    pub competition_differs: bool,
    pub level_differs: bool,
    pub added_intolerances: Vec<String>,
    pub added_exclusions: Vec<String>,
}

/// Compute the deltas between a new context and the cached one it might
/// reuse.
pub fn calculate_differences(
    new_ctx: &UserPlanningContext,
    cached_ctx: &UserPlanningContext,
) -> ContextDifferences {
    let added = |new_list: &[String], old_list: &[String]| -> Vec<String> {
        new_list
            .iter()
            .filter(|item| !old_list.contains(item))
            .cloned()
            .collect()
    };

    ContextDifferences {
        age_years: new_ctx.biometrics.age.abs_diff(cached_ctx.biometrics.age),
        weight_kg: (new_ctx.biometrics.weight_kg - cached_ctx.biometrics.weight_kg).abs(),
        timeline_weeks: new_ctx
            .objective
            .timeline_weeks
            .abs_diff(cached_ctx.objective.timeline_weeks),
        days_delta: new_ctx.training.days_per_week as i8
            - cached_ctx.training.days_per_week as i8,
        level_gap: new_ctx
            .training
            .experience_level
            .gap(cached_ctx.training.experience_level),
        goal_differs: new_ctx.objective.primary_goal != cached_ctx.objective.primary_goal,
        diet_differs: new_ctx.nutrition.diet_type != cached_ctx.nutrition.diet_type,
        competition_differs: new_ctx.objective.has_competition
            != cached_ctx.objective.has_competition,
        level_differs: new_ctx.training.experience_level
            != cached_ctx.training.experience_level,
        added_intolerances: added(
            &new_ctx.nutrition.intolerances,
            &cached_ctx.nutrition.intolerances,
        ),
        added_exclusions: added(
            &new_ctx.nutrition.excluded_foods,
            &cached_ctx.nutrition.excluded_foods,
        ),
    }
}

/// Hard gate: conservative allow-list for whether a cached plan may be
/// adapted across these differences at all.
pub fn check(diffs: &ContextDifferences, config: &PlanCacheConfig) -> bool {
    if diffs.goal_differs {
        return false;
    }
    if diffs.weight_kg > config.max_weight_delta_kg {
        return false;
    }
    if diffs.timeline_weeks > config.max_timeline_delta_weeks {
        return false;
    }
    if diffs.level_gap >= config.max_level_gap {
        return false;
    }
    true
}

/// Which target diets a plan of a given original diet may be adapted to.
/// Crossing out of the allow-list needs full regeneration, not adaptation.
pub fn diet_compatible(original: DietType, target: DietType) -> bool {
    use DietType::*;
    match original {
        Omnivore => matches!(target, Omnivore | Pescatarian | Vegetarian),
        Pescatarian => matches!(target, Pescatarian | Vegetarian),
        Vegetarian => matches!(target, Vegetarian | Vegan),
        Vegan => matches!(target, Vegan),
    }
}
