// src/fingerprint/extractor.rs

//! Deterministic mapping from a planning context to a fixed-length,
//! normalized feature vector plus per-dimension comparison weights.
//!
//! Denominators are fixed constants chosen so realistic human values land in
//! [0,1]; anything beyond is clamped rather than left unbounded, to avoid
//! cosine distortion from outliers.

use once_cell::sync::Lazy;

use crate::core::types::{DietType, Gender, PrimaryGoal, UserPlanningContext};

/// Total vector length. Segments:
/// physical 0..5, objective 5..12, training 12..20, nutrition 20..26,
/// targets 26..28.
pub const FEATURE_DIM: usize = 28;

const W_PHYSICAL: f32 = 1.0;
const W_OBJECTIVE: f32 = 2.0;
const W_TRAINING: f32 = 1.5;
const W_NUTRITION: f32 = 0.8;
const W_TARGETS: f32 = 1.0;

fn norm(value: f64, denominator: f64) -> f32 {
    (value / denominator).clamp(0.0, 1.0) as f32
}

fn flag(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

/// Pure function: same context always yields the same vector.
pub fn extract_features(ctx: &UserPlanningContext) -> Vec<f32> {
    let mut v = Vec::with_capacity(FEATURE_DIM);

    // Physical (5)
    v.push(norm(ctx.biometrics.age as f64, 100.0));
    v.push(norm(ctx.biometrics.weight_kg, 150.0));
    v.push(norm(ctx.biometrics.height_cm, 200.0));
    v.push(flag(ctx.biometrics.gender == Gender::Male));
    v.push(flag(ctx.biometrics.gender == Gender::Female));

    // Objective (7): goal one-hot, timeline, competition
    let goal = ctx.objective.primary_goal;
    v.push(flag(goal == PrimaryGoal::Cut));
    v.push(flag(goal == PrimaryGoal::Bulk));
    v.push(flag(goal == PrimaryGoal::Maintain));
    v.push(flag(goal == PrimaryGoal::Recomp));
    v.push(flag(goal == PrimaryGoal::Performance));
    v.push(norm(ctx.objective.timeline_weeks as f64, 16.0));
    v.push(flag(ctx.objective.has_competition));

    // Training (8): level one-hot, days, session, activity, injuries, equipment
    let level = ctx.training.experience_level.rank();
    v.push(flag(level == 0));
    v.push(flag(level == 1));
    v.push(flag(level == 2));
    v.push(norm(ctx.training.days_per_week as f64, 7.0));
    v.push(norm(ctx.training.session_duration_min as f64, 120.0));
    v.push(norm(ctx.activity.daily_activity_level.index() as f64, 4.0));
    v.push(flag(ctx.training.has_injuries));
    v.push(norm(ctx.training.available_equipment.len() as f64, 10.0));

    // Nutrition (6): meals, diet one-hot, restrictions
    v.push(norm(ctx.nutrition.meals_per_day as f64, 6.0));
    let diet = ctx.nutrition.diet_type;
    v.push(flag(diet == DietType::Omnivore));
    v.push(flag(diet == DietType::Pescatarian));
    v.push(flag(diet == DietType::Vegetarian));
    v.push(flag(diet == DietType::Vegan));
    v.push(norm(ctx.nutrition.restriction_count() as f64, 10.0));

    // Targets (2)
    v.push(norm(ctx.targets.calories.training_day, 3000.0));
    v.push(norm(ctx.targets.macros.protein_g, 250.0));

    debug_assert_eq!(v.len(), FEATURE_DIM);
    v
}

static FEATURE_WEIGHTS: Lazy<Vec<f32>> = Lazy::new(|| {
    let mut w = Vec::with_capacity(FEATURE_DIM);
    w.extend(std::iter::repeat_n(W_PHYSICAL, 5));
    w.extend(std::iter::repeat_n(W_OBJECTIVE, 7));
    w.extend(std::iter::repeat_n(W_TRAINING, 8));
    w.extend(std::iter::repeat_n(W_NUTRITION, 6));
    w.extend(std::iter::repeat_n(W_TARGETS, 2));
    w
});

/// Fixed per-dimension weights, applied at comparison time only (never
/// stored with the vector). Objective features dominate: a goal mismatch is
/// the most semantically significant difference between two users.
pub fn feature_weights() -> &'static [f32] {
    &FEATURE_WEIGHTS
}
