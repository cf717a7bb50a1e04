// src/targets/mod.rs

//! Nutrition target calculator collaborator.
//!
//! The adapter recomputes targets for a new context with the same function
//! the rest of the system uses, so adapted plans never drift from regular
//! generation. Kept behind a trait so tests can pin exact numbers.

use crate::core::types::{
    ActivityLevel, CalorieTargets, Gender, MacroTargets, NutritionTargets, PrimaryGoal,
    UserPlanningContext,
};

pub trait TargetCalculator: Send + Sync {
    /// Pure and deterministic: same context, same targets.
    fn calculate(&self, ctx: &UserPlanningContext) -> NutritionTargets;
}

/// Mifflin-St Jeor BMR with activity and goal multipliers, split into
/// training-day and rest-day calories at a fixed ratio so uniform meal
/// scaling stays consistent across day types.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardTargetCalculator;

impl StandardTargetCalculator {
    fn activity_factor(level: ActivityLevel) -> f64 {
        match level {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }

    fn goal_factor(goal: PrimaryGoal) -> f64 {
        match goal {
            PrimaryGoal::Cut => 0.80,
            PrimaryGoal::Bulk => 1.15,
            PrimaryGoal::Maintain => 1.0,
            PrimaryGoal::Recomp => 0.90,
            PrimaryGoal::Performance => 1.10,
        }
    }
}

impl TargetCalculator for StandardTargetCalculator {
    fn calculate(&self, ctx: &UserPlanningContext) -> NutritionTargets {
        let b = &ctx.biometrics;
        let gender_term = match b.gender {
            Gender::Male => 5.0,
            Gender::Female => -161.0,
            Gender::Other => -78.0,
        };
        let bmr = 10.0 * b.weight_kg + 6.25 * b.height_cm - 5.0 * b.age as f64 + gender_term;
        let tdee = bmr * Self::activity_factor(ctx.activity.daily_activity_level);
        let base = tdee * Self::goal_factor(ctx.objective.primary_goal);

        let training_day = (base * 1.05).round();
        let rest_day = (base * 0.95).round();

        let protein_g = (2.0 * b.weight_kg).round();
        let fat_g = (0.9 * b.weight_kg).round();
        let carbs_g = ((training_day - protein_g * 4.0 - fat_g * 9.0) / 4.0).max(0.0).round();
        let fiber_g = (14.0 * training_day / 1000.0).round();

        NutritionTargets {
            calories: CalorieTargets {
                rest_day,
                training_day,
            },
            macros: MacroTargets {
                carbs_g,
                fat_g,
                fiber_g,
                protein_g,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::*;

    fn context(weight_kg: f64) -> UserPlanningContext {
        UserPlanningContext {
            activity: Activity {
                availability: "any".to_string(),
                country: "US".to_string(),
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
                meals_per_day: 4,
            },
            objective: Objective {
                has_competition: false,
                primary_goal: PrimaryGoal::Maintain,
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
                available_equipment: vec![],
                days_per_week: 4,
                experience_level: ExperienceLevel::Intermediate,
                has_injuries: false,
                session_duration_min: 60,
                sport_type: "strength".to_string(),
                training_location: TrainingLocation::Gym,
            },
            user_id: "u".to_string(),
        }
    }

    #[test]
    fn deterministic_and_plausible() {
        let calc = StandardTargetCalculator;
        let ctx = context(80.0);
        let a = calc.calculate(&ctx);
        let b = calc.calculate(&ctx);
        assert_eq!(a, b);
        assert!(a.calories.training_day > 2000.0 && a.calories.training_day < 4000.0);
        assert!(a.calories.training_day > a.calories.rest_day);
        assert_eq!(a.macros.protein_g, 160.0);
    }

    #[test]
    fn heavier_user_gets_more_calories() {
        let calc = StandardTargetCalculator;
        let light = calc.calculate(&context(65.0));
        let heavy = calc.calculate(&context(95.0));
        assert!(heavy.calories.training_day > light.calories.training_day);
        assert!(heavy.macros.protein_g > light.macros.protein_g);
    }

    #[test]
    fn training_rest_ratio_is_fixed() {
        let calc = StandardTargetCalculator;
        let a = calc.calculate(&context(70.0));
        let b = calc.calculate(&context(90.0));
        let ratio_a = a.calories.training_day / a.calories.rest_day;
        let ratio_b = b.calories.training_day / b.calories.rest_day;
        assert!((ratio_a - ratio_b).abs() < 0.01);
    }
}
