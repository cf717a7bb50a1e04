// src/core/types.rs

//! Domain types shared across the plan-generation cache.
//! Contexts are immutable snapshots; adaptation always clones before mutating.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Training/nutrition goal. The single most important axis for similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    Cut,
    Bulk,
    Maintain,
    Recomp,
    Performance,
}

impl PrimaryGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryGoal::Cut => "cut",
            PrimaryGoal::Bulk => "bulk",
            PrimaryGoal::Maintain => "maintain",
            PrimaryGoal::Recomp => "recomp",
            PrimaryGoal::Performance => "performance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        }
    }

    /// Ordinal rank used for experience-gap math.
    pub fn rank(&self) -> u8 {
        match self {
            ExperienceLevel::Beginner => 0,
            ExperienceLevel::Intermediate => 1,
            ExperienceLevel::Advanced => 2,
        }
    }

    pub fn gap(&self, other: ExperienceLevel) -> u8 {
        self.rank().abs_diff(other.rank())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    Omnivore,
    Pescatarian,
    Vegetarian,
    Vegan,
}

impl DietType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DietType::Omnivore => "omnivore",
            DietType::Pescatarian => "pescatarian",
            DietType::Vegetarian => "vegetarian",
            DietType::Vegan => "vegan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// Ordinal index, 0..=4. Used for feature normalization and TDEE factors.
    pub fn index(&self) -> u8 {
        match self {
            ActivityLevel::Sedentary => 0,
            ActivityLevel::Light => 1,
            ActivityLevel::Moderate => 2,
            ActivityLevel::Active => 3,
            ActivityLevel::VeryActive => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingLocation {
    Gym,
    Home,
    Outdoor,
}

// ============================================================================
// User planning context
// ============================================================================
//
// Field declaration order is alphabetical on every struct that feeds the
// exact hash: serde_json emits struct fields in declaration order, so this
// gives us canonical JSON without a post-sort step.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biometrics {
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub has_competition: bool,
    pub primary_goal: PrimaryGoal,
    pub target_date: Option<NaiveDate>,
    pub timeline_weeks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub availability: String,
    pub country: String,
    pub daily_activity_level: ActivityLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProfile {
    pub available_equipment: Vec<String>,
    pub days_per_week: u8,
    pub experience_level: ExperienceLevel,
    pub has_injuries: bool,
    pub session_duration_min: u32,
    pub sport_type: String,
    pub training_location: TrainingLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionProfile {
    pub allergies: Vec<String>,
    pub diet_type: DietType,
    pub excluded_foods: Vec<String>,
    pub intolerances: Vec<String>,
    pub meals_per_day: u8,
}

impl NutritionProfile {
    /// Total count of dietary restrictions of any kind.
    pub fn restriction_count(&self) -> usize {
        self.allergies.len() + self.intolerances.len() + self.excluded_foods.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalorieTargets {
    pub rest_day: f64,
    pub training_day: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub protein_g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionTargets {
    pub calories: CalorieTargets,
    pub macros: MacroTargets,
}

/// Immutable snapshot of everything needed to generate one user's plan.
/// Never mutated after construction; adaptation compares a new context
/// against the stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPlanningContext {
    pub activity: Activity,
    pub biometrics: Biometrics,
    pub nutrition: NutritionProfile,
    pub objective: Objective,
    pub targets: NutritionTargets,
    pub training: TrainingProfile,
    pub user_id: String,
}

// ============================================================================
// Plans
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayNutrition {
    pub target_calories: f64,
    pub target_protein_g: f64,
    pub target_carbs_g: f64,
    pub target_fat_g: f64,
    pub target_fiber_g: f64,
    pub meals: Vec<MealPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub focus: String,
    pub duration_min: u32,
    pub exercises: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day_index: u8,
    pub is_training_day: bool,
    pub nutrition: DayNutrition,
    pub training: Option<TrainingSession>,
}

/// The generated artifact: seven ordered days of nutrition and training.
/// Immutable once cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub week_number: u32,
    pub days: Vec<DayPlan>,
}

// ============================================================================
// Cached records and results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Ai,
    Adapted,
}

impl PlanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSource::Ai => "ai",
            PlanSource::Adapted => "adapted",
        }
    }
}

/// Persisted cache record. `access_count` only ever increases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPlan {
    pub id: String,
    pub exact_hash: String,
    pub semantic_hash: String,
    pub compound_key: String,
    pub feature_vector: Vec<f32>,
    pub plan: WeekPlan,
    pub context: UserPlanningContext,
    pub source: PlanSource,
    pub origin_plan_id: Option<String>,
    pub user_id: String,
    pub access_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

/// Where the plan handed back to the caller actually came from.
/// Direct cache serves are reported as `CacheExact` (both are zero-cost).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Ai,
    CacheExact,
    CacheAdapted,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSource::Ai => "ai",
            ResultSource::CacheExact => "cache_exact",
            ResultSource::CacheAdapted => "cache_adapted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationCategory {
    Training,
    Nutrition,
    Timeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationKind {
    Substitution,
    Scaling,
    Removal,
    Addition,
}

/// One change made while adapting a cached plan to a new context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adaptation {
    pub category: AdaptationCategory,
    pub kind: AdaptationKind,
    pub description: String,
}

/// Output of a successful adaptation run.
#[derive(Debug, Clone)]
pub struct AdaptedPlan {
    pub plan: WeekPlan,
    pub adaptations: Vec<Adaptation>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationMetadata {
    pub plan_id: Option<String>,
    pub cached_plan_id: Option<String>,
    pub similarity_score: Option<f32>,
    pub cost_usd: f64,
    pub response_time_ms: u64,
    pub adaptations: Option<Vec<Adaptation>>,
    pub confidence: Option<f64>,
    pub decision_reason: Option<String>,
}

/// What `generate_plan` hands back: a valid plan plus provenance.
#[derive(Debug, Clone)]
pub struct PlanGenerationResult {
    pub plan: WeekPlan,
    pub source: ResultSource,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTier {
    Free,
    Premium,
    Enterprise,
}

impl WeekPlan {
    /// Number of days flagged as training days.
    pub fn training_day_count(&self) -> usize {
        self.days.iter().filter(|d| d.is_training_day).count()
    }
}

impl DayPlan {
    pub fn total_calories(&self) -> f64 {
        self.nutrition.meals.iter().map(|m| m.calories).sum()
    }

    pub fn total_protein_g(&self) -> f64 {
        self.nutrition.meals.iter().map(|m| m.protein_g).sum()
    }

    pub fn total_carbs_g(&self) -> f64 {
        self.nutrition.meals.iter().map(|m| m.carbs_g).sum()
    }

    pub fn total_fat_g(&self) -> f64 {
        self.nutrition.meals.iter().map(|m| m.fat_g).sum()
    }
}
