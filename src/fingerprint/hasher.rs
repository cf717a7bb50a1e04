// src/fingerprint/hasher.rs

//! Derives the three cache keys from a planning context.
//!
//! Exact hash: SHA-256 over canonical JSON of the full context. Any field
//! change flips it; used only for perfect-replay hits.
//!
//! Semantic hash: SHA-256 over a bucketized subset of fields. Contexts that
//! differ only outside that subset (say, a different excluded-foods list)
//! collide on purpose; the collision set is the cache archetype.
//!
//! Compound key: a cheap pipe-joined string used purely as an index prefix
//! for narrowing candidates before vector comparison.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::types::{
    DietType, ExperienceLevel, Gender, PrimaryGoal, UserPlanningContext,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextHashes {
    pub exact: String,
    pub semantic: String,
    pub compound: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Content-addressed fingerprint of the full context, 64 hex chars.
///
/// `UserPlanningContext` declares its fields alphabetically, so serde_json
/// output is already canonical for the top-level keys.
pub fn exact_hash(ctx: &UserPlanningContext) -> String {
    let canonical =
        serde_json::to_string(ctx).expect("planning context serializes to JSON");
    sha256_hex(canonical.as_bytes())
}

/// The reduced, bucketized field set behind the semantic hash. Fields are
/// declared alphabetically to keep the serialized form canonical.
#[derive(Debug, Serialize)]
struct SemanticFeatures {
    age_bucket: u32,
    days_per_week: u8,
    diet_type: DietType,
    experience_level: ExperienceLevel,
    gender: Gender,
    has_competition: bool,
    meals_per_day: u8,
    primary_goal: PrimaryGoal,
    session_bucket_min: u32,
    sport_type: String,
    timeline_bucket: u32,
    weight_bucket: u32,
}

fn timeline_bucket(weeks: u32) -> u32 {
    weeks / 4
}

impl SemanticFeatures {
    fn from_context(ctx: &UserPlanningContext) -> Self {
        Self {
            age_bucket: ctx.biometrics.age / 10,
            days_per_week: ctx.training.days_per_week,
            diet_type: ctx.nutrition.diet_type,
            experience_level: ctx.training.experience_level,
            gender: ctx.biometrics.gender,
            has_competition: ctx.objective.has_competition,
            meals_per_day: ctx.nutrition.meals_per_day,
            primary_goal: ctx.objective.primary_goal,
            // Rounded to the nearest 15 minutes.
            session_bucket_min: (ctx.training.session_duration_min + 7) / 15 * 15,
            sport_type: ctx.training.sport_type.clone(),
            timeline_bucket: timeline_bucket(ctx.objective.timeline_weeks),
            weight_bucket: (ctx.biometrics.weight_kg / 5.0).round() as u32,
        }
    }
}

/// Fingerprint of the bucketized feature subset, 64 hex chars.
pub fn semantic_hash(ctx: &UserPlanningContext) -> String {
    let features = SemanticFeatures::from_context(ctx);
    let canonical =
        serde_json::to_string(&features).expect("semantic features serialize to JSON");
    sha256_hex(canonical.as_bytes())
}

/// `"{goal}|{level}|{days}|{diet}|{timeline_bucket}"`: not a content hash,
/// just a storage index prefix.
pub fn compound_key(ctx: &UserPlanningContext) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        ctx.objective.primary_goal.as_str(),
        ctx.training.experience_level.as_str(),
        ctx.training.days_per_week,
        ctx.nutrition.diet_type.as_str(),
        timeline_bucket(ctx.objective.timeline_weeks),
    )
}

pub fn all_hashes(ctx: &UserPlanningContext) -> ContextHashes {
    ContextHashes {
        exact: exact_hash(ctx),
        semantic: semantic_hash(ctx),
        compound: compound_key(ctx),
    }
}

/// Short stable identifier for anonymized logging. Not reversible in
/// practice, but explicitly not a security primitive.
pub fn hash_user_id(user_id: &str) -> String {
    sha256_hex(user_id.as_bytes())[..12].to_string()
}
