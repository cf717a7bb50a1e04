// src/config/mod.rs

//! All tunables for the plan-generation cache in one place.
//!
//! Defaults are the production values; `from_env` lets deployments override
//! individual knobs with `PLANCACHE_*` variables without a config file.

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PlanCacheConfig {
    // ── Similarity scoring
    /// Matches scoring below this are discarded outright.
    pub similarity_threshold_low: f32,
    pub penalty_diet: f32,
    pub penalty_days_per_week: f32,
    pub penalty_competition: f32,
    pub penalty_new_intolerances: f32,
    pub penalty_goal: f32,
    pub penalty_level_gap: f32,
    /// How many candidates the compound-key pre-filter pulls before scoring.
    pub prefilter_limit: i64,
    pub default_match_limit: usize,

    // ── Adaptability thresholds (shared by matcher and adapter)
    pub max_weight_delta_kg: f64,
    pub max_timeline_delta_weeks: u32,
    /// Experience-level gap at which adaptation is refused (2 = beginner vs
    /// advanced).
    pub max_level_gap: u8,
    /// Adapted plans below this confidence are rejected.
    pub min_confidence: f64,
    /// Weight delta above which nutrition must be rescaled.
    pub nutrition_weight_delta_kg: f64,

    // ── Spend policy
    pub daily_ai_call_limit: i64,
    pub monthly_budget_usd: f64,
    pub estimated_cost_per_week_usd: f64,
    pub cost_per_1k_tokens_usd: f64,
    /// Bootstrap bias: below this many cached plans, prefer AI.
    pub cold_cache_threshold: i64,
    /// Peak-hour window (UTC, start inclusive, end exclusive) where low
    /// latency cache responses are preferred.
    pub peak_hour_start: u32,
    pub peak_hour_end: u32,

    // ── AI generator
    pub model_name: String,
    pub model_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,

    // ── Housekeeping
    pub retention_days: i64,
    pub multi_week_pause_ms: u64,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold_low: 0.60,
            penalty_diet: 0.15,
            penalty_days_per_week: 0.10,
            penalty_competition: 0.10,
            penalty_new_intolerances: 0.10,
            penalty_goal: 0.25,
            penalty_level_gap: 0.20,
            prefilter_limit: 20,
            default_match_limit: 5,

            max_weight_delta_kg: 15.0,
            max_timeline_delta_weeks: 6,
            max_level_gap: 2,
            min_confidence: 0.5,
            nutrition_weight_delta_kg: 2.0,

            daily_ai_call_limit: 100,
            monthly_budget_usd: 50.0,
            estimated_cost_per_week_usd: 0.05,
            cost_per_1k_tokens_usd: 0.01,
            cold_cache_threshold: 100,
            peak_hour_start: 17,
            peak_hour_end: 22,

            model_name: "plan-gen-1".to_string(),
            model_timeout_ms: 60_000,
            max_retries: 3,
            retry_base_delay_ms: 1_000,

            retention_days: 90,
            multi_week_pause_ms: 1_000,
        }
    }
}

impl PlanCacheConfig {
    /// Load defaults, then apply any `PLANCACHE_*` environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PLANCACHE_SIMILARITY_THRESHOLD_LOW") {
            if let Ok(v) = val.parse() {
                config.similarity_threshold_low = v;
            }
        }
        if let Ok(val) = std::env::var("PLANCACHE_DAILY_AI_CALL_LIMIT") {
            if let Ok(v) = val.parse() {
                config.daily_ai_call_limit = v;
            }
        }
        if let Ok(val) = std::env::var("PLANCACHE_MONTHLY_BUDGET_USD") {
            if let Ok(v) = val.parse() {
                config.monthly_budget_usd = v;
            }
        }
        if let Ok(val) = std::env::var("PLANCACHE_MODEL_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                config.model_timeout_ms = v;
            }
        }
        if let Ok(val) = std::env::var("PLANCACHE_MAX_RETRIES") {
            if let Ok(v) = val.parse() {
                config.max_retries = v;
            }
        }
        if let Ok(val) = std::env::var("PLANCACHE_RETENTION_DAYS") {
            if let Ok(v) = val.parse() {
                config.retention_days = v;
            }
        }
        if let Ok(val) = std::env::var("PLANCACHE_MIN_CONFIDENCE") {
            if let Ok(v) = val.parse() {
                config.min_confidence = v;
            }
        }
        if let Ok(val) = std::env::var("PLANCACHE_MODEL_NAME") {
            config.model_name = val;
        }

        config
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::from_env())
    }

    pub fn is_peak_hour(&self, hour: u32) -> bool {
        hour >= self.peak_hour_start && hour < self.peak_hour_end
    }
}
