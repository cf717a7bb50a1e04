// src/matcher/mod.rs

//! Ranks cached plans against a new context.
//!
//! Pre-filters by compound key so the whole cache is never scored, then
//! combines weighted cosine similarity with additive rule penalties.
//! Penalties are additive rather than multiplicative: one mismatch cannot
//! zero out an otherwise-excellent match unless it is hard-disqualifying.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::adaptation::viability::{self, ContextDifferences, calculate_differences};
use crate::cache::CacheManager;
use crate::config::PlanCacheConfig;
use crate::core::types::{CachedPlan, UserPlanningContext};
use crate::fingerprint;
use crate::vector;

/// A cached plan scored against a new context.
#[derive(Debug, Clone)]
pub struct CachedPlanMatch {
    pub plan: CachedPlan,
    pub score: f32,
    pub differences: ContextDifferences,
}

pub struct SimilarityMatcher {
    cache: Arc<CacheManager>,
    config: Arc<PlanCacheConfig>,
}

impl SimilarityMatcher {
    pub fn new(cache: Arc<CacheManager>, config: Arc<PlanCacheConfig>) -> Self {
        Self { cache, config }
    }

    /// Top `limit` cached plans ranked by adjusted similarity, best first.
    /// Candidates below the low threshold are dropped.
    pub async fn find_similar(
        &self,
        ctx: &UserPlanningContext,
        limit: usize,
    ) -> Vec<CachedPlanMatch> {
        let candidates = self
            .cache
            .find_by_compound_key(ctx, self.config.prefilter_limit)
            .await;
        if candidates.is_empty() {
            debug!("no compound-key candidates");
            return Vec::new();
        }

        let new_vector = fingerprint::extract_features(ctx);
        let weights = fingerprint::feature_weights();

        let mut matches = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let base = match vector::weighted_cosine_similarity(
                &new_vector,
                &candidate.feature_vector,
                weights,
            ) {
                Ok(sim) => sim,
                Err(e) => {
                    // A stored vector of the wrong length means a corrupt
                    // record; skip it rather than fail the search.
                    warn!(plan_id = %candidate.id, error = %e, "skipping candidate");
                    continue;
                }
            };

            let diffs = calculate_differences(ctx, &candidate.context);
            let score = (base + self.penalty_adjustment(&diffs)).clamp(0.0, 1.0);

            if score < self.config.similarity_threshold_low {
                continue;
            }
            matches.push(CachedPlanMatch {
                plan: candidate,
                score,
                differences: diffs,
            });
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);

        debug!(
            count = matches.len(),
            top_score = matches.first().map(|m| m.score).unwrap_or(0.0),
            "similarity search complete"
        );
        matches
    }

    /// Signed adjustment added to the base similarity.
    fn penalty_adjustment(&self, diffs: &ContextDifferences) -> f32 {
        let cfg = &self.config;
        let mut adjustment = 0.0;

        if diffs.diet_differs {
            adjustment -= cfg.penalty_diet;
        }
        if diffs.days_delta != 0 {
            adjustment -= cfg.penalty_days_per_week;
        }
        if diffs.competition_differs {
            adjustment -= cfg.penalty_competition;
        }
        // New intolerances risk unsafe ingredient carryover.
        if !diffs.added_intolerances.is_empty() {
            adjustment -= cfg.penalty_new_intolerances;
        }
        // Goal is the single most important axis.
        if diffs.goal_differs {
            adjustment -= cfg.penalty_goal;
        }
        if diffs.level_gap > 1 {
            adjustment -= cfg.penalty_level_gap;
        }
        adjustment
    }

    /// Conservative gate: can this match be adapted at all? Shares its
    /// thresholds with the adapter's own viability check.
    pub fn is_adaptable(&self, diffs: &ContextDifferences, score: f32) -> bool {
        if score < self.config.similarity_threshold_low {
            return false;
        }
        viability::check(diffs, &self.config)
    }
}
