// src/cost/mod.rs

//! The arbitration policy between AI generation, cache adaptation and
//! direct cache reuse.
//!
//! A scored policy, not a rule tree: independent factors contribute signed
//! integer points and the total picks the strategy. The only short-circuits
//! are the two absolute spend gates. Every decision carries its factor
//! breakdown and a reproducible reason string; an automated spend decision
//! has to be auditable.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Timelike, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PlanCacheConfig;
use crate::core::types::{ExperienceLevel, UserPlanningContext, UserTier};
use crate::matcher::CachedPlanMatch;

/// Live spend counters, injected so tests can stub arbitrary values without
/// shared state.
#[async_trait]
pub trait SpendTracker: Send + Sync {
    async fn today_ai_calls(&self) -> Result<i64>;
    async fn monthly_spend(&self) -> Result<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Ai,
    CacheDirect,
    CacheAdapted,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Ai => "ai",
            Strategy::CacheDirect => "cache_direct",
            Strategy::CacheAdapted => "cache_adapted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    BestMatch,
    Fail,
}

/// Ephemeral: consumed immediately by the orchestrator, logged, never
/// persisted.
#[derive(Debug, Clone)]
pub struct Decision {
    pub use_ai: bool,
    pub strategy: Strategy,
    pub reason: String,
    pub estimated_cost_usd: f64,
    pub fallback: Option<Fallback>,
    pub breakdown: Vec<(String, i32)>,
}

/// Cache-side inputs to the scoring, gathered by the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheSignals {
    pub total_plans: i64,
    pub user_plan_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CostSavings {
    pub cache_hits: i64,
    pub ai_calls: i64,
    pub saved_usd: f64,
    pub hit_rate: f64,
}

pub struct CostOptimizer {
    spend: Arc<dyn SpendTracker>,
    config: Arc<PlanCacheConfig>,
}

impl CostOptimizer {
    pub fn new(spend: Arc<dyn SpendTracker>, config: Arc<PlanCacheConfig>) -> Self {
        Self { spend, config }
    }

    /// Decide how to produce a plan for this context.
    pub async fn should_use_ai(
        &self,
        ctx: &UserPlanningContext,
        matches: &[CachedPlanMatch],
        tier: UserTier,
        signals: CacheSignals,
    ) -> Result<Decision> {
        self.should_use_ai_at(ctx, matches, tier, signals, Utc::now().hour())
            .await
    }

    /// Same as `should_use_ai` with an explicit hour-of-day (UTC), so the
    /// time-of-day factor is reproducible.
    pub async fn should_use_ai_at(
        &self,
        ctx: &UserPlanningContext,
        matches: &[CachedPlanMatch],
        tier: UserTier,
        signals: CacheSignals,
        hour: u32,
    ) -> Result<Decision> {
        // Hard gates first; they short-circuit everything else.
        let today_calls = self.spend.today_ai_calls().await?;
        if today_calls >= self.config.daily_ai_call_limit {
            info!(today_calls, "daily AI call limit reached, forcing cache");
            return Ok(self.forced_cache_decision(
                format!(
                    "daily AI call limit reached ({today_calls}/{})",
                    self.config.daily_ai_call_limit
                ),
                matches,
            ));
        }
        let month_spend = self.spend.monthly_spend().await?;
        if month_spend >= self.config.monthly_budget_usd {
            info!(month_spend, "monthly budget exhausted, forcing cache");
            return Ok(self.forced_cache_decision(
                format!(
                    "monthly budget exhausted (${month_spend:.2}/${:.2})",
                    self.config.monthly_budget_usd
                ),
                matches,
            ));
        }

        let (score, breakdown) = self.score_factors(ctx, matches, tier, signals, hour);
        let best_score = matches.first().map(|m| m.score).unwrap_or(0.0);

        let strategy = if score > 50 {
            Strategy::Ai
        } else if score > 20 {
            // A mediocre score does not justify AI unless there is nothing
            // good enough to adapt.
            if best_score > 0.75 {
                Strategy::CacheAdapted
            } else {
                Strategy::Ai
            }
        } else {
            Strategy::CacheDirect
        };

        let fallback = match strategy {
            Strategy::CacheDirect | Strategy::CacheAdapted => {
                if matches.is_empty() {
                    Some(Fallback::Fail)
                } else {
                    Some(Fallback::BestMatch)
                }
            }
            Strategy::Ai => None,
        };

        let reason = Self::format_reason(score, &breakdown, strategy);
        debug!(score, strategy = strategy.as_str(), %reason, "cost decision");

        Ok(Decision {
            use_ai: strategy == Strategy::Ai,
            strategy,
            reason,
            estimated_cost_usd: if strategy == Strategy::Ai {
                self.config.estimated_cost_per_week_usd
            } else {
                0.0
            },
            fallback,
            breakdown,
        })
    }

    /// Accumulate the signed factor points. Each value is part of the
    /// policy's contract; see the breakdown labels for the audit trail.
    fn score_factors(
        &self,
        ctx: &UserPlanningContext,
        matches: &[CachedPlanMatch],
        tier: UserTier,
        signals: CacheSignals,
        hour: u32,
    ) -> (i32, Vec<(String, i32)>) {
        let mut factors: Vec<(String, i32)> = Vec::new();
        let mut push = |label: &str, points: i32| {
            if points != 0 {
                factors.push((label.to_string(), points));
            }
        };

        // User tier: paying users get the expensive path more readily.
        match tier {
            UserTier::Premium => push("premium_tier", 30),
            UserTier::Enterprise => push("enterprise_tier", 40),
            UserTier::Free => {}
        }
        // First impression is paid for by margin elsewhere.
        if signals.user_plan_count == 0 {
            push("first_plan", 20);
        }

        // Best-match quality.
        match matches.first() {
            None => push("no_cache_candidates", 50),
            Some(best) => {
                if best.score > 0.95 {
                    push("excellent_match", -40);
                } else if best.score > 0.85 {
                    push("strong_match", -20);
                } else if best.score > 0.75 {
                    push("good_match", -10);
                } else {
                    push("weak_best_match", 30);
                }
            }
        }

        // Context complexity: each factor independently additive.
        if ctx.objective.has_competition {
            push("competition_prep", 15);
        }
        if ctx.nutrition.intolerances.len() > 2 {
            push("many_intolerances", 10);
        }
        if ctx.nutrition.excluded_foods.len() > 5 {
            push("many_exclusions", 10);
        }
        if ctx.training.experience_level == ExperienceLevel::Advanced {
            push("advanced_athlete", 10);
        }

        // Cache maturity: bias toward AI while the cache is cold.
        if signals.total_plans < self.config.cold_cache_threshold {
            push("cold_cache", 25);
        }
        if matches.len() < 5 {
            push("few_matches", 15);
        }

        // Prefer low-latency cache responses under peak load.
        if self.config.is_peak_hour(hour) {
            push("peak_hours", -15);
        }

        let score = factors.iter().map(|(_, p)| p).sum();
        (score, factors)
    }

    fn format_reason(score: i32, breakdown: &[(String, i32)], strategy: Strategy) -> String {
        let parts: Vec<String> = breakdown
            .iter()
            .map(|(label, points)| format!("{label}={points:+}"))
            .collect();
        format!(
            "score={score} [{}] -> {}",
            parts.join(", "),
            strategy.as_str()
        )
    }

    fn forced_cache_decision(&self, reason: String, matches: &[CachedPlanMatch]) -> Decision {
        Decision {
            use_ai: false,
            strategy: Strategy::CacheDirect,
            reason,
            estimated_cost_usd: 0.0,
            fallback: Some(if matches.is_empty() {
                Fallback::Fail
            } else {
                Fallback::BestMatch
            }),
            breakdown: Vec::new(),
        }
    }

    /// Probe the two hard gates without committing to a decision.
    pub async fn can_make_ai_call(&self) -> Result<bool> {
        let calls = self.spend.today_ai_calls().await?;
        if calls >= self.config.daily_ai_call_limit {
            return Ok(false);
        }
        let spend = self.spend.monthly_spend().await?;
        Ok(spend < self.config.monthly_budget_usd)
    }

    /// Independent, cheaper-to-compute signal than running the adapter:
    /// adapt when the match is strong and the change is small.
    pub fn should_adapt_instead_of_generate(match_score: f32, complexity: f64) -> bool {
        (match_score > 0.90 && complexity < 0.3) || (match_score > 0.80 && complexity < 0.5)
    }

    pub fn calculate_cost_savings(&self, cache_hits: i64, ai_calls: i64) -> CostSavings {
        let total = cache_hits + ai_calls;
        CostSavings {
            cache_hits,
            ai_calls,
            saved_usd: cache_hits as f64 * self.config.estimated_cost_per_week_usd,
            hit_rate: if total > 0 {
                cache_hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}
