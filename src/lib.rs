// src/lib.rs

//! Hybrid plan-generation cache.
//!
//! Produces personalized weekly training and nutrition plans while spending
//! as little as possible on the generative model behind them. Every request
//! flows through [`orchestrator::PlanOrchestrator`]: exact cache replay
//! first, then similarity-ranked candidates, then a scored cost decision
//! between fresh AI generation, deterministic adaptation of a cached plan,
//! and direct reuse.

pub mod adaptation;
pub mod analytics;
pub mod cache;
pub mod config;
pub mod core;
pub mod cost;
pub mod fingerprint;
pub mod generator;
pub mod matcher;
pub mod orchestrator;
pub mod storage;
pub mod targets;
pub mod vector;

pub use adaptation::PlanAdapter;
pub use analytics::{AnalyticsStore, GenerationEvent, SqliteAnalyticsStore};
pub use cache::CacheManager;
pub use config::PlanCacheConfig;
pub use crate::core::errors::{AiError, ModelError, VectorError};
pub use crate::core::types::{
    CachedPlan, PlanGenerationResult, PlanSource, ResultSource, UserPlanningContext, UserTier,
    WeekPlan,
};
pub use cost::{CostOptimizer, SpendTracker, Strategy};
pub use generator::{AiGenerator, PlanModel};
pub use matcher::{CachedPlanMatch, SimilarityMatcher};
pub use orchestrator::PlanOrchestrator;
pub use storage::{PlanRepository, SqlitePlanRepository};
pub use targets::{StandardTargetCalculator, TargetCalculator};
