//! Storage layer for cached plans.
//! All persistence goes through the `PlanRepository` trait; no direct DB
//! calls in business logic.

pub mod migration;
pub mod repository;
pub mod sqlite;

pub use repository::{CacheStats, PlanRepository};
pub use sqlite::SqlitePlanRepository;
