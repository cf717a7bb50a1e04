// src/storage/migration.rs
//! Schema bootstrap for the plan cache. Run at startup; every statement is
//! idempotent.

use anyhow::Result;
use sqlx::SqlitePool;

const CREATE_CACHED_PLANS: &str = r#"
CREATE TABLE IF NOT EXISTS cached_plans (
    id TEXT PRIMARY KEY,
    exact_hash TEXT NOT NULL,
    semantic_hash TEXT NOT NULL,
    compound_key TEXT NOT NULL,
    feature_vector BLOB NOT NULL,
    plan_json TEXT NOT NULL,
    context_json TEXT NOT NULL,
    source TEXT NOT NULL CHECK (source IN ('ai', 'adapted')),
    origin_plan_id TEXT,
    user_id TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    last_accessed_at DATETIME NOT NULL
);
"#;

const CREATE_GENERATION_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS generation_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_hash TEXT NOT NULL,
    strategy TEXT NOT NULL CHECK (strategy IN ('ai', 'cache_exact', 'cache_adapted')),
    reason TEXT,
    cost_usd REAL NOT NULL DEFAULT 0,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    success BOOLEAN NOT NULL,
    error TEXT,
    similarity REAL,
    created_at DATETIME NOT NULL
);
"#;

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_cached_plans_exact ON cached_plans(exact_hash);",
    "CREATE INDEX IF NOT EXISTS idx_cached_plans_semantic ON cached_plans(semantic_hash);",
    "CREATE INDEX IF NOT EXISTS idx_cached_plans_compound ON cached_plans(compound_key);",
    "CREATE INDEX IF NOT EXISTS idx_cached_plans_user ON cached_plans(user_id);",
    "CREATE INDEX IF NOT EXISTS idx_generation_events_created ON generation_events(created_at);",
    "CREATE INDEX IF NOT EXISTS idx_generation_events_strategy ON generation_events(strategy, created_at);",
];

/// Ensure all tables and indexes exist.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_CACHED_PLANS).execute(pool).await?;
    sqlx::query(CREATE_GENERATION_EVENTS).execute(pool).await?;
    for stmt in INDEXES {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}
