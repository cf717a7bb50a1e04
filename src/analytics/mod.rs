// src/analytics/mod.rs

//! Append-only log of every generation decision.
//!
//! Not on the hot path's control flow, but the cost optimizer's hard spend
//! gates read from it (`today_ai_calls`, `monthly_spend`), so event writes
//! must land before the next request's gate check matters.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::core::types::ResultSource;
use crate::cost::SpendTracker;

/// One recorded generation decision.
#[derive(Debug, Clone)]
pub struct GenerationEvent {
    pub user_hash: String,
    pub strategy: ResultSource,
    pub reason: Option<String>,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub success: bool,
    pub error: Option<String>,
    pub similarity: Option<f32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CachePerformance {
    pub window_days: i64,
    pub total_generations: i64,
    pub ai_calls: i64,
    pub cache_hits: i64,
    pub hit_rate: f64,
    pub total_cost_usd: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyUsage {
    pub date: String,
    pub total: i64,
    pub ai_calls: i64,
    pub cache_hits: i64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyUsage {
    pub hour: u32,
    pub count: i64,
}

/// Append-only event store with the aggregate queries the cost policy and
/// reporting need.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn record(&self, event: &GenerationEvent) -> Result<()>;

    /// AI-strategy events logged today (UTC), successful or not.
    async fn today_ai_calls(&self) -> Result<i64>;

    /// Total recorded spend for the current calendar month (UTC).
    async fn monthly_spend(&self) -> Result<f64>;

    async fn cache_performance(&self, days: i64) -> Result<CachePerformance>;

    async fn weekly_report(&self) -> Result<Vec<DailyUsage>>;

    async fn usage_by_hour(&self) -> Result<Vec<HourlyUsage>>;
}

pub struct SqliteAnalyticsStore {
    pool: SqlitePool,
}

impl SqliteAnalyticsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// The cost optimizer's hard gates read straight from the event log.
#[async_trait]
impl SpendTracker for SqliteAnalyticsStore {
    async fn today_ai_calls(&self) -> Result<i64> {
        AnalyticsStore::today_ai_calls(self).await
    }

    async fn monthly_spend(&self) -> Result<f64> {
        AnalyticsStore::monthly_spend(self).await
    }
}

#[async_trait]
impl AnalyticsStore for SqliteAnalyticsStore {
    async fn record(&self, event: &GenerationEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO generation_events (
                user_hash, strategy, reason, cost_usd, duration_ms,
                success, error, similarity, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.user_hash)
        .bind(event.strategy.as_str())
        .bind(&event.reason)
        .bind(event.cost_usd)
        .bind(event.duration_ms)
        .bind(event.success)
        .bind(&event.error)
        .bind(event.similarity)
        .bind(event.created_at.naive_utc())
        .execute(&self.pool)
        .await?;

        debug!(
            strategy = event.strategy.as_str(),
            success = event.success,
            cost_usd = event.cost_usd,
            "recorded generation event"
        );
        Ok(())
    }

    async fn today_ai_calls(&self) -> Result<i64> {
        let start_of_day = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default();

        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM generation_events \
             WHERE strategy = 'ai' AND created_at >= ?",
        )
        .bind(start_of_day)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    async fn monthly_spend(&self) -> Result<f64> {
        let now = Utc::now();
        let month_start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .map(|dt| dt.naive_utc())
            .unwrap_or_else(|| now.naive_utc());

        let row = sqlx::query(
            "SELECT COALESCE(SUM(cost_usd), 0.0) AS spend FROM generation_events \
             WHERE created_at >= ?",
        )
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("spend"))
    }

    async fn cache_performance(&self, days: i64) -> Result<CachePerformance> {
        let since = (Utc::now() - Duration::days(days)).naive_utc();
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN strategy = 'ai' THEN 1 ELSE 0 END), 0) AS ai_calls,
                COALESCE(SUM(CASE WHEN strategy IN ('cache_exact', 'cache_adapted')
                             THEN 1 ELSE 0 END), 0) AS cache_hits,
                COALESCE(SUM(cost_usd), 0.0) AS total_cost
            FROM generation_events
            WHERE success = 1 AND created_at >= ?
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.get("total");
        let cache_hits: i64 = row.get("cache_hits");
        Ok(CachePerformance {
            window_days: days,
            total_generations: total,
            ai_calls: row.get("ai_calls"),
            cache_hits,
            hit_rate: if total > 0 {
                cache_hits as f64 / total as f64
            } else {
                0.0
            },
            total_cost_usd: row.get("total_cost"),
        })
    }

    async fn weekly_report(&self) -> Result<Vec<DailyUsage>> {
        let since = (Utc::now() - Duration::days(7)).naive_utc();
        let rows = sqlx::query(
            r#"
            SELECT
                DATE(created_at) AS day,
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN strategy = 'ai' THEN 1 ELSE 0 END), 0) AS ai_calls,
                COALESCE(SUM(CASE WHEN strategy IN ('cache_exact', 'cache_adapted')
                             THEN 1 ELSE 0 END), 0) AS cache_hits,
                COALESCE(SUM(cost_usd), 0.0) AS cost
            FROM generation_events
            WHERE created_at >= ?
            GROUP BY DATE(created_at)
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DailyUsage {
                date: row.get("day"),
                total: row.get("total"),
                ai_calls: row.get("ai_calls"),
                cache_hits: row.get("cache_hits"),
                cost_usd: row.get("cost"),
            })
            .collect())
    }

    async fn usage_by_hour(&self) -> Result<Vec<HourlyUsage>> {
        let rows = sqlx::query(
            r#"
            SELECT CAST(strftime('%H', created_at) AS INTEGER) AS hour, COUNT(*) AS n
            FROM generation_events
            GROUP BY hour
            ORDER BY hour
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| HourlyUsage {
                hour: row.get::<i64, _>("hour") as u32,
                count: row.get("n"),
            })
            .collect())
    }
}
