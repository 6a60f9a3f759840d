//! # User Performance Metrics Model
//!
//! Materialized per-(user, month) performance buckets. Rows are rebuilt
//! from scratch by the performance refresh aggregation and upserted on
//! `(user_id, period)`; they are a cache, never a source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::Result;

/// One user's performance figures for a `YYYY-MM` period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserPerformanceMetrics {
    pub id: i64,
    pub user_id: i64,
    pub period: String,
    pub offers_handled: i32,
    pub accepted_count: i32,
    pub declined_count: i32,
    pub success_rate: f64,
    pub avg_processing_time_hours: f64,
    pub current_workload: i32,
    pub updated_at: DateTime<Utc>,
}

/// Freshly computed bucket values for one (user, period)
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceBucket {
    pub user_id: i64,
    pub period: String,
    pub offers_handled: i32,
    pub accepted_count: i32,
    pub declined_count: i32,
    pub success_rate: f64,
    pub avg_processing_time_hours: f64,
    pub current_workload: i32,
}

const METRICS_COLUMNS: &str = r#"
    id, user_id, period, offers_handled, accepted_count, declined_count,
    success_rate, avg_processing_time_hours, current_workload, updated_at
"#;

impl UserPerformanceMetrics {
    /// Upsert a rebuilt bucket, replacing any previous values wholesale
    pub async fn upsert<'e>(
        executor: impl PgExecutor<'e>,
        bucket: &PerformanceBucket,
    ) -> Result<UserPerformanceMetrics> {
        let sql = format!(
            r#"
            INSERT INTO user_performance_metrics (
                user_id, period, offers_handled, accepted_count, declined_count,
                success_rate, avg_processing_time_hours, current_workload, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (user_id, period) DO UPDATE SET
                offers_handled = EXCLUDED.offers_handled,
                accepted_count = EXCLUDED.accepted_count,
                declined_count = EXCLUDED.declined_count,
                success_rate = EXCLUDED.success_rate,
                avg_processing_time_hours = EXCLUDED.avg_processing_time_hours,
                current_workload = EXCLUDED.current_workload,
                updated_at = NOW()
            RETURNING {METRICS_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserPerformanceMetrics>(&sql)
            .bind(bucket.user_id)
            .bind(&bucket.period)
            .bind(bucket.offers_handled)
            .bind(bucket.accepted_count)
            .bind(bucket.declined_count)
            .bind(bucket.success_rate)
            .bind(bucket.avg_processing_time_hours)
            .bind(bucket.current_workload)
            .fetch_one(executor)
            .await?;

        Ok(row)
    }

    /// All periods for one user, most recent first
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<UserPerformanceMetrics>> {
        let sql = format!(
            r#"
            SELECT {METRICS_COLUMNS}
            FROM user_performance_metrics
            WHERE user_id = $1
            ORDER BY period DESC
            "#
        );

        let rows = sqlx::query_as::<_, UserPerformanceMetrics>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(rows)
    }

    /// All users' buckets for one `YYYY-MM` period
    pub async fn list_for_period(pool: &PgPool, period: &str) -> Result<Vec<UserPerformanceMetrics>> {
        let sql = format!(
            r#"
            SELECT {METRICS_COLUMNS}
            FROM user_performance_metrics
            WHERE period = $1
            ORDER BY user_id
            "#
        );

        let rows = sqlx::query_as::<_, UserPerformanceMetrics>(&sql)
            .bind(period)
            .fetch_all(pool)
            .await?;

        Ok(rows)
    }
}
