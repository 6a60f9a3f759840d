//! # User Performance Refresh
//!
//! Rebuilds the per-(user, month) performance buckets from offer history
//! and upserts them into `user_performance_metrics`. Buckets key on the
//! month the offer was created. Processing time is the span from
//! creation to last update; samples outside the configured window are
//! clock artifacts and are dropped from the average. The workload column
//! is a point-in-time count of the user's currently active offers and is
//! the same across all of that user's periods.
//!
//! All upserts for one refresh share a transaction, so a failed run
//! leaves the previous buckets untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::models::user_performance::{PerformanceBucket, UserPerformanceMetrics};
use crate::state_machine::states::OfferStatus;

#[derive(Debug, FromRow)]
pub(crate) struct OfferSample {
    pub managed_by_id: i64,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recompute performance buckets for offers of the given years and
/// upsert them. Returns the number of (user, period) buckets written.
pub async fn refresh_user_performance(
    pool: &PgPool,
    years: &[i32],
    analytics: &AnalyticsConfig,
) -> Result<usize> {
    let samples = fetch_samples(pool, years).await?;
    let workloads = fetch_workloads(pool).await?;
    let buckets = fold_performance(&samples, &workloads, analytics.processing_time_cap_hours);

    let mut tx = pool.begin().await?;
    for bucket in &buckets {
        UserPerformanceMetrics::upsert(&mut *tx, bucket).await?;
    }
    tx.commit().await?;

    info!(
        buckets = buckets.len(),
        offers = samples.len(),
        years = ?years,
        "Refreshed user performance metrics"
    );

    Ok(buckets.len())
}

async fn fetch_samples(pool: &PgPool, years: &[i32]) -> Result<Vec<OfferSample>> {
    let rows = sqlx::query_as::<_, OfferSample>(
        r#"
        SELECT managed_by_id, status, created_at, updated_at
        FROM offers
        WHERE year_stats = ANY($1)
          AND managed_by_id IS NOT NULL
        "#,
    )
    .bind(years)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Active offer counts per managing user, regardless of year
async fn fetch_workloads(pool: &PgPool) -> Result<HashMap<i64, i64>> {
    let rows = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT managed_by_id, COUNT(*)
        FROM offers
        WHERE managed_by_id IS NOT NULL
          AND status IN ('PENDING_REGISTRATION', 'IN_LAVORO', 'CHECKS_IN_PROGRESS')
        GROUP BY managed_by_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

#[derive(Default)]
struct BucketAccumulator {
    offers_handled: i32,
    accepted: i32,
    declined: i32,
    total_hours: f64,
    timed_samples: i32,
}

/// Bucket offer samples by (user, creation month) and derive the stored
/// figures. Output order is deterministic: by user id, then period.
pub(crate) fn fold_performance(
    samples: &[OfferSample],
    workloads: &HashMap<i64, i64>,
    cap_hours: f64,
) -> Vec<PerformanceBucket> {
    let mut accumulators: BTreeMap<(i64, String), BucketAccumulator> = BTreeMap::new();

    for sample in samples {
        let period = sample.created_at.format("%Y-%m").to_string();
        let entry = accumulators
            .entry((sample.managed_by_id, period))
            .or_default();

        entry.offers_handled += 1;
        match sample.status {
            OfferStatus::Accettata => entry.accepted += 1,
            OfferStatus::Declinata => entry.declined += 1,
            _ => {}
        }

        let hours = (sample.updated_at - sample.created_at).num_seconds() as f64 / 3600.0;
        if hours > 0.0 && hours < cap_hours {
            entry.total_hours += hours;
            entry.timed_samples += 1;
        }
    }

    accumulators
        .into_iter()
        .map(|((user_id, period), acc)| {
            let avg_processing_time_hours = if acc.timed_samples > 0 {
                acc.total_hours / acc.timed_samples as f64
            } else {
                0.0
            };
            let success_rate = if acc.offers_handled > 0 {
                acc.accepted as f64 / acc.offers_handled as f64 * 100.0
            } else {
                0.0
            };

            PerformanceBucket {
                user_id,
                period,
                offers_handled: acc.offers_handled,
                accepted_count: acc.accepted,
                declined_count: acc.declined,
                success_rate,
                avg_processing_time_hours,
                current_workload: workloads.get(&user_id).copied().unwrap_or(0) as i32,
            }
        })
        .collect()
}
