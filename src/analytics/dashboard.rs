//! # Dashboard Stats
//!
//! Headline counters for the landing dashboard plus the month-by-month
//! seasonal trend. Both come from single grouped queries over `offers`
//! and are folded in memory, so a concurrent writer can at worst make
//! the snapshot one write stale, never internally inconsistent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::Result;
use crate::state_machine::states::OfferStatus;

/// Headline counters, optionally scoped to one year
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_offers: i64,
    pub pending_registration: i64,
    /// `IN_LAVORO` plus `CHECKS_IN_PROGRESS`
    pub in_progress: i64,
    pub ready_to_send: i64,
    pub sent: i64,
    pub accepted: i64,
    /// Both declined flavors
    pub declined: i64,
    /// Summed `offer_amount` across every status
    pub total_value: f64,
    /// Offer counts per `year_stats`
    pub by_year: BTreeMap<i32, i64>,
}

/// One month's figures in the seasonal trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalTrend {
    /// `YYYY-MM` label
    pub month: String,
    pub total: i64,
    pub accepted: i64,
    pub declined: i64,
    pub avg_value: f64,
}

/// Status and value counters, over all years or scoped to one
pub async fn dashboard_stats(pool: &PgPool, year: Option<i32>) -> Result<DashboardStats> {
    let rows = sqlx::query_as::<_, (i32, OfferStatus, i64, f64)>(
        r#"
        SELECT year_stats, status,
               COUNT(*) AS offer_count,
               COALESCE(SUM(offer_amount), 0)::float8 AS total_value
        FROM offers
        WHERE $1::int4 IS NULL OR year_stats = $1
        GROUP BY year_stats, status
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(fold_dashboard(rows))
}

/// Monthly aggregates for one year, only months that have offers
pub async fn seasonal_trends(pool: &PgPool, year: i32) -> Result<Vec<SeasonalTrend>> {
    let rows = sqlx::query_as::<_, (i32, i64, i64, i64, f64)>(
        r#"
        SELECT month_stats,
               COUNT(*) AS total,
               COUNT(*) FILTER (WHERE status = 'ACCETTATA') AS accepted,
               COUNT(*) FILTER (WHERE status = 'DECLINATA') AS declined,
               COALESCE(AVG(offer_amount), 0)::float8 AS avg_value
        FROM offers
        WHERE year_stats = $1
        GROUP BY month_stats
        ORDER BY month_stats
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(label_trends(year, rows))
}

pub(crate) fn fold_dashboard(rows: Vec<(i32, OfferStatus, i64, f64)>) -> DashboardStats {
    let mut stats = DashboardStats::default();

    for (year, status, count, value) in rows {
        stats.total_offers += count;
        stats.total_value += value;
        *stats.by_year.entry(year).or_insert(0) += count;

        match status {
            OfferStatus::PendingRegistration => stats.pending_registration += count,
            OfferStatus::InLavoro | OfferStatus::ChecksInProgress => stats.in_progress += count,
            OfferStatus::ReadyToSend => stats.ready_to_send += count,
            OfferStatus::Sent => stats.sent += count,
            OfferStatus::Accettata => stats.accepted += count,
            OfferStatus::Declinata | OfferStatus::NonAccettata => stats.declined += count,
        }
    }

    stats
}

pub(crate) fn label_trends(year: i32, rows: Vec<(i32, i64, i64, i64, f64)>) -> Vec<SeasonalTrend> {
    rows.into_iter()
        .filter(|(month, ..)| (1..=12).contains(month))
        .map(|(month, total, accepted, declined, avg_value)| SeasonalTrend {
            month: format!("{year}-{month:02}"),
            total,
            accepted,
            declined,
            avg_value,
        })
        .collect()
}
