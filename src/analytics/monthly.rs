//! # Monthly Evolution
//!
//! Per-month offer counts and accepted value for one statistics year.
//!
//! ## Overview
//!
//! Buckets the year's offers by their `month_stats` partition key and
//! reports, for each of the 12 months: requests (every offer), proposed
//! (everything past registration), accepted, declined (both decline
//! flavors), and the summed `offer_amount` of accepted offers.
//!
//! The output is always exactly 12 entries, January through December.
//! Months without data carry zeroes; sparse years never shrink the
//! series.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::Result;

pub(crate) const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One month's slice of the evolution series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEvolution {
    /// Month number, 1 through 12
    pub month: u32,
    /// English month name
    pub month_name: String,
    pub year: i32,
    pub requests: i64,
    pub proposed: i64,
    pub accepted: i64,
    pub declined: i64,
    /// Summed `offer_amount` of accepted offers
    pub order_value: f64,
}

#[derive(Debug, FromRow)]
pub(crate) struct MonthRow {
    pub month: i32,
    pub requests: i64,
    pub proposed: i64,
    pub accepted: i64,
    pub declined: i64,
    pub order_value: f64,
}

/// Monthly evolution for one year, always 12 entries
pub async fn monthly_evolution(pool: &PgPool, year: i32) -> Result<Vec<MonthlyEvolution>> {
    let rows = fetch_month_rows(pool, year).await?;
    Ok(zero_filled_months(year, &rows))
}

pub(crate) async fn fetch_month_rows(pool: &PgPool, year: i32) -> Result<Vec<MonthRow>> {
    let rows = sqlx::query_as::<_, MonthRow>(
        r#"
        SELECT month_stats AS month,
               COUNT(*) AS requests,
               COUNT(*) FILTER (WHERE status <> 'PENDING_REGISTRATION') AS proposed,
               COUNT(*) FILTER (WHERE status = 'ACCETTATA') AS accepted,
               COUNT(*) FILTER (WHERE status IN ('DECLINATA', 'NON_ACCETTATA')) AS declined,
               COALESCE(SUM(offer_amount) FILTER (WHERE status = 'ACCETTATA'), 0)::float8
                   AS order_value
        FROM offers
        WHERE year_stats = $1
        GROUP BY month_stats
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overlay grouped rows onto 12 zeroed month buckets. Rows with a month
/// outside 1..=12 are dropped rather than crashing the series.
pub(crate) fn zero_filled_months(year: i32, rows: &[MonthRow]) -> Vec<MonthlyEvolution> {
    let mut months: Vec<MonthlyEvolution> = (1..=12u32)
        .map(|month| MonthlyEvolution {
            month,
            month_name: MONTH_NAMES[(month - 1) as usize].to_string(),
            year,
            requests: 0,
            proposed: 0,
            accepted: 0,
            declined: 0,
            order_value: 0.0,
        })
        .collect();

    for row in rows {
        if !(1..=12).contains(&row.month) {
            continue;
        }
        let bucket = &mut months[(row.month - 1) as usize];
        bucket.requests = row.requests;
        bucket.proposed = row.proposed;
        bucket.accepted = row.accepted;
        bucket.declined = row.declined;
        bucket.order_value = row.order_value;
    }

    months
}
