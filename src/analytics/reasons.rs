//! # Decline Reason Analysis
//!
//! Groups declined and not-accepted offers by reason. Declined reasons
//! come from the closed reason-code set, not-accepted reasons are free
//! text. Group percentages divide by the full group total, including
//! offers with no recorded reason, and a zero total yields 0 instead of
//! a division fault.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::Result;

/// One reason's share within its group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonStat {
    pub reason: String,
    pub count: i64,
    pub percentage: f64,
}

/// Reason breakdowns for both decline flavors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReasonsAnalysis {
    pub declined_reasons: Vec<ReasonStat>,
    pub not_accepted_reasons: Vec<ReasonStat>,
}

/// Analyze decline reasons for one year
pub async fn reasons_analysis(pool: &PgPool, year: i32) -> Result<ReasonsAnalysis> {
    let declined = sqlx::query_as::<_, (Option<String>, i64)>(
        r#"
        SELECT declined_reason, COUNT(*)
        FROM offers
        WHERE year_stats = $1 AND status = 'DECLINATA'
        GROUP BY declined_reason
        ORDER BY COUNT(*) DESC, declined_reason
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    let not_accepted = sqlx::query_as::<_, (Option<String>, i64)>(
        r#"
        SELECT not_accepted_reason, COUNT(*)
        FROM offers
        WHERE year_stats = $1 AND status = 'NON_ACCETTATA'
        GROUP BY not_accepted_reason
        ORDER BY COUNT(*) DESC, not_accepted_reason
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(ReasonsAnalysis {
        declined_reasons: reason_stats(&declined),
        not_accepted_reasons: reason_stats(&not_accepted),
    })
}

/// Share of a group, defined as 0 when the group is empty
pub(crate) fn percentage(count: i64, total: i64) -> f64 {
    if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Fold grouped (reason, count) rows into stats. Rows with no reason
/// count toward the group total but produce no output entry.
pub(crate) fn reason_stats(rows: &[(Option<String>, i64)]) -> Vec<ReasonStat> {
    let total: i64 = rows.iter().map(|(_, count)| count).sum();

    rows.iter()
        .filter_map(|(reason, count)| {
            reason.as_ref().map(|reason| ReasonStat {
                reason: reason.clone(),
                count: *count,
                percentage: percentage(*count, total),
            })
        })
        .collect()
}
