//! Accepted value distribution grouped by client sector.
//!
//! Clients without a sector land in the `"Altro"` bucket so the
//! breakdown always accounts for every accepted offer.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::Result;

/// Bucket label for clients with no recorded sector
pub const UNKNOWN_SECTOR: &str = "Altro";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorDistribution {
    pub sector: String,
    pub accepted_count: i64,
    /// Summed `offer_amount` of accepted offers in this sector
    pub total_value: f64,
}

/// Accepted offers of the year grouped by client sector, largest value first
pub async fn sector_distribution(pool: &PgPool, year: i32) -> Result<Vec<SectorDistribution>> {
    let rows = sqlx::query_as::<_, (Option<String>, i64, f64)>(
        r#"
        SELECT c.sector,
               COUNT(o.id) AS accepted_count,
               COALESCE(SUM(o.offer_amount), 0)::float8 AS total_value
        FROM clients c
        JOIN offers o ON o.client_id = c.id
        WHERE o.year_stats = $1
          AND o.status = 'ACCETTATA'
        GROUP BY c.sector
        ORDER BY COALESCE(SUM(o.offer_amount), 0) DESC, c.sector
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(label_sectors(rows))
}

pub(crate) fn label_sectors(rows: Vec<(Option<String>, i64, f64)>) -> Vec<SectorDistribution> {
    rows.into_iter()
        .map(|(sector, accepted_count, total_value)| SectorDistribution {
            sector: sector.unwrap_or_else(|| UNKNOWN_SECTOR.to_string()),
            accepted_count,
            total_value,
        })
        .collect()
}
