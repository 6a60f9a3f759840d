//! # Client Ranking
//!
//! Per-client aggregates for one year, ranked by total accepted value.
//! The underlying query orders clients deterministically and the rank
//! sort is stable, so equal-value clients keep their original relative
//! order across runs.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::reasons::percentage;
use crate::error::Result;

/// One client's aggregate line in the ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRanking {
    pub client_name: String,
    pub requests: i64,
    pub proposed: i64,
    pub accepted: i64,
    pub declined: i64,
    pub not_accepted: i64,
    /// Summed `offer_amount` of accepted offers
    pub total_value: f64,
    /// `accepted / requests * 100`, 0 when the client had no requests
    pub success_rate: f64,
}

#[derive(Debug, FromRow)]
pub(crate) struct RankingRow {
    pub client_name: String,
    pub requests: i64,
    pub proposed: i64,
    pub accepted: i64,
    pub declined: i64,
    pub not_accepted: i64,
    pub total_value: f64,
}

/// Top clients of the year by total accepted value
pub async fn client_ranking(pool: &PgPool, year: i32, limit: usize) -> Result<Vec<ClientRanking>> {
    let rows = sqlx::query_as::<_, RankingRow>(
        r#"
        SELECT c.name AS client_name,
               COUNT(o.id) AS requests,
               COUNT(o.id) FILTER (WHERE o.status <> 'PENDING_REGISTRATION') AS proposed,
               COUNT(o.id) FILTER (WHERE o.status = 'ACCETTATA') AS accepted,
               COUNT(o.id) FILTER (WHERE o.status = 'DECLINATA') AS declined,
               COUNT(o.id) FILTER (WHERE o.status = 'NON_ACCETTATA') AS not_accepted,
               COALESCE(SUM(o.offer_amount) FILTER (WHERE o.status = 'ACCETTATA'), 0)::float8
                   AS total_value
        FROM clients c
        JOIN offers o ON o.client_id = c.id
        WHERE o.year_stats = $1
        GROUP BY c.name
        ORDER BY MIN(c.id)
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rank_clients(rows, limit))
}

/// Sort by total value descending with a stable tie order, then truncate
pub(crate) fn rank_clients(rows: Vec<RankingRow>, limit: usize) -> Vec<ClientRanking> {
    let mut ranked: Vec<ClientRanking> = rows
        .into_iter()
        .map(|row| ClientRanking {
            success_rate: percentage(row.accepted, row.requests),
            client_name: row.client_name,
            requests: row.requests,
            proposed: row.proposed,
            accepted: row.accepted,
            declined: row.declined,
            not_accepted: row.not_accepted,
            total_value: row.total_value,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total_value
            .partial_cmp(&a.total_value)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}
