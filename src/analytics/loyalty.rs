//! # Client Loyalty
//!
//! Loyalty is the share of a client's offers that are reorders, expressed
//! as a percentage. High-volume clients earn a bonus multiplier on top,
//! capped at 100. The score is always recomputed from offer history in
//! full; `refresh_client_loyalty` overwrites the cached columns on
//! `clients` in a single transaction so a failed run never leaves a
//! half-updated cache behind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::models::client::Client;

/// One client's loyalty profile for a year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientLoyalty {
    pub client_id: i64,
    pub client_name: String,
    pub total_offers: i64,
    pub new_items_count: i64,
    pub reorder_count: i64,
    /// `reorder_count / total_offers * 100`
    pub reorder_percentage: f64,
    /// Reorder percentage with the volume bonus applied
    pub loyalty_score: f64,
    pub last_order_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
pub(crate) struct LoyaltyRow {
    pub client_id: i64,
    pub client_name: String,
    pub total_offers: i64,
    pub new_items_count: i64,
    pub reorder_count: i64,
    pub last_order_date: Option<NaiveDate>,
}

/// Reorder percentage with the volume bonus for clients above the
/// threshold, capped at 100. Clients with no offers score 0.
pub fn loyalty_score(
    reorder_count: i64,
    total_offers: i64,
    volume_threshold: i64,
    volume_bonus: f64,
) -> f64 {
    if total_offers == 0 {
        return 0.0;
    }

    let raw = reorder_count as f64 / total_offers as f64 * 100.0;
    if total_offers > volume_threshold {
        (raw * volume_bonus).min(100.0)
    } else {
        raw
    }
}

/// Loyalty profiles for every client with offers in the year, highest
/// score first
pub async fn client_loyalty(
    pool: &PgPool,
    year: i32,
    analytics: &AnalyticsConfig,
) -> Result<Vec<ClientLoyalty>> {
    let rows = fetch_loyalty_rows(pool, &[year]).await?;
    Ok(score_clients(rows, analytics))
}

/// Recompute loyalty over the given years and overwrite the cached
/// columns on `clients`. All cache writes land in one transaction, so a
/// failure mid-run changes nothing. Returns the number of clients
/// updated.
pub async fn refresh_client_loyalty(
    pool: &PgPool,
    years: &[i32],
    analytics: &AnalyticsConfig,
) -> Result<usize> {
    let rows = fetch_loyalty_rows(pool, years).await?;
    let scored = score_clients(rows, analytics);

    let mut tx = pool.begin().await?;
    for entry in &scored {
        Client::write_loyalty_cache(
            &mut *tx,
            entry.client_id,
            entry.new_items_count as i32,
            entry.reorder_count as i32,
            entry.loyalty_score,
        )
        .await?;
    }
    tx.commit().await?;

    info!(
        clients = scored.len(),
        years = ?years,
        "Refreshed client loyalty cache"
    );

    Ok(scored.len())
}

async fn fetch_loyalty_rows(pool: &PgPool, years: &[i32]) -> Result<Vec<LoyaltyRow>> {
    let rows = sqlx::query_as::<_, LoyaltyRow>(
        r#"
        SELECT c.id AS client_id,
               c.name AS client_name,
               COUNT(o.id) AS total_offers,
               COUNT(o.id) FILTER (WHERE o.is_new_item) AS new_items_count,
               COUNT(o.id) FILTER (WHERE NOT o.is_new_item) AS reorder_count,
               MAX(o.order_date) AS last_order_date
        FROM clients c
        JOIN offers o ON o.client_id = c.id
        WHERE o.year_stats = ANY($1)
        GROUP BY c.id, c.name
        ORDER BY c.id
        "#,
    )
    .bind(years)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Score each client and sort by loyalty descending with a stable tie
/// order. The inner join already dropped clients without offers.
pub(crate) fn score_clients(rows: Vec<LoyaltyRow>, analytics: &AnalyticsConfig) -> Vec<ClientLoyalty> {
    let mut scored: Vec<ClientLoyalty> = rows
        .into_iter()
        .map(|row| {
            let reorder_percentage = if row.total_offers == 0 {
                0.0
            } else {
                row.reorder_count as f64 / row.total_offers as f64 * 100.0
            };
            let score = loyalty_score(
                row.reorder_count,
                row.total_offers,
                analytics.loyalty_volume_threshold,
                analytics.loyalty_volume_bonus,
            );

            ClientLoyalty {
                client_id: row.client_id,
                client_name: row.client_name,
                total_offers: row.total_offers,
                new_items_count: row.new_items_count,
                reorder_count: row.reorder_count,
                reorder_percentage,
                loyalty_score: score,
                last_order_date: row.last_order_date,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.loyalty_score
            .partial_cmp(&a.loyalty_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}
