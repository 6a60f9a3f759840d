//! Metrics Refresh Binary
//!
//! Rebuilds the derived metrics caches: the loyalty columns on
//! `clients` and the per-(user, month) rows in
//! `user_performance_metrics`. Intended to run from cron or by hand
//! after a bulk import.
//!
//! Usage: `refresh-metrics [YEAR ...]`. With no arguments it covers the
//! previous and current calendar year.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Datelike, Utc};
use tracing::info;

use offerflow_core::analytics::MetricsAggregator;
use offerflow_core::config::ConfigManager;
use offerflow_core::database::DatabaseConnection;
use offerflow_core::logging::init_structured_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let years = parse_years()?;

    let manager = ConfigManager::load().context("failed to load configuration")?;
    let db = DatabaseConnection::from_config(&manager.config().database)
        .await
        .context("failed to connect to database")?;

    let aggregator =
        MetricsAggregator::with_config(db.pool().clone(), Arc::new(manager.config().clone()));

    info!(years = ?years, "Refreshing derived metrics");

    let clients = aggregator
        .refresh_client_loyalty(&years)
        .await
        .context("client loyalty refresh failed")?;
    let buckets = aggregator
        .refresh_user_performance(&years)
        .await
        .context("user performance refresh failed")?;

    info!(clients, buckets, "Metrics refresh complete");

    db.close().await;
    Ok(())
}

fn parse_years() -> anyhow::Result<Vec<i32>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        let current = Utc::now().year();
        return Ok(vec![current - 1, current]);
    }

    args.iter()
        .map(|arg| {
            arg.parse::<i32>()
                .with_context(|| format!("invalid year argument: {arg}"))
        })
        .collect()
}
