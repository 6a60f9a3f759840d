//! # Metrics Aggregator
//!
//! Read-side aggregations over the offer pipeline. Each aggregation is a
//! thin grouped query plus a pure in-memory fold, computed from scratch
//! on every call; nothing here holds derived state between calls, so
//! repeating a call on unchanged data returns identical results.
//!
//! The two `refresh_*` operations are the exception: they rebuild the
//! loyalty and performance caches and write them back, each inside a
//! single transaction so a failed refresh never commits a partial batch.
//!
//! All methods borrow plain futures with no background work. A caller
//! that needs a deadline can wrap any of them in `tokio::time::timeout`
//! and drop the future; the query is abandoned at the next await point
//! and the database sees at most an orphaned read.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use offerflow_core::analytics::MetricsAggregator;
//!
//! # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let aggregator = MetricsAggregator::new(pool);
//!
//! let evolution = aggregator.monthly_evolution(2025).await?;
//! assert_eq!(evolution.len(), 12);
//!
//! let ranking = aggregator.client_ranking(2025, None).await?;
//! let comparison = aggregator.comparison(&[2024, 2025]).await?;
//! # Ok(())
//! # }
//! ```

pub mod comparison;
pub mod dashboard;
pub mod item_mix;
pub mod loyalty;
pub mod monthly;
pub mod performance;
pub mod ranking;
pub mod reasons;
pub mod sectors;
pub mod timing;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::OfferflowConfig;
use crate::error::Result;

pub use comparison::{MetricRow, YearComparison};
pub use dashboard::{DashboardStats, SeasonalTrend};
pub use item_mix::{ItemMixBucket, NewVsReorderSplit};
pub use loyalty::{loyalty_score, ClientLoyalty};
pub use monthly::MonthlyEvolution;
pub use ranking::ClientRanking;
pub use reasons::{ReasonStat, ReasonsAnalysis};
pub use sectors::{SectorDistribution, UNKNOWN_SECTOR};
pub use timing::WorkflowTimingStats;

/// Facade over the aggregation queries, carrying the pool and the
/// analytics configuration
#[derive(Clone)]
pub struct MetricsAggregator {
    pool: PgPool,
    config: Arc<OfferflowConfig>,
}

impl MetricsAggregator {
    /// Create an aggregator with default configuration
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, Arc::new(OfferflowConfig::default()))
    }

    /// Create an aggregator with explicit configuration
    pub fn with_config(pool: PgPool, config: Arc<OfferflowConfig>) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Twelve zero-filled monthly entries for one year
    pub async fn monthly_evolution(&self, year: i32) -> Result<Vec<MonthlyEvolution>> {
        monthly::monthly_evolution(&self.pool, year).await
    }

    /// Month-by-month pivot across several years, zero-filled
    pub async fn comparison(&self, years: &[i32]) -> Result<YearComparison> {
        comparison::comparison(&self.pool, years).await
    }

    /// Declined and not-accepted reason breakdowns with shares
    pub async fn reasons_analysis(&self, year: i32) -> Result<ReasonsAnalysis> {
        reasons::reasons_analysis(&self.pool, year).await
    }

    /// Top clients by accepted value. `limit` falls back to the
    /// configured ranking limit.
    pub async fn client_ranking(
        &self,
        year: i32,
        limit: Option<usize>,
    ) -> Result<Vec<ClientRanking>> {
        let limit = limit.unwrap_or(self.config.analytics.ranking_limit as usize);
        ranking::client_ranking(&self.pool, year, limit).await
    }

    /// Accepted value grouped by client sector
    pub async fn sector_distribution(&self, year: i32) -> Result<Vec<SectorDistribution>> {
        sectors::sector_distribution(&self.pool, year).await
    }

    /// First-time item vs reorder split
    pub async fn new_vs_reorder(&self, year: i32) -> Result<NewVsReorderSplit> {
        item_mix::new_vs_reorder(&self.pool, year).await
    }

    /// Per-client loyalty profiles for one year, highest score first
    pub async fn client_loyalty(&self, year: i32) -> Result<Vec<ClientLoyalty>> {
        loyalty::client_loyalty(&self.pool, year, &self.config.analytics).await
    }

    /// Per-department duration statistics for one year
    pub async fn workflow_timing(&self, year: i32) -> Result<Vec<WorkflowTimingStats>> {
        timing::workflow_timing(&self.pool, year).await
    }

    /// Headline counters, over all years or scoped to one
    pub async fn dashboard_stats(&self, year: Option<i32>) -> Result<DashboardStats> {
        dashboard::dashboard_stats(&self.pool, year).await
    }

    /// Monthly aggregates for the months of one year that have offers
    pub async fn seasonal_trends(&self, year: i32) -> Result<Vec<SeasonalTrend>> {
        dashboard::seasonal_trends(&self.pool, year).await
    }

    /// Rebuild the loyalty cache columns on `clients` from offer history
    pub async fn refresh_client_loyalty(&self, years: &[i32]) -> Result<usize> {
        loyalty::refresh_client_loyalty(&self.pool, years, &self.config.analytics).await
    }

    /// Rebuild the per-(user, month) performance buckets
    pub async fn refresh_user_performance(&self, years: &[i32]) -> Result<usize> {
        performance::refresh_user_performance(&self.pool, years, &self.config.analytics).await
    }
}
