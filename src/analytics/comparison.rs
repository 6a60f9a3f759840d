//! # Multi-Year Comparison
//!
//! The monthly evolution metrics pivoted across several years, one
//! column per year, for side-by-side charts. Every requested (year,
//! month) cell exists; missing data is 0, never null.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::monthly::{fetch_month_rows, MonthRow, MONTH_NAMES};
use crate::error::Result;

/// One month's values for a single metric, keyed by year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow<T> {
    /// English month name
    pub month: String,
    pub by_year: BTreeMap<i32, T>,
}

/// The five evolution metrics pivoted by year, 12 rows each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearComparison {
    pub requests: Vec<MetricRow<i64>>,
    pub proposed: Vec<MetricRow<i64>>,
    pub accepted: Vec<MetricRow<i64>>,
    pub declined: Vec<MetricRow<i64>>,
    pub order_value: Vec<MetricRow<f64>>,
}

/// Compare the monthly metrics across the requested years
pub async fn comparison(pool: &PgPool, years: &[i32]) -> Result<YearComparison> {
    let fetches = years.iter().map(|&year| async move {
        let rows = fetch_month_rows(pool, year).await?;
        Ok::<_, crate::error::WorkflowError>((year, rows))
    });

    let per_year = try_join_all(fetches).await?;

    Ok(pivot_years(years, &per_year))
}

fn zeroed_rows<T: Copy>(years: &[i32], zero: T) -> Vec<MetricRow<T>> {
    MONTH_NAMES
        .iter()
        .map(|name| MetricRow {
            month: name.to_string(),
            by_year: years.iter().map(|&y| (y, zero)).collect(),
        })
        .collect()
}

pub(crate) fn pivot_years(years: &[i32], per_year: &[(i32, Vec<MonthRow>)]) -> YearComparison {
    let mut result = YearComparison {
        requests: zeroed_rows(years, 0i64),
        proposed: zeroed_rows(years, 0i64),
        accepted: zeroed_rows(years, 0i64),
        declined: zeroed_rows(years, 0i64),
        order_value: zeroed_rows(years, 0.0f64),
    };

    for (year, rows) in per_year {
        for row in rows {
            if !(1..=12).contains(&row.month) {
                continue;
            }
            let idx = (row.month - 1) as usize;
            result.requests[idx].by_year.insert(*year, row.requests);
            result.proposed[idx].by_year.insert(*year, row.proposed);
            result.accepted[idx].by_year.insert(*year, row.accepted);
            result.declined[idx].by_year.insert(*year, row.declined);
            result.order_value[idx]
                .by_year
                .insert(*year, row.order_value);
        }
    }

    result
}
