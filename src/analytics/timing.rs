//! # Workflow Timing
//!
//! Per-department duration statistics over completed workflow steps.
//! Only positive recorded durations feed the averages; a zero duration
//! means the step was closed within the write's clock resolution and
//! carries no timing signal. Every department appears in the output even
//! with no steps at all.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::Result;
use crate::state_machine::states::Department;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTimingStats {
    pub department: Department,
    pub avg_duration_hours: f64,
    pub min_duration_hours: f64,
    pub max_duration_hours: f64,
    pub bottleneck_count: i64,
    pub total_steps: i64,
}

impl WorkflowTimingStats {
    fn zeroed(department: Department) -> Self {
        Self {
            department,
            avg_duration_hours: 0.0,
            min_duration_hours: 0.0,
            max_duration_hours: 0.0,
            bottleneck_count: 0,
            total_steps: 0,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TimingRow {
    pub department: Department,
    pub avg_duration_hours: f64,
    pub min_duration_hours: f64,
    pub max_duration_hours: f64,
    pub bottleneck_count: i64,
    pub total_steps: i64,
}

/// Duration statistics per department for offers of one year, in
/// pipeline order
pub async fn workflow_timing(pool: &PgPool, year: i32) -> Result<Vec<WorkflowTimingStats>> {
    let rows = sqlx::query_as::<_, TimingRow>(
        r#"
        SELECT ws.department,
               COALESCE(AVG(ws.actual_duration_minutes)
                   FILTER (WHERE ws.actual_duration_minutes > 0) / 60.0, 0)::float8
                   AS avg_duration_hours,
               COALESCE(MIN(ws.actual_duration_minutes)
                   FILTER (WHERE ws.actual_duration_minutes > 0) / 60.0, 0)::float8
                   AS min_duration_hours,
               COALESCE(MAX(ws.actual_duration_minutes)
                   FILTER (WHERE ws.actual_duration_minutes > 0) / 60.0, 0)::float8
                   AS max_duration_hours,
               COUNT(*) FILTER (WHERE ws.bottleneck_flag) AS bottleneck_count,
               COUNT(*) AS total_steps
        FROM workflow_steps ws
        JOIN offers o ON o.id = ws.offer_id
        WHERE o.year_stats = $1
        GROUP BY ws.department
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(zero_filled_departments(rows))
}

/// One entry per department in pipeline order, zeroed where the query
/// returned nothing
pub(crate) fn zero_filled_departments(rows: Vec<TimingRow>) -> Vec<WorkflowTimingStats> {
    Department::ALL
        .into_iter()
        .map(|department| {
            rows.iter()
                .find(|row| row.department == department)
                .map(|row| WorkflowTimingStats {
                    department,
                    avg_duration_hours: row.avg_duration_hours,
                    min_duration_hours: row.min_duration_hours,
                    max_duration_hours: row.max_duration_hours,
                    bottleneck_count: row.bottleneck_count,
                    total_steps: row.total_steps,
                })
                .unwrap_or_else(|| WorkflowTimingStats::zeroed(department))
        })
        .collect()
}
