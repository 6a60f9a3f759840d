//! # Workflow Step Model
//!
//! One department's stage of processing an offer, with start/complete
//! timestamps, derived duration, and a bottleneck flag.
//!
//! ## Database Schema
//!
//! Maps to the `workflow_steps` table:
//! ```sql
//! CREATE TABLE workflow_steps (
//!   id BIGSERIAL PRIMARY KEY,
//!   offer_id BIGINT NOT NULL,
//!   department TEXT NOT NULL,
//!   order_index INTEGER NOT NULL,
//!   status TEXT NOT NULL DEFAULT 'pending',
//!   -- ... other fields
//! );
//! ```
//!
//! Steps for one offer form a total order by `order_index`; equal indices
//! form a single parallel stage. Steps are created in bulk when a workflow
//! is attached to an offer and are updated in place, never reordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};

use crate::error::Result;
use crate::state_machine::states::{Department, StepStatus};

/// One department stage within an offer's workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkflowStep {
    pub id: i64,
    pub offer_id: i64,
    pub department: Department,
    pub order_index: i32,
    pub status: StepStatus,
    pub assigned_to_id: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub actual_duration_minutes: Option<i32>,
    pub bottleneck_flag: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New WorkflowStep for bulk creation when a workflow is attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflowStep {
    pub department: Department,
    pub order_index: i32,
    pub assigned_to_id: Option<i64>,
    pub notes: Option<String>,
}

impl NewWorkflowStep {
    pub fn new(department: Department, order_index: i32) -> Self {
        Self {
            department,
            order_index,
            assigned_to_id: None,
            notes: None,
        }
    }

    pub fn with_assignee(mut self, user_id: i64) -> Self {
        self.assigned_to_id = Some(user_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Field changes applied by the engine when advancing a step.
///
/// Derived fields (`actual_duration_minutes`, `bottleneck_flag`) are
/// computed by the engine before persisting, never by callers.
#[derive(Debug, Clone, Default)]
pub struct StepChanges {
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub actual_duration_minutes: Option<i32>,
    pub bottleneck_flag: Option<bool>,
    pub assigned_to_id: Option<i64>,
    pub notes: Option<String>,
}

const STEP_COLUMNS: &str = r#"
    id, offer_id, department, order_index, status, assigned_to_id,
    started_at, completed_at, actual_duration_minutes, bottleneck_flag,
    notes, created_at, updated_at
"#;

impl WorkflowStep {
    /// Insert a single step row. Takes any executor so bulk creation can
    /// run inside the caller's transaction.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        offer_id: i64,
        new_step: &NewWorkflowStep,
    ) -> Result<WorkflowStep> {
        let sql = format!(
            r#"
            INSERT INTO workflow_steps (
                offer_id, department, order_index, status, assigned_to_id,
                notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {STEP_COLUMNS}
            "#
        );

        let step = sqlx::query_as::<_, WorkflowStep>(&sql)
            .bind(offer_id)
            .bind(new_step.department)
            .bind(new_step.order_index)
            .bind(StepStatus::default())
            .bind(new_step.assigned_to_id)
            .bind(&new_step.notes)
            .fetch_one(executor)
            .await?;

        Ok(step)
    }

    /// Find a workflow step by ID
    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<WorkflowStep>> {
        let sql = format!("SELECT {STEP_COLUMNS} FROM workflow_steps WHERE id = $1");
        let step = sqlx::query_as::<_, WorkflowStep>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(step)
    }

    /// List all steps for an offer in sequence order
    pub async fn list_for_offer<'e>(
        executor: impl PgExecutor<'e>,
        offer_id: i64,
    ) -> Result<Vec<WorkflowStep>> {
        let sql = format!(
            r#"
            SELECT {STEP_COLUMNS}
            FROM workflow_steps
            WHERE offer_id = $1
            ORDER BY order_index, id
            "#
        );

        let steps = sqlx::query_as::<_, WorkflowStep>(&sql)
            .bind(offer_id)
            .fetch_all(executor)
            .await?;

        Ok(steps)
    }

    /// Count the steps attached to an offer
    pub async fn count_for_offer<'e>(executor: impl PgExecutor<'e>, offer_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM workflow_steps WHERE offer_id = $1")
                .bind(offer_id)
                .fetch_one(executor)
                .await?;

        Ok(count)
    }

    /// Apply changes with an optimistic version check on `updated_at`.
    ///
    /// Returns `None` when no row matched, meaning another writer advanced
    /// the step since it was read; callers map that to a concurrency
    /// conflict.
    pub async fn update_with_version_check<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
        changes: &StepChanges,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<Option<WorkflowStep>> {
        let sql = format!(
            r#"
            UPDATE workflow_steps
            SET status = $2,
                started_at = COALESCE($3, started_at),
                completed_at = COALESCE($4, completed_at),
                actual_duration_minutes = COALESCE($5, actual_duration_minutes),
                bottleneck_flag = COALESCE($6, bottleneck_flag),
                assigned_to_id = COALESCE($7, assigned_to_id),
                notes = COALESCE($8, notes),
                updated_at = NOW()
            WHERE id = $1 AND updated_at = $9
            RETURNING {STEP_COLUMNS}
            "#
        );

        let step = sqlx::query_as::<_, WorkflowStep>(&sql)
            .bind(id)
            .bind(changes.status)
            .bind(changes.started_at)
            .bind(changes.completed_at)
            .bind(changes.actual_duration_minutes)
            .bind(changes.bottleneck_flag)
            .bind(changes.assigned_to_id)
            .bind(&changes.notes)
            .bind(expected_updated_at)
            .fetch_optional(executor)
            .await?;

        Ok(step)
    }

    /// Elapsed in-progress minutes as of `now`, for steps not yet completed
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.started_at
            .map(|started| (now - started).num_minutes().max(0))
    }
}
