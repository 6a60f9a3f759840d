//! # Workflow Step Scopes
//!
//! Query scopes for workflow steps: per-offer sequences, department and
//! status filters, and bottleneck lookups.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::common::ScopeBuilder;
use crate::error::Result;
use crate::models::WorkflowStep;
use crate::state_machine::{Department, StepStatus};

/// Query builder for WorkflowStep scopes
pub struct WorkflowStepScope {
    query: QueryBuilder<'static, Postgres>,
    has_offers_join: bool,
    has_conditions: bool,
}

impl WorkflowStep {
    /// Start building a scoped query
    pub fn scope() -> WorkflowStepScope {
        let query = QueryBuilder::new("SELECT workflow_steps.* FROM workflow_steps");
        WorkflowStepScope {
            query,
            has_offers_join: false,
            has_conditions: false,
        }
    }
}

impl WorkflowStepScope {
    fn add_condition(&mut self, condition: &str) {
        if self.has_conditions {
            self.query.push(" AND ");
        } else {
            self.query.push(" WHERE ");
            self.has_conditions = true;
        }
        self.query.push(condition);
    }

    /// Ensure the offers join exists.
    ///
    /// JOINs must be added before WHERE conditions; call offer-based
    /// scopes first in a chain.
    fn ensure_offers_join(&mut self) {
        if !self.has_offers_join {
            if !self.has_conditions {
                self.query
                    .push(" INNER JOIN offers ON offers.id = workflow_steps.offer_id");
                self.has_offers_join = true;
            } else {
                tracing::warn!(
                    "Cannot add offers JOIN after WHERE conditions; call offer scopes first"
                );
            }
        }
    }

    /// Scope: steps belonging to one offer
    pub fn for_offer(mut self, offer_id: i64) -> Self {
        self.add_condition("workflow_steps.offer_id = ");
        self.query.push_bind(offer_id);
        self
    }

    /// Scope: steps handled by one department
    pub fn by_department(mut self, department: Department) -> Self {
        self.add_condition("workflow_steps.department = ");
        self.query.push_bind(department);
        self
    }

    /// Scope: steps in a specific status
    pub fn by_status(mut self, status: StepStatus) -> Self {
        self.add_condition("workflow_steps.status = ");
        self.query.push_bind(status);
        self
    }

    /// Scope: steps currently being worked
    pub fn in_progress(mut self) -> Self {
        self.add_condition("workflow_steps.status = 'in_progress'");
        self
    }

    /// Scope: completed steps
    pub fn completed(mut self) -> Self {
        self.add_condition("workflow_steps.status = 'completed'");
        self
    }

    /// Scope: steps flagged as bottlenecks
    pub fn bottlenecked(mut self) -> Self {
        self.add_condition("workflow_steps.bottleneck_flag = TRUE");
        self
    }

    /// Scope: steps assigned to one user
    pub fn assigned_to(mut self, user_id: i64) -> Self {
        self.add_condition("workflow_steps.assigned_to_id = ");
        self.query.push_bind(user_id);
        self
    }

    /// Scope: steps of offers in a statistics year. Adds the offers JOIN;
    /// call before condition scopes.
    pub fn for_offer_year(mut self, year: i32) -> Self {
        self.ensure_offers_join();
        if self.has_offers_join {
            self.add_condition("offers.year_stats = ");
            self.query.push_bind(year);
        }
        self
    }

    /// Scope: steps started before a specific time
    pub fn started_before(mut self, before: DateTime<Utc>) -> Self {
        self.add_condition("workflow_steps.started_at < ");
        self.query.push_bind(before);
        self
    }

    /// Add ordering by workflow sequence
    pub fn order_by_sequence(mut self) -> Self {
        self.query
            .push(" ORDER BY workflow_steps.order_index, workflow_steps.id");
        self
    }

    /// Add limit
    pub fn limit(mut self, limit: i64) -> Self {
        self.query.push(" LIMIT ");
        self.query.push_bind(limit);
        self
    }
}

impl ScopeBuilder<WorkflowStep> for WorkflowStepScope {
    async fn all(mut self, pool: &PgPool) -> Result<Vec<WorkflowStep>> {
        let query = self.query.build_query_as::<WorkflowStep>();
        Ok(query.fetch_all(pool).await?)
    }

    async fn first(mut self, pool: &PgPool) -> Result<Option<WorkflowStep>> {
        self.query.push(" LIMIT 1");
        let query = self.query.build_query_as::<WorkflowStep>();
        Ok(query.fetch_optional(pool).await?)
    }

    // QueryBuilder cannot be reopened to wrap the statement in a COUNT,
    // so this fetches the scoped rows and counts them.
    async fn count(mut self, pool: &PgPool) -> Result<i64> {
        let rows = self.query.build().fetch_all(pool).await?;
        Ok(rows.len() as i64)
    }

    async fn exists(mut self, pool: &PgPool) -> Result<bool> {
        self.query.push(" LIMIT 1");
        let result = self.query.build().fetch_optional(pool).await?;
        Ok(result.is_some())
    }
}
