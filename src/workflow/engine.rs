//! # Workflow Engine
//!
//! Atomic offer workflow operations with transaction safety and state
//! machine integration.
//!
//! ## Overview
//!
//! The WorkflowEngine owns every mutation of an offer's processing
//! pipeline: attaching the ordered step sequence, advancing individual
//! steps under the ordering invariant, dispatching the offer, and
//! recording its terminal outcome. Each mutation is a single SQLx
//! transaction guarded by an optimistic version check on `updated_at`,
//! so two handlers racing on the same offer resolve to exactly one
//! winner and one retryable conflict.
//!
//! ## Key behaviors
//!
//! - **Step ordering**: a step starts only when every step at a lower
//!   `order_index` is completed or skipped. Steps sharing an index form
//!   one parallel stage and never block each other.
//! - **Duration and bottleneck flags**: completing a step fixes
//!   `actual_duration_minutes` and flags the step when the duration
//!   exceeds its department's configured threshold.
//! - **Auto-ready**: when the last open step lands in a terminal status
//!   the offer moves to `READY_TO_SEND` in the same transaction and a
//!   change event is published after commit.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use offerflow_core::workflow::{StepUpdate, WorkflowEngine};
//! use offerflow_core::models::NewWorkflowStep;
//! use offerflow_core::state_machine::{Department, StepStatus};
//!
//! # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = WorkflowEngine::new(pool);
//!
//! let steps = vec![
//!     NewWorkflowStep::new(Department::Commerciale, 0),
//!     NewWorkflowStep::new(Department::Tecnico, 1),
//! ];
//! let created = engine.create_workflow(42, steps).await?;
//!
//! let advanced = engine
//!     .advance_step(created[0].id, StepUpdate::new(StepStatus::InProgress))
//!     .await?;
//! println!("step {} is now {}", advanced.step.id, advanced.step.status);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, instrument, warn};

use crate::config::{BottleneckThresholds, OfferflowConfig};
use crate::error::{Result, WorkflowError};
use crate::events::{EventPublisher, OfferUpdateEvent};
use crate::models::{NewWorkflowStep, Offer, StepChanges, WorkflowStep};
use crate::state_machine::actions::status_message;
use crate::state_machine::{
    DeclinedReason, Department, OfferEvent, OfferStateMachine, OfferStatus,
    OfferTransitionPersistence, StepStatus,
};

/// Requested change for a single workflow step.
///
/// Timestamps are optional; when absent the engine stamps the current
/// time. Explicit timestamps exist for producers backfilling historical
/// records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepUpdate {
    pub new_status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub assigned_to_id: Option<i64>,
    pub notes: Option<String>,
}

impl StepUpdate {
    pub fn new(new_status: StepStatus) -> Self {
        Self {
            new_status,
            started_at: None,
            completed_at: None,
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

    pub fn with_timestamps(
        mut self,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.started_at = started_at;
        self.completed_at = completed_at;
        self
    }
}

/// Result of advancing one workflow step
#[derive(Debug, Clone, Serialize)]
pub struct StepAdvanceResult {
    /// The step after the change was applied
    pub step: WorkflowStep,
    /// Offer status after any automatic transition
    pub offer_status: OfferStatus,
    /// True when this change left every step terminal and the offer
    /// moved to `READY_TO_SEND`
    pub workflow_completed: bool,
}

/// Terminal outcome for an offer in status `SENT`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OfferOutcome {
    Accepted {
        order_amount: Option<f64>,
        order_date: Option<NaiveDate>,
    },
    Declined {
        reason: Option<DeclinedReason>,
        notes: Option<String>,
    },
    NotAccepted {
        reason: Option<String>,
    },
}

impl OfferOutcome {
    /// Validate the outcome payload and convert it into a state machine
    /// event. Rejections here happen before any write.
    fn into_event(self) -> Result<OfferEvent> {
        match self {
            OfferOutcome::Accepted {
                order_amount,
                order_date,
            } => {
                if let Some(amount) = order_amount {
                    if amount < 0.0 {
                        return Err(WorkflowError::validation(format!(
                            "order_amount must be non-negative, got {amount}"
                        )));
                    }
                }
                Ok(OfferEvent::Accept {
                    order_amount,
                    order_date,
                })
            }
            OfferOutcome::Declined {
                reason: Some(reason),
                notes,
            } => Ok(OfferEvent::Decline { reason, notes }),
            OfferOutcome::Declined { reason: None, .. } => Err(WorkflowError::validation(
                "a declined outcome requires a reason code",
            )),
            OfferOutcome::NotAccepted { reason } => Ok(OfferEvent::NotAccept(reason)),
        }
    }
}

/// One overdue in-progress step, joined with its offer and client
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BottleneckAlert {
    pub step_id: i64,
    pub offer_id: i64,
    pub offer_number: String,
    pub client_name: String,
    pub department: Department,
    pub order_index: i32,
    pub duration_hours: f64,
    pub assigned_to: Option<String>,
}

/// Atomic workflow operations over the offer store
pub struct WorkflowEngine {
    pool: PgPool,
    config: Arc<OfferflowConfig>,
    event_publisher: EventPublisher,
    persistence: OfferTransitionPersistence,
}

impl WorkflowEngine {
    /// Create an engine with default configuration
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, Arc::new(OfferflowConfig::default()))
    }

    /// Create an engine with custom configuration
    pub fn with_config(pool: PgPool, config: Arc<OfferflowConfig>) -> Self {
        let event_publisher = EventPublisher::new(config.workflow.event_channel_capacity);
        Self::with_publisher(pool, config, event_publisher)
    }

    /// Create an engine sharing an existing event publisher
    pub fn with_publisher(
        pool: PgPool,
        config: Arc<OfferflowConfig>,
        event_publisher: EventPublisher,
    ) -> Self {
        Self {
            pool,
            config,
            event_publisher,
            persistence: OfferTransitionPersistence,
        }
    }

    /// Publisher handing out change-event subscriptions
    pub fn event_publisher(&self) -> &EventPublisher {
        &self.event_publisher
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Attach an ordered step sequence to an offer and move it to
    /// `CHECKS_IN_PROGRESS`.
    ///
    /// The offer must exist and carry no steps yet. The version check on
    /// the offer row also serializes duplicate attach attempts: the
    /// loser's inserts roll back with its failed transition.
    #[instrument(skip(self, steps), fields(offer_id = offer_id, step_count = steps.len()))]
    pub async fn create_workflow(
        &self,
        offer_id: i64,
        steps: Vec<NewWorkflowStep>,
    ) -> Result<Vec<WorkflowStep>> {
        if steps.is_empty() {
            return Err(WorkflowError::validation(
                "a workflow needs at least one step",
            ));
        }

        let offer = Offer::find_by_id(&self.pool, offer_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Offer", offer_id))?;

        let existing = WorkflowStep::count_for_offer(&self.pool, offer_id).await?;
        if existing > 0 {
            return Err(WorkflowError::validation(format!(
                "offer {offer_id} already has {existing} workflow steps"
            )));
        }

        let target =
            OfferStateMachine::determine_target_state(offer.status, &OfferEvent::BeginChecks)?;

        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(steps.len());
        for step in &steps {
            created.push(WorkflowStep::insert(&mut *tx, offer_id, step).await?);
        }

        let updated = self
            .persistence
            .persist_transition(&mut *tx, &offer, target, &OfferEvent::BeginChecks)
            .await?;

        tx.commit().await?;

        self.publish_offer_update(&updated);

        info!(
            offer_id,
            offer_number = %updated.offer_number,
            step_count = created.len(),
            "Workflow attached to offer"
        );

        Ok(created)
    }

    /// Advance one workflow step, enforcing the ordering invariant and
    /// computing derived fields.
    ///
    /// Runs as a single transaction. A concurrent writer on the same
    /// step or offer surfaces as `ConcurrencyConflict`; callers may
    /// retry once with fresh state.
    #[instrument(skip(self, update), fields(step_id = step_id, new_status = %update.new_status))]
    pub async fn advance_step(
        &self,
        step_id: i64,
        update: StepUpdate,
    ) -> Result<StepAdvanceResult> {
        let mut tx = self.pool.begin().await?;

        let step = WorkflowStep::find_by_id(&mut *tx, step_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("WorkflowStep", step_id))?;

        let offer = Offer::find_by_id(&mut *tx, step.offer_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Offer", step.offer_id))?;

        if step.status == update.new_status {
            debug!(step_id, status = %step.status, "Step already in requested status");
            return Ok(StepAdvanceResult {
                step,
                offer_status: offer.status,
                workflow_completed: false,
            });
        }

        let siblings = WorkflowStep::list_for_offer(&mut *tx, step.offer_id).await?;

        let changes = build_step_changes(
            &step,
            &siblings,
            &update,
            &self.config.workflow.thresholds,
            Utc::now(),
        )?;

        let updated_step =
            WorkflowStep::update_with_version_check(&mut *tx, step.id, &changes, step.updated_at)
                .await?
                .ok_or_else(|| WorkflowError::concurrency_conflict("WorkflowStep", step.id))?;

        // Auto-transition when this change leaves no open step
        let all_terminal = updated_step.status.is_terminal()
            && siblings
                .iter()
                .filter(|s| s.id != step.id)
                .all(|s| s.status.is_terminal());

        let mut offer_status = offer.status;
        let mut ready_offer = None;

        if all_terminal {
            if offer.status.is_in_progress() {
                let target = OfferStateMachine::determine_target_state(
                    offer.status,
                    &OfferEvent::MarkReady,
                )?;
                let updated_offer = self
                    .persistence
                    .persist_transition(&mut *tx, &offer, target, &OfferEvent::MarkReady)
                    .await?;
                offer_status = updated_offer.status;
                ready_offer = Some(updated_offer);
            } else {
                warn!(
                    offer_id = offer.id,
                    status = %offer.status,
                    "All steps terminal but offer is not in a working status; skipping auto-transition"
                );
            }
        }

        tx.commit().await?;

        if let Some(offer) = &ready_offer {
            self.publish_offer_update(offer);
            info!(
                offer_id = offer.id,
                offer_number = %offer.offer_number,
                "Last step closed, offer is ready to send"
            );
        }

        debug!(step_id, status = %updated_step.status, "Step advanced");

        Ok(StepAdvanceResult {
            step: updated_step,
            offer_status,
            workflow_completed: ready_offer.is_some(),
        })
    }

    /// Move a pending offer into manual processing (`IN_LAVORO`)
    #[instrument(skip(self), fields(offer_id = offer_id))]
    pub async fn start_work(&self, offer_id: i64) -> Result<Offer> {
        self.transition_offer(offer_id, OfferEvent::StartWork).await
    }

    /// Manually mark an offer ready to send. Fails unless every attached
    /// step is terminal.
    #[instrument(skip(self), fields(offer_id = offer_id))]
    pub async fn mark_ready(&self, offer_id: i64) -> Result<Offer> {
        self.transition_offer(offer_id, OfferEvent::MarkReady).await
    }

    /// Dispatch a ready offer to the client, stamping `offer_sent_date`
    #[instrument(skip(self), fields(offer_id = offer_id))]
    pub async fn send_offer(&self, offer_id: i64, sent_date: Option<NaiveDate>) -> Result<Offer> {
        self.transition_offer(offer_id, OfferEvent::Send(sent_date))
            .await
    }

    /// Record the terminal outcome for a sent offer.
    ///
    /// Valid only from `SENT`; any other current status fails with
    /// `InvalidTransition`. A declined outcome must carry a reason code.
    #[instrument(skip(self, outcome), fields(offer_id = offer_id))]
    pub async fn record_outcome(&self, offer_id: i64, outcome: OfferOutcome) -> Result<Offer> {
        let event = outcome.into_event()?;
        let offer = self.transition_offer(offer_id, event).await?;

        info!(
            offer_id,
            offer_number = %offer.offer_number,
            status = %offer.status,
            "Offer outcome recorded"
        );

        Ok(offer)
    }

    /// Scan in-progress steps for bottlenecks.
    ///
    /// First refreshes `bottleneck_flag` on steps whose elapsed time
    /// exceeds their department threshold, then returns flagged steps
    /// over the caller's threshold, longest-running first.
    #[instrument(skip(self))]
    pub async fn list_bottlenecks(
        &self,
        threshold_hours: Option<f64>,
    ) -> Result<Vec<BottleneckAlert>> {
        let threshold =
            threshold_hours.unwrap_or(self.config.workflow.default_alert_threshold_hours);
        if threshold < 0.0 {
            return Err(WorkflowError::validation(format!(
                "threshold_hours must be non-negative, got {threshold}"
            )));
        }

        let flagged = self.refresh_bottleneck_flags().await?;
        if flagged > 0 {
            debug!(flagged, "Flagged newly overdue steps");
        }

        let alerts = sqlx::query_as::<_, BottleneckAlert>(
            r#"
            SELECT ws.id AS step_id,
                   ws.offer_id,
                   o.offer_number,
                   c.name AS client_name,
                   ws.department,
                   ws.order_index,
                   (EXTRACT(EPOCH FROM (NOW() - ws.started_at)) / 3600.0)::float8 AS duration_hours,
                   u.username AS assigned_to
            FROM workflow_steps ws
            JOIN offers o ON o.id = ws.offer_id
            JOIN clients c ON c.id = o.client_id
            LEFT JOIN users u ON u.id = ws.assigned_to_id
            WHERE ws.status = 'in_progress'
              AND ws.bottleneck_flag = TRUE
              AND ws.started_at IS NOT NULL
              AND EXTRACT(EPOCH FROM (NOW() - ws.started_at)) / 3600.0 > $1
            ORDER BY duration_hours DESC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    /// Flag in-progress steps whose elapsed time exceeds their
    /// department threshold. Returns the number of rows flagged.
    async fn refresh_bottleneck_flags(&self) -> Result<u64> {
        let thresholds = &self.config.workflow.thresholds;

        let result = sqlx::query(
            r#"
            UPDATE workflow_steps
            SET bottleneck_flag = TRUE, updated_at = NOW()
            WHERE status = 'in_progress'
              AND bottleneck_flag = FALSE
              AND started_at IS NOT NULL
              AND EXTRACT(EPOCH FROM (NOW() - started_at)) / 3600.0 >
                  CASE department
                      WHEN 'commerciale' THEN $1
                      WHEN 'fattibilita' THEN $2
                      WHEN 'tecnico' THEN $3
                      WHEN 'acquisti' THEN $4
                      WHEN 'pianificazione' THEN $5
                      ELSE $6
                  END
            "#,
        )
        .bind(thresholds.commerciale_hours)
        .bind(thresholds.fattibilita_hours)
        .bind(thresholds.tecnico_hours)
        .bind(thresholds.acquisti_hours)
        .bind(thresholds.pianificazione_hours)
        .bind(self.config.workflow.default_alert_threshold_hours)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Load an offer and drive one state machine transition
    async fn transition_offer(&self, offer_id: i64, event: OfferEvent) -> Result<Offer> {
        let offer = Offer::find_by_id(&self.pool, offer_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Offer", offer_id))?;

        let mut machine =
            OfferStateMachine::new(offer, self.pool.clone(), self.event_publisher.clone());
        machine.transition(event).await?;

        Ok(machine.into_offer())
    }

    fn publish_offer_update(&self, offer: &Offer) {
        self.event_publisher.publish(OfferUpdateEvent::new(
            offer.id,
            offer.offer_number.clone(),
            offer.status,
            status_message(offer.status),
        ));
    }
}

/// Validate a requested step change against the current step and its
/// siblings, producing the column changes to apply.
fn build_step_changes(
    step: &WorkflowStep,
    siblings: &[WorkflowStep],
    update: &StepUpdate,
    thresholds: &BottleneckThresholds,
    now: DateTime<Utc>,
) -> Result<StepChanges> {
    if step.status.is_terminal() {
        return Err(WorkflowError::invalid_transition(
            step.status,
            update.new_status,
        ));
    }

    let mut changes = StepChanges {
        status: update.new_status,
        assigned_to_id: update.assigned_to_id,
        notes: update.notes.clone(),
        ..StepChanges::default()
    };

    match update.new_status {
        StepStatus::Pending => {
            return Err(WorkflowError::invalid_transition(
                step.status,
                update.new_status,
            ));
        }

        StepStatus::InProgress => {
            check_ordering(step, siblings)?;
            changes.started_at = Some(update.started_at.unwrap_or(now));
        }

        StepStatus::Completed => {
            let started_at = match (step.started_at, update.started_at) {
                (_, Some(explicit)) => explicit,
                (Some(existing), None) => existing,
                (None, None) => {
                    return Err(WorkflowError::validation(format!(
                        "step {} cannot complete before it is started; provide started_at",
                        step.id
                    )));
                }
            };
            if step.status == StepStatus::Pending {
                check_ordering(step, siblings)?;
            }

            let completed_at = update.completed_at.unwrap_or(now);
            // Skewed clocks across writers clamp to a zero duration
            let duration_minutes = (completed_at - started_at).num_minutes().max(0);
            let threshold_minutes = thresholds.minutes_for_department(step.department);

            changes.started_at = Some(started_at);
            changes.completed_at = Some(completed_at);
            changes.actual_duration_minutes = Some(duration_minutes as i32);
            changes.bottleneck_flag = Some(duration_minutes > threshold_minutes);
        }

        // Skipping needs no ordering check; it is how a stuck stage is
        // released
        StepStatus::Skipped => {}
    }

    Ok(changes)
}

/// Every step at a lower `order_index` must be completed or skipped.
/// Steps sharing this step's index form one parallel stage and do not
/// block it.
fn check_ordering(step: &WorkflowStep, siblings: &[WorkflowStep]) -> Result<()> {
    let blocking = siblings.iter().find(|s| {
        s.id != step.id && s.order_index < step.order_index && !s.status.satisfies_ordering()
    });

    if let Some(predecessor) = blocking {
        return Err(WorkflowError::validation(format!(
            "step {} cannot start: {} step at order {} is still {}",
            step.id, predecessor.department, predecessor.order_index, predecessor.status
        )));
    }

    Ok(())
}
