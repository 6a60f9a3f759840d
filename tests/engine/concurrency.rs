//! Optimistic locking under real writer races.
//!
//! Two engine instances race on the same rows; the version check must
//! admit exactly one winner per row.

use chrono::{Duration, Utc};

use offerflow_core::models::{NewWorkflowStep, WorkflowStep};
use offerflow_core::state_machine::{Department, StepStatus};
use offerflow_core::workflow::{StepUpdate, WorkflowEngine};
use offerflow_core::WorkflowError;

use crate::common;

// Each test seeds its own year; see the note in lifecycle.rs.

/// The loser of a step race either lost the version check or read the
/// winner's terminal state; anything else is a bug.
fn assert_losing_error(err: &WorkflowError) {
    match err {
        WorkflowError::ConcurrencyConflict { .. } => assert!(err.is_retryable()),
        WorkflowError::InvalidTransition { .. } => assert!(!err.is_retryable()),
        other => panic!("unexpected loser error: {other}"),
    }
}

#[tokio::test]
#[ignore]
async fn test_racing_step_writers_admit_one_winner() {
    let pool = common::test_pool().await;
    let client = common::seed_client(&pool, "Ferri Fusioni").await;
    let offer = common::seed_offer_in(&pool, client.id, 2020, 9).await;

    let first = WorkflowEngine::new(pool.clone());
    let second = WorkflowEngine::new(pool.clone());

    let steps = first
        .create_workflow(offer.id, vec![NewWorkflowStep::new(Department::Tecnico, 0)])
        .await
        .unwrap();
    let step_id = steps[0].id;

    // Conflicting terminal writes on the same pending step
    let started = Utc::now() - Duration::hours(2);
    let complete = StepUpdate::new(StepStatus::Completed).with_timestamps(Some(started), None);
    let skip = StepUpdate::new(StepStatus::Skipped);

    let (a, b) = tokio::join!(
        first.advance_step(step_id, complete),
        second.advance_step(step_id, skip),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one writer must win: {a:?} / {b:?}");

    let loser = if a.is_err() {
        a.unwrap_err()
    } else {
        b.unwrap_err()
    };
    assert_losing_error(&loser);

    // The surviving row carries the winner's status, nothing blended
    let row = WorkflowStep::find_by_id(&pool, step_id)
        .await
        .unwrap()
        .unwrap();
    assert!(row.status.is_terminal());
    match row.status {
        StepStatus::Completed => assert!(row.actual_duration_minutes.is_some()),
        StepStatus::Skipped => assert!(row.actual_duration_minutes.is_none()),
        other => panic!("unexpected final status: {other}"),
    }
}

#[tokio::test]
#[ignore]
async fn test_racing_workflow_attach_admits_one_winner() {
    let pool = common::test_pool().await;
    let client = common::seed_client(&pool, "Colombo Resine").await;
    let offer = common::seed_offer_in(&pool, client.id, 2019, 10).await;

    let first = WorkflowEngine::new(pool.clone());
    let second = WorkflowEngine::new(pool.clone());

    let (a, b) = tokio::join!(
        first.create_workflow(
            offer.id,
            vec![
                NewWorkflowStep::new(Department::Commerciale, 0),
                NewWorkflowStep::new(Department::Tecnico, 1),
            ],
        ),
        second.create_workflow(offer.id, vec![NewWorkflowStep::new(Department::Acquisti, 0)]),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one attach must win: {a:?} / {b:?}");

    // The loser's inserts rolled back with its failed transition
    let expected = if a.is_ok() { 2 } else { 1 };
    let count = WorkflowStep::count_for_offer(&pool, offer.id).await.unwrap();
    assert_eq!(count, expected);
}

#[tokio::test]
#[ignore]
async fn test_conflict_retry_with_fresh_state_succeeds() {
    let pool = common::test_pool().await;
    let client = common::seed_client(&pool, "Moro Cuscinetti").await;
    let offer = common::seed_offer_in(&pool, client.id, 2018, 11).await;

    let engine = WorkflowEngine::new(pool.clone());
    let steps = engine
        .create_workflow(offer.id, vec![NewWorkflowStep::new(Department::Acquisti, 0)])
        .await
        .unwrap();
    let step_id = steps[0].id;

    let rival = WorkflowEngine::new(pool.clone());
    let (a, b) = tokio::join!(
        engine.advance_step(step_id, StepUpdate::new(StepStatus::InProgress)),
        rival.advance_step(
            step_id,
            StepUpdate::new(StepStatus::InProgress).with_notes("duplicate click"),
        ),
    );

    // One writer wins; the other either conflicts, or observed the
    // winner's commit and no-opped on the already-reached status.
    for outcome in [a, b] {
        match outcome {
            Ok(result) => assert_eq!(result.step.status, StepStatus::InProgress),
            Err(err) => assert_losing_error(&err),
        }
    }

    // A retry with fresh state goes through
    let retried = engine
        .advance_step(step_id, StepUpdate::new(StepStatus::Completed))
        .await
        .unwrap();
    assert_eq!(retried.step.status, StepStatus::Completed);
    assert!(retried.workflow_completed);
}
