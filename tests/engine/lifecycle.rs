//! End-to-end lifecycle coverage for the workflow engine.
//!
//! Drives real offers through the full status graph against PostgreSQL.

use chrono::{Duration, Utc};

use offerflow_core::models::{NewWorkflowStep, Offer};
use offerflow_core::state_machine::{DeclinedReason, Department, OfferStatus, StepStatus};
use offerflow_core::workflow::{OfferOutcome, StepUpdate, WorkflowEngine};
use offerflow_core::WorkflowError;

use crate::common;

// Offer numbers are a year-scoped sequence, so each test seeds its own
// year to keep concurrent suites from racing on the next number.

/// Shortcut: attach one step, close it, and dispatch the offer
async fn drive_to_sent(engine: &WorkflowEngine, offer_id: i64) {
    let steps = engine
        .create_workflow(offer_id, vec![NewWorkflowStep::new(Department::Commerciale, 0)])
        .await
        .expect("attach workflow");

    let started = Utc::now() - Duration::hours(1);
    engine
        .advance_step(
            steps[0].id,
            StepUpdate::new(StepStatus::Completed).with_timestamps(Some(started), None),
        )
        .await
        .expect("close step");

    engine.send_offer(offer_id, None).await.expect("send offer");
}

#[tokio::test]
#[ignore]
async fn test_full_lifecycle_to_accepted() {
    let pool = common::test_pool().await;
    let engine = WorkflowEngine::new(pool.clone());
    let mut events = engine.event_publisher().subscribe();

    let client = common::seed_client(&pool, "Rossi Meccanica").await;
    let offer = common::seed_offer_in(&pool, client.id, 2025, 3).await;
    assert_eq!(offer.status, OfferStatus::PendingRegistration);

    let picked_up = engine.start_work(offer.id).await.unwrap();
    assert_eq!(picked_up.status, OfferStatus::InLavoro);

    // Parallel stage at index 0, then a final technical review
    let steps = engine
        .create_workflow(
            offer.id,
            vec![
                NewWorkflowStep::new(Department::Commerciale, 0),
                NewWorkflowStep::new(Department::Fattibilita, 0),
                NewWorkflowStep::new(Department::Tecnico, 1),
            ],
        )
        .await
        .unwrap();
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|s| s.status == StepStatus::Pending));

    let current = Offer::find_by_id(&pool, offer.id).await.unwrap().unwrap();
    assert_eq!(current.status, OfferStatus::ChecksInProgress);

    // The later stage cannot start while the first stage is open
    let blocked = engine
        .advance_step(steps[2].id, StepUpdate::new(StepStatus::InProgress))
        .await;
    assert!(matches!(blocked, Err(WorkflowError::Validation { .. })));

    // Work the parallel stage: one completed, one skipped
    engine
        .advance_step(steps[0].id, StepUpdate::new(StepStatus::InProgress))
        .await
        .unwrap();
    let commercial_done = engine
        .advance_step(steps[0].id, StepUpdate::new(StepStatus::Completed))
        .await
        .unwrap();
    assert!(commercial_done.step.actual_duration_minutes.is_some());
    assert!(!commercial_done.workflow_completed);

    engine
        .advance_step(steps[1].id, StepUpdate::new(StepStatus::Skipped))
        .await
        .unwrap();

    // Final stage is unblocked now and its close auto-readies the offer
    engine
        .advance_step(steps[2].id, StepUpdate::new(StepStatus::InProgress))
        .await
        .unwrap();
    let last = engine
        .advance_step(steps[2].id, StepUpdate::new(StepStatus::Completed))
        .await
        .unwrap();
    assert!(last.workflow_completed);
    assert_eq!(last.offer_status, OfferStatus::ReadyToSend);

    let sent = engine.send_offer(offer.id, None).await.unwrap();
    assert_eq!(sent.status, OfferStatus::Sent);
    assert!(sent.offer_sent_date.is_some());

    let accepted = engine
        .record_outcome(
            offer.id,
            OfferOutcome::Accepted {
                order_amount: Some(12_500.0),
                order_date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(accepted.status, OfferStatus::Accettata);
    assert_eq!(accepted.order_amount, Some(12_500.0));

    // A terminal offer accepts no further outcome
    let again = engine
        .record_outcome(offer.id, OfferOutcome::NotAccepted { reason: None })
        .await;
    assert!(matches!(again, Err(WorkflowError::InvalidTransition { .. })));

    // Every committed transition reached the subscriber, in order
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.offer_id == offer.id {
            seen.push(event.status);
        }
    }
    assert_eq!(
        seen,
        vec![
            OfferStatus::InLavoro,
            OfferStatus::ChecksInProgress,
            OfferStatus::ReadyToSend,
            OfferStatus::Sent,
            OfferStatus::Accettata,
        ]
    );
}

#[tokio::test]
#[ignore]
async fn test_declined_outcome_validation_precedes_write() {
    let pool = common::test_pool().await;
    let engine = WorkflowEngine::new(pool.clone());

    let client = common::seed_client(&pool, "Bianchi Stampi").await;
    let offer = common::seed_offer_in(&pool, client.id, 2024, 4).await;
    drive_to_sent(&engine, offer.id).await;

    // Missing reason code is rejected with nothing written
    let rejected = engine
        .record_outcome(
            offer.id,
            OfferOutcome::Declined {
                reason: None,
                notes: Some("call first".to_string()),
            },
        )
        .await;
    assert!(matches!(rejected, Err(WorkflowError::Validation { .. })));

    let unchanged = Offer::find_by_id(&pool, offer.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, OfferStatus::Sent);
    assert!(unchanged.declined_reason.is_none());

    let declined = engine
        .record_outcome(
            offer.id,
            OfferOutcome::Declined {
                reason: Some(DeclinedReason::TargetBasso),
                notes: Some("margin too thin".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(declined.status, OfferStatus::Declinata);
    assert_eq!(declined.declined_reason, Some(DeclinedReason::TargetBasso));
    assert_eq!(declined.declined_notes.as_deref(), Some("margin too thin"));
}

#[tokio::test]
#[ignore]
async fn test_not_accepted_keeps_free_text_reason() {
    let pool = common::test_pool().await;
    let engine = WorkflowEngine::new(pool.clone());

    let client = common::seed_client(&pool, "Verdi Utensili").await;
    let offer = common::seed_offer_in(&pool, client.id, 2023, 5).await;
    drive_to_sent(&engine, offer.id).await;

    let closed = engine
        .record_outcome(
            offer.id,
            OfferOutcome::NotAccepted {
                reason: Some("chose a cheaper supplier".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(closed.status, OfferStatus::NonAccettata);
    assert_eq!(
        closed.not_accepted_reason.as_deref(),
        Some("chose a cheaper supplier")
    );
}

#[tokio::test]
#[ignore]
async fn test_create_workflow_guards() {
    let pool = common::test_pool().await;
    let engine = WorkflowEngine::new(pool.clone());

    let client = common::seed_client(&pool, "Neri Lamiere").await;
    let offer = common::seed_offer_in(&pool, client.id, 2022, 6).await;

    let empty = engine.create_workflow(offer.id, Vec::new()).await;
    assert!(matches!(empty, Err(WorkflowError::Validation { .. })));

    let missing = engine
        .create_workflow(
            offer.id + 1_000_000,
            vec![NewWorkflowStep::new(Department::Tecnico, 0)],
        )
        .await;
    assert!(matches!(missing, Err(WorkflowError::NotFound { .. })));

    engine
        .create_workflow(offer.id, vec![NewWorkflowStep::new(Department::Tecnico, 0)])
        .await
        .unwrap();

    // A second attach on the same offer is refused
    let duplicate = engine
        .create_workflow(offer.id, vec![NewWorkflowStep::new(Department::Acquisti, 0)])
        .await;
    assert!(matches!(duplicate, Err(WorkflowError::Validation { .. })));
}

#[tokio::test]
#[ignore]
async fn test_send_requires_ready_offer() {
    let pool = common::test_pool().await;
    let engine = WorkflowEngine::new(pool.clone());

    let client = common::seed_client(&pool, "Galli Trattamenti").await;
    let offer = common::seed_offer_in(&pool, client.id, 2021, 7).await;

    let premature = engine.send_offer(offer.id, None).await;
    assert!(matches!(
        premature,
        Err(WorkflowError::InvalidTransition { .. })
    ));
}
