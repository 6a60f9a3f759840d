use sqlx::PgPool;

use super::actions::{LogOutcomeAction, PublishOfferUpdateAction, StateAction};
use super::events::OfferEvent;
use super::guards::{AllStepsTerminalGuard, StateGuard};
use super::persistence::OfferTransitionPersistence;
use super::states::OfferStatus;
use crate::error::{Result, WorkflowError};
use crate::events::publisher::EventPublisher;
use crate::models::Offer;

/// Offer lifecycle state machine.
///
/// Transitions resolve through a `(current_state, event)` table, pass guard
/// checks, persist with an optimistic version check, then run side-effect
/// actions. The actions run after the write commits, so event delivery
/// failures can never roll back a transition.
pub struct OfferStateMachine {
    offer: Offer,
    pool: PgPool,
    event_publisher: EventPublisher,
    persistence: OfferTransitionPersistence,
}

impl OfferStateMachine {
    /// Create a new offer state machine instance
    pub fn new(offer: Offer, pool: PgPool, event_publisher: EventPublisher) -> Self {
        Self {
            offer,
            pool,
            event_publisher,
            persistence: OfferTransitionPersistence,
        }
    }

    /// Get the current state of the offer as stored
    pub async fn current_state(&self) -> Result<OfferStatus> {
        self.persistence
            .resolve_current_state(&self.pool, self.offer.id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Offer", self.offer.id))
    }

    /// Attempt to transition the offer state
    pub async fn transition(&mut self, event: OfferEvent) -> Result<OfferStatus> {
        let current_state = self.current_state().await?;
        let target_state = Self::determine_target_state(current_state, &event)?;

        // Check guards
        self.check_guards(current_state, target_state, &event).await?;

        // Persist the transition together with the event's annotations
        let updated = self
            .persistence
            .persist_transition(&self.pool, &self.offer, target_state, &event)
            .await?;
        self.offer = updated;

        // Execute actions
        self.execute_actions(current_state, target_state).await?;

        Ok(target_state)
    }

    /// Determine the target state based on current state and event.
    ///
    /// Pure transition table; every pair not listed is an invalid
    /// transition.
    pub fn determine_target_state(
        current_state: OfferStatus,
        event: &OfferEvent,
    ) -> Result<OfferStatus> {
        let target = match (current_state, event) {
            // Taking work without an attached workflow
            (OfferStatus::PendingRegistration, OfferEvent::StartWork) => OfferStatus::InLavoro,

            // Attaching a step workflow
            (OfferStatus::PendingRegistration | OfferStatus::InLavoro, OfferEvent::BeginChecks) => {
                OfferStatus::ChecksInProgress
            }

            // All checks done
            (OfferStatus::InLavoro | OfferStatus::ChecksInProgress, OfferEvent::MarkReady) => {
                OfferStatus::ReadyToSend
            }

            // Dispatch
            (OfferStatus::ReadyToSend, OfferEvent::Send(_)) => OfferStatus::Sent,

            // Outcomes, valid only from SENT
            (OfferStatus::Sent, OfferEvent::Accept { .. }) => OfferStatus::Accettata,
            (OfferStatus::Sent, OfferEvent::Decline { .. }) => OfferStatus::Declinata,
            (OfferStatus::Sent, OfferEvent::NotAccept(_)) => OfferStatus::NonAccettata,

            // Invalid transitions
            (from_state, event) => {
                return Err(WorkflowError::invalid_transition(
                    from_state,
                    intended_target(event),
                ))
            }
        };

        Ok(target)
    }

    /// Check guard conditions for the transition
    async fn check_guards(
        &self,
        _current_state: OfferStatus,
        target_state: OfferStatus,
        _event: &OfferEvent,
    ) -> Result<()> {
        match target_state {
            // No open steps may remain before the quote can be dispatched
            OfferStatus::ReadyToSend => {
                let guard = AllStepsTerminalGuard;
                guard.check(&self.offer, &self.pool).await?;
            }

            // No special guards for other transitions
            _ => {}
        }

        Ok(())
    }

    /// Execute actions after a successful transition
    async fn execute_actions(&self, from_state: OfferStatus, to_state: OfferStatus) -> Result<()> {
        let actions: Vec<Box<dyn StateAction<Offer> + Send + Sync>> = vec![
            Box::new(PublishOfferUpdateAction::new(self.event_publisher.clone())),
            Box::new(LogOutcomeAction),
        ];

        for action in actions {
            action
                .execute(&self.offer, from_state, to_state, &self.pool)
                .await?;
        }

        Ok(())
    }

    /// Check if the offer is in a terminal state
    pub async fn is_terminal(&self) -> Result<bool> {
        let current_state = self.current_state().await?;
        Ok(current_state.is_terminal())
    }

    /// Get offer information
    pub fn offer(&self) -> &Offer {
        &self.offer
    }

    /// Get offer ID
    pub fn offer_id(&self) -> i64 {
        self.offer.id
    }

    /// Consume the machine, returning the (possibly updated) offer
    pub fn into_offer(self) -> Offer {
        self.offer
    }
}

/// Target state an event is asking for, used in invalid-transition errors
fn intended_target(event: &OfferEvent) -> OfferStatus {
    match event {
        OfferEvent::StartWork => OfferStatus::InLavoro,
        OfferEvent::BeginChecks => OfferStatus::ChecksInProgress,
        OfferEvent::MarkReady => OfferStatus::ReadyToSend,
        OfferEvent::Send(_) => OfferStatus::Sent,
        OfferEvent::Accept { .. } => OfferStatus::Accettata,
        OfferEvent::Decline { .. } => OfferStatus::Declinata,
        OfferEvent::NotAccept(_) => OfferStatus::NonAccettata,
    }
}
