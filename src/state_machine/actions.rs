use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use super::states::OfferStatus;
use crate::error::Result;
use crate::events::publisher::{EventPublisher, OfferUpdateEvent};
use crate::models::Offer;

/// Trait for implementing state transition actions
#[async_trait]
pub trait StateAction<T> {
    /// Execute the action after a transition has been persisted
    async fn execute(
        &self,
        entity: &T,
        from_state: OfferStatus,
        to_state: OfferStatus,
        pool: &PgPool,
    ) -> Result<()>;

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}

/// Human-readable message attached to change events per target status
pub fn status_message(status: OfferStatus) -> &'static str {
    match status {
        OfferStatus::PendingRegistration => "Offer registered",
        OfferStatus::InLavoro => "Offer taken in charge",
        OfferStatus::ChecksInProgress => "Workflow created, department checks in progress",
        OfferStatus::ReadyToSend => "All checks completed, offer ready to send",
        OfferStatus::Sent => "Offer sent to client",
        OfferStatus::Accettata => "Offer accepted by client",
        OfferStatus::Declinata => "Offer declined",
        OfferStatus::NonAccettata => "Offer not accepted by client",
    }
}

/// Action to publish a change event when a status transition occurs.
///
/// Publication is fire-and-forget; a failed delivery is logged inside the
/// publisher and never affects the transition outcome.
pub struct PublishOfferUpdateAction {
    event_publisher: EventPublisher,
}

impl PublishOfferUpdateAction {
    pub fn new(event_publisher: EventPublisher) -> Self {
        Self { event_publisher }
    }
}

#[async_trait]
impl StateAction<Offer> for PublishOfferUpdateAction {
    async fn execute(
        &self,
        offer: &Offer,
        _from_state: OfferStatus,
        to_state: OfferStatus,
        _pool: &PgPool,
    ) -> Result<()> {
        self.event_publisher.publish(OfferUpdateEvent::new(
            offer.id,
            offer.offer_number.clone(),
            to_state,
            status_message(to_state),
        ));

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Publish offer_update event for status transition"
    }
}

/// Action logging terminal outcomes with their reason annotations
pub struct LogOutcomeAction;

#[async_trait]
impl StateAction<Offer> for LogOutcomeAction {
    async fn execute(
        &self,
        offer: &Offer,
        from_state: OfferStatus,
        to_state: OfferStatus,
        _pool: &PgPool,
    ) -> Result<()> {
        if to_state.is_terminal() {
            info!(
                offer_id = offer.id,
                offer_number = %offer.offer_number,
                from = %from_state,
                to = %to_state,
                declined_reason = offer.declined_reason.map(|r| r.to_string()),
                "Offer reached terminal outcome"
            );
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "Log terminal offer outcomes"
    }
}
