use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::state_machine::states::OfferStatus;

/// In-process publisher fanning offer change events out to subscribers
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<OfferUpdateEvent>,
}

/// Structured change event delivered to notification sinks.
///
/// Serializes to `{"type": "offer_update", "offer_id": ..,
/// "offer_number": .., "status": .., "message": ..}`.
#[derive(Debug, Clone, Serialize)]
pub struct OfferUpdateEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub offer_id: i64,
    pub offer_number: String,
    pub status: OfferStatus,
    pub message: String,
    #[serde(skip_serializing)]
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl OfferUpdateEvent {
    /// Create a change event for an offer status update
    pub fn new(
        offer_id: i64,
        offer_number: impl Into<String>,
        status: OfferStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: "offer_update",
            offer_id,
            offer_number: offer_number.into(),
            status,
            message: message.into(),
            published_at: chrono::Utc::now(),
        }
    }

    /// JSON payload in the notification sink's wire shape
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a change event to all current subscribers.
    ///
    /// Fire-and-forget: a send with no subscribers is not an error, and
    /// delivery failure never propagates into the caller's transaction.
    pub fn publish(&self, event: OfferUpdateEvent) {
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(receivers, "published offer_update event");
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(
                    offer_id = event.offer_id,
                    status = %event.status,
                    "no subscribers for offer_update event"
                );
            }
        }
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<OfferUpdateEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000) // Default capacity of 1000 events
    }
}
