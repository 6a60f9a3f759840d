use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::states::DeclinedReason;

/// Events that can trigger offer state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OfferEvent {
    /// Start working the offer without an attached step workflow
    StartWork,
    /// Attach a step workflow and begin department checks
    BeginChecks,
    /// All workflow steps are terminal; quote can be dispatched
    MarkReady,
    /// Dispatch the quote to the client, recording the send date
    Send(Option<NaiveDate>),
    /// Client accepted the offer, optionally with order details
    Accept {
        order_amount: Option<f64>,
        order_date: Option<NaiveDate>,
    },
    /// Decline internally with a closed reason code and optional notes
    Decline {
        reason: DeclinedReason,
        notes: Option<String>,
    },
    /// Client did not accept; optional free-text reason
    NotAccept(Option<String>),
}

impl OfferEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StartWork => "start_work",
            Self::BeginChecks => "begin_checks",
            Self::MarkReady => "mark_ready",
            Self::Send(_) => "send",
            Self::Accept { .. } => "accept",
            Self::Decline { .. } => "decline",
            Self::NotAccept(_) => "not_accept",
        }
    }

    /// Extract the closed reason code if this is a decline event
    pub fn declined_reason(&self) -> Option<DeclinedReason> {
        match self {
            Self::Decline { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Extract the free-text reason if this is a not-accepted event
    pub fn not_accepted_reason(&self) -> Option<&str> {
        match self {
            Self::NotAccept(reason) => reason.as_deref(),
            _ => None,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accept { .. } | Self::Decline { .. } | Self::NotAccept(_)
        )
    }

    /// Check if this event records a client outcome (valid only from SENT)
    pub fn is_outcome(&self) -> bool {
        self.is_terminal()
    }
}

/// Helper for creating common events
impl OfferEvent {
    /// Create an acceptance event without order details
    pub fn accept_simple() -> Self {
        Self::Accept {
            order_amount: None,
            order_date: None,
        }
    }

    /// Create a decline event with the given reason code
    pub fn decline_with_reason(reason: DeclinedReason) -> Self {
        Self::Decline {
            reason,
            notes: None,
        }
    }

    /// Create a not-accepted event carrying a free-text reason
    pub fn not_accept_with_reason(reason: impl Into<String>) -> Self {
        Self::NotAccept(Some(reason.into()))
    }
}
