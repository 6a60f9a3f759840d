// State machine module for the offer pipeline
//
// Table-driven offer lifecycle: a (state, event) match resolves the target
// state, guards veto, persistence applies the change with an optimistic
// version check, actions publish the change event.

pub mod actions;
pub mod events;
pub mod guards;
pub mod offer_state_machine;
pub mod persistence;
pub mod states;

// Re-export main types for convenient access
pub use events::OfferEvent;
pub use offer_state_machine::OfferStateMachine;
pub use states::{DeclinedReason, Department, OfferStatus, Priority, StepStatus};

// Common traits and utilities
pub use actions::StateAction;
pub use guards::StateGuard;
pub use persistence::OfferTransitionPersistence;
