//! # Workflow Operations
//!
//! Transaction-safe engine driving offers and their department steps
//! through the processing pipeline.

pub mod engine;

pub use engine::{
    BottleneckAlert, OfferOutcome, StepAdvanceResult, StepUpdate, WorkflowEngine,
};
