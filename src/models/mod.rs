pub mod client;
pub mod offer;
pub mod user;
pub mod user_performance;
pub mod workflow_step;

// Re-export core models for easy access
pub use client::{Client, NewClient};
pub use offer::{NewOffer, Offer};
pub use user::User;
pub use user_performance::{PerformanceBucket, UserPerformanceMetrics};
pub use workflow_step::{NewWorkflowStep, StepChanges, WorkflowStep};
