#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Offerflow Core
//!
//! Workflow engine and metrics aggregation core for a multi-department
//! offer pipeline.
//!
//! ## Overview
//!
//! Inbound client requests become offers that move through a fixed
//! lifecycle: registered, worked by departments through an ordered
//! sequence of workflow steps, sent as a quote, and closed with an
//! outcome. This crate owns that lifecycle end to end: the state
//! machine, the step ordering rules, bottleneck detection, optimistic
//! concurrency on every write, and the read-side aggregations that feed
//! reporting.
//!
//! ## Architecture
//!
//! Two entry points cover the write and read sides:
//!
//! - [`workflow::WorkflowEngine`] drives offers and their step
//!   sequences. Every state change runs through a table-driven state
//!   machine and lands with a compare-and-swap on `updated_at`, so
//!   concurrent writers get a retryable conflict instead of a lost
//!   update. Committed changes are announced on a broadcast channel;
//!   slow or absent subscribers never block a write.
//! - [`analytics::MetricsAggregator`] computes reporting aggregates
//!   from scratch on every call. Grouped SQL does the heavy lifting and
//!   pure folds shape the results, so the same data always produces the
//!   same report.
//!
//! ## Module Organization
//!
//! - [`workflow`] - Offer workflow engine and bottleneck scan
//! - [`analytics`] - Metrics aggregation queries and cache refreshes
//! - [`state_machine`] - Offer and step lifecycle definitions
//! - [`models`] - Data layer over PostgreSQL via SQLx
//! - [`scopes`] - Composable query builders for offers and steps
//! - [`events`] - Broadcast change notifications
//! - [`database`] - Connection pooling and schema migrations
//! - [`config`] - Layered configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Environment-aware tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use offerflow_core::analytics::MetricsAggregator;
//! use offerflow_core::database::DatabaseConnection;
//! use offerflow_core::models::workflow_step::NewWorkflowStep;
//! use offerflow_core::state_machine::Department;
//! use offerflow_core::workflow::WorkflowEngine;
//!
//! # async fn example(offer_id: i64) -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::new().await?;
//! let engine = WorkflowEngine::new(db.pool().clone());
//!
//! // Attach a two-stage check sequence to a registered offer
//! let steps = vec![
//!     NewWorkflowStep::new(Department::Commerciale, 1),
//!     NewWorkflowStep::new(Department::Tecnico, 2),
//! ];
//! let created = engine.create_workflow(offer_id, steps).await?;
//! println!("workflow attached with {} steps", created.len());
//!
//! // Read-side reporting
//! let aggregator = MetricsAggregator::new(db.pool().clone());
//! let evolution = aggregator.monthly_evolution(2025).await?;
//! assert_eq!(evolution.len(), 12);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit tests cover the pure logic (state tables, ordering rules,
//! aggregation folds) without a database. Integration tests that need
//! PostgreSQL read `DATABASE_URL` and are marked `#[ignore]`:
//!
//! ```bash
//! cargo test --lib              # Unit tests
//! cargo test -- --ignored       # Database-backed tests
//! ```

pub mod analytics;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod scopes;
pub mod state_machine;
pub mod workflow;

pub use analytics::MetricsAggregator;
pub use config::{
    AnalyticsConfig, BottleneckThresholds, ConfigManager, DatabaseConfig, OfferflowConfig,
    WorkflowConfig,
};
pub use error::{Result, WorkflowError};
pub use events::{EventPublisher, OfferUpdateEvent};
pub use state_machine::{DeclinedReason, Department, OfferStatus, Priority, StepStatus};
pub use workflow::{BottleneckAlert, OfferOutcome, StepAdvanceResult, StepUpdate, WorkflowEngine};
