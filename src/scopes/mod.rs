//! # Query Scopes Module
//!
//! Rails-like query scopes for the offer pipeline models. Scopes enable
//! chainable, composable queries executed through the shared
//! `ScopeBuilder` trait.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use offerflow_core::models::Offer;
//! use offerflow_core::scopes::ScopeBuilder;
//! use offerflow_core::state_machine::OfferStatus;
//! # async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! // All sent offers for one client, newest first
//! let sent = Offer::scope()
//!     .by_client(7)
//!     .by_status(OfferStatus::Sent)
//!     .order_by_created_at(false)
//!     .all(pool)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## JOIN limitations
//!
//! SQLx's QueryBuilder builds SQL sequentially, so JOINs cannot be added
//! after WHERE conditions. Scopes that join another table
//! (`for_strategic_clients`, `in_sector`, `for_offer_year`) must come
//! first in a chain.
//!
//! All scopes bind parameters through SQLx; nothing is interpolated into
//! the SQL text.

pub mod common;
pub mod offer;
pub mod workflow_step;

pub use common::ScopeBuilder;
pub use offer::OfferScope;
pub use workflow_step::WorkflowStepScope;
