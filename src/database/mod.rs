//! # Database Operations
//!
//! Connection management and the schema migration runner.
//!
//! ## Key Components
//!
//! - [`connection`] - Pool construction from the layered configuration
//! - [`migrations`] - Schema migration system with concurrency control
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use offerflow_core::database::{DatabaseConnection, DatabaseMigrations};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::new().await?;
//! DatabaseMigrations::run_all(db.pool()).await?;
//! assert!(db.health_check().await?);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod migrations;

pub use connection::DatabaseConnection;
pub use migrations::{DatabaseMigrations, Migration};
