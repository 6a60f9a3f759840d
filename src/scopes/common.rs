//! # Common Scope Infrastructure
//!
//! Shared execution surface for the Rails-like query scopes. Every scope
//! builder terminates a chain through one of the `ScopeBuilder` methods.

use sqlx::PgPool;

use crate::error::Result;

/// Standard execution methods shared by all scope builders
#[allow(async_fn_in_trait)]
pub trait ScopeBuilder<T> {
    /// Execute and return all matching rows
    async fn all(self, pool: &PgPool) -> Result<Vec<T>>;

    /// Execute and return the first matching row
    async fn first(self, pool: &PgPool) -> Result<Option<T>>;

    /// Count the matching rows
    async fn count(self, pool: &PgPool) -> Result<i64>;

    /// Whether at least one row matches
    async fn exists(self, pool: &PgPool) -> Result<bool>;
}
