//! # Offer Scopes
//!
//! Query scopes for the Offer model covering the filter shapes the
//! pipeline is queried by: status, client, priority, assignee, and
//! year/month partition.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::common::ScopeBuilder;
use crate::error::Result;
use crate::models::Offer;
use crate::state_machine::{OfferStatus, Priority};

/// Query builder for Offer scopes
pub struct OfferScope {
    query: QueryBuilder<'static, Postgres>,
    has_clients_join: bool,
    has_conditions: bool,
}

impl Offer {
    /// Start building a scoped query
    pub fn scope() -> OfferScope {
        let query = QueryBuilder::new("SELECT offers.* FROM offers");
        OfferScope {
            query,
            has_clients_join: false,
            has_conditions: false,
        }
    }
}

impl OfferScope {
    fn add_condition(&mut self, condition: &str) {
        if self.has_conditions {
            self.query.push(" AND ");
        } else {
            self.query.push(" WHERE ");
            self.has_conditions = true;
        }
        self.query.push(condition);
    }

    /// Ensure the clients join exists.
    ///
    /// JOINs must be added before WHERE conditions; call client-based
    /// scopes first in a chain.
    fn ensure_clients_join(&mut self) {
        if !self.has_clients_join {
            if !self.has_conditions {
                self.query
                    .push(" INNER JOIN clients ON clients.id = offers.client_id");
                self.has_clients_join = true;
            } else {
                tracing::warn!(
                    "Cannot add clients JOIN after WHERE conditions; call client scopes first"
                );
            }
        }
    }

    /// Scope: offers in a specific status
    pub fn by_status(mut self, status: OfferStatus) -> Self {
        self.add_condition("offers.status = ");
        self.query.push_bind(status);
        self
    }

    /// Scope: offers belonging to one client
    pub fn by_client(mut self, client_id: i64) -> Self {
        self.add_condition("offers.client_id = ");
        self.query.push_bind(client_id);
        self
    }

    /// Scope: offers with a specific priority
    pub fn by_priority(mut self, priority: Priority) -> Self {
        self.add_condition("offers.priority = ");
        self.query.push_bind(priority);
        self
    }

    /// Scope: offers managed by one user
    pub fn assigned_to(mut self, user_id: i64) -> Self {
        self.add_condition("offers.managed_by_id = ");
        self.query.push_bind(user_id);
        self
    }

    /// Scope: offers in a statistics year
    pub fn for_year(mut self, year: i32) -> Self {
        self.add_condition("offers.year_stats = ");
        self.query.push_bind(year);
        self
    }

    /// Scope: offers in a statistics month of a year
    pub fn for_month(mut self, year: i32, month: i32) -> Self {
        self.add_condition("offers.year_stats = ");
        self.query.push_bind(year);
        self.add_condition("offers.month_stats = ");
        self.query.push_bind(month);
        self
    }

    /// Scope: offers still being worked (registered through checks)
    pub fn open(mut self) -> Self {
        self.add_condition(
            "offers.status IN ('PENDING_REGISTRATION', 'IN_LAVORO', 'CHECKS_IN_PROGRESS')",
        );
        self
    }

    /// Scope: offers that reached a terminal outcome
    pub fn terminal(mut self) -> Self {
        self.add_condition("offers.status IN ('ACCETTATA', 'DECLINATA', 'NON_ACCETTATA')");
        self
    }

    /// Scope: offers for strategic clients. Adds the clients JOIN; call
    /// before condition scopes.
    pub fn for_strategic_clients(mut self) -> Self {
        self.ensure_clients_join();
        if self.has_clients_join {
            self.add_condition("clients.strategic = TRUE");
        }
        self
    }

    /// Scope: offers whose client is in a sector. Adds the clients JOIN;
    /// call before condition scopes.
    pub fn in_sector(mut self, sector: String) -> Self {
        self.ensure_clients_join();
        if self.has_clients_join {
            self.add_condition("clients.sector = ");
            self.query.push_bind(sector);
        }
        self
    }

    /// Scope: offers created after a specific time
    pub fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.add_condition("offers.created_at > ");
        self.query.push_bind(since);
        self
    }

    /// Add ordering by creation time
    pub fn order_by_created_at(mut self, ascending: bool) -> Self {
        if ascending {
            self.query.push(" ORDER BY offers.created_at ASC");
        } else {
            self.query.push(" ORDER BY offers.created_at DESC");
        }
        self
    }

    /// Add ordering by offer amount, largest first
    pub fn order_by_amount_desc(mut self) -> Self {
        self.query
            .push(" ORDER BY offers.offer_amount DESC NULLS LAST");
        self
    }

    /// Add limit
    pub fn limit(mut self, limit: i64) -> Self {
        self.query.push(" LIMIT ");
        self.query.push_bind(limit);
        self
    }

    /// Skip the first `offset` rows, for paginated listings
    pub fn offset(mut self, offset: i64) -> Self {
        self.query.push(" OFFSET ");
        self.query.push_bind(offset);
        self
    }
}

impl ScopeBuilder<Offer> for OfferScope {
    async fn all(mut self, pool: &PgPool) -> Result<Vec<Offer>> {
        let query = self.query.build_query_as::<Offer>();
        Ok(query.fetch_all(pool).await?)
    }

    async fn first(mut self, pool: &PgPool) -> Result<Option<Offer>> {
        self.query.push(" LIMIT 1");
        let query = self.query.build_query_as::<Offer>();
        Ok(query.fetch_optional(pool).await?)
    }

    // QueryBuilder cannot be reopened to wrap the statement in a COUNT,
    // so this fetches the scoped rows and counts them.
    async fn count(mut self, pool: &PgPool) -> Result<i64> {
        let rows = self.query.build().fetch_all(pool).await?;
        Ok(rows.len() as i64)
    }

    async fn exists(mut self, pool: &PgPool) -> Result<bool> {
        self.query.push(" LIMIT 1");
        let result = self.query.build().fetch_optional(pool).await?;
        Ok(result.is_some())
    }
}
