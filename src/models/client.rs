//! # Client Model
//!
//! Customers whose inbound requests become offers. The `email_domain` is
//! unique and routes inbound mail to the owning client. The
//! `loyalty_score`/`new_items_count`/`reorder_count` columns are caches of
//! the loyalty aggregation and are always recomputable from offer history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::Result;

/// A customer with derived loyalty caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email_domain: String,
    pub sector: Option<String>,
    pub strategic: bool,
    pub new_items_count: i32,
    pub reorder_count: i32,
    pub loyalty_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New Client for creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email_domain: String,
    pub sector: Option<String>,
    pub strategic: Option<bool>, // Defaults to false
}

const CLIENT_COLUMNS: &str = r#"
    id, name, email_domain, sector, strategic,
    new_items_count, reorder_count, loyalty_score,
    created_at, updated_at
"#;

impl Client {
    /// Create a new client
    pub async fn create(pool: &PgPool, new_client: NewClient) -> Result<Client> {
        let sql = format!(
            r#"
            INSERT INTO clients (name, email_domain, sector, strategic, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING {CLIENT_COLUMNS}
            "#
        );

        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(&new_client.name)
            .bind(&new_client.email_domain)
            .bind(&new_client.sector)
            .bind(new_client.strategic.unwrap_or(false))
            .fetch_one(pool)
            .await?;

        Ok(client)
    }

    /// Find a client by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(client)
    }

    /// Find a client by its unique email domain
    pub async fn find_by_email_domain(pool: &PgPool, domain: &str) -> Result<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE email_domain = $1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(domain)
            .fetch_optional(pool)
            .await?;

        Ok(client)
    }

    /// List all clients ordered by name
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name");
        let clients = sqlx::query_as::<_, Client>(&sql).fetch_all(pool).await?;

        Ok(clients)
    }

    /// Overwrite the derived loyalty caches with freshly recomputed values.
    /// Last writer wins; values are always full recomputations, never
    /// increments.
    pub async fn write_loyalty_cache<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
        new_items_count: i32,
        reorder_count: i32,
        loyalty_score: f64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET new_items_count = $2,
                reorder_count = $3,
                loyalty_score = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(new_items_count)
        .bind(reorder_count)
        .bind(loyalty_score)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
