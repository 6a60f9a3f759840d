use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::{ConfigManager, DatabaseConfig};
use crate::error::Result;

/// Owned connection pool, built from the layered configuration
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Connect using configuration files and environment overrides
    pub async fn new() -> Result<Self> {
        let manager = ConfigManager::load()?;
        Self::from_config(&manager.config().database).await
    }

    /// Connect with explicit database settings
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool)
            .acquire_timeout(Duration::from_secs(config.checkout_timeout_seconds))
            .connect(&config.connection_url())
            .await?;

        info!(
            max_connections = config.pool,
            database = %config.database,
            "Database pool established"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial query to verify the connection
    pub async fn health_check(&self) -> Result<bool> {
        let health: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
