//! # User Model
//!
//! Managers and department operators referenced by offers and workflow
//! steps. Authentication and authorization live outside this core; only
//! identity and display fields are modeled here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::Result;
use crate::state_machine::states::Department;

/// An operator who manages offers or works department steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub department: Option<Department>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, username, full_name, department, created_at, updated_at";

impl User {
    /// Find a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// List all users ordered by username
    pub async fn list_all(pool: &PgPool) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?;

        Ok(users)
    }

    /// Display name, falling back to the username
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}
