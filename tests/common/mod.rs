//! Shared helpers for database-backed integration tests.
//!
//! `DATABASE_URL` must point at a disposable database whose name
//! contains "test"; the migration runner rebuilds its schema from
//! scratch once per test binary.

#![allow(dead_code)]

use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use uuid::Uuid;

use offerflow_core::database::DatabaseMigrations;
use offerflow_core::models::{Client, NewClient, NewOffer, Offer};

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// One shared pool per test binary, with the schema rebuilt on first use
pub async fn test_pool() -> PgPool {
    POOL.get_or_init(|| async {
        let url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must point at a disposable test database");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .expect("failed to connect to test database");

        DatabaseMigrations::run_all(&pool)
            .await
            .expect("failed to run migrations");

        pool
    })
    .await
    .clone()
}

/// Insert a client with a unique email domain
pub async fn seed_client(pool: &PgPool, name: &str) -> Client {
    seed_client_in_sector(pool, name, None).await
}

pub async fn seed_client_in_sector(pool: &PgPool, name: &str, sector: Option<&str>) -> Client {
    Client::create(
        pool,
        NewClient {
            name: name.to_string(),
            email_domain: format!("{}.example.com", Uuid::new_v4()),
            sector: sector.map(str::to_string),
            strategic: None,
        },
    )
    .await
    .expect("failed to seed client")
}

/// Insert a user directly; the core models users read-only
pub async fn seed_user(pool: &PgPool, username: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (username, full_name, created_at, updated_at)
        VALUES ($1, $2, NOW(), NOW())
        RETURNING id
        "#,
    )
    .bind(format!("{username}-{}", Uuid::new_v4()))
    .bind(username)
    .fetch_one(pool)
    .await
    .expect("failed to seed user")
}

/// Create an offer in `PENDING_REGISTRATION` dated to the given month
pub async fn seed_offer_in(pool: &PgPool, client_id: i64, year: i32, month: u32) -> Offer {
    seed_managed_offer(pool, client_id, None, year, month).await
}

pub async fn seed_managed_offer(
    pool: &PgPool,
    client_id: i64,
    managed_by_id: Option<i64>,
    year: i32,
    month: u32,
) -> Offer {
    let mail_date = NaiveDate::from_ymd_opt(year, month, 15).expect("valid seed date");
    Offer::create(
        pool,
        NewOffer {
            client_id,
            managed_by_id,
            mail_date: Some(mail_date),
            ..NewOffer::default()
        },
    )
    .await
    .expect("failed to seed offer")
}

/// Flip an offer to a repeat order of an existing item
pub async fn mark_reorder(pool: &PgPool, offer_id: i64) {
    sqlx::query("UPDATE offers SET is_new_item = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(offer_id)
        .execute(pool)
        .await
        .expect("failed to mark reorder");
}

/// Rewind an offer's creation time to widen its processing window
pub async fn backdate_offer_creation(pool: &PgPool, offer_id: i64, hours: f64) {
    sqlx::query("UPDATE offers SET created_at = NOW() - $2 * interval '1 hour' WHERE id = $1")
        .bind(offer_id)
        .bind(hours)
        .execute(pool)
        .await
        .expect("failed to backdate offer");
}

/// Force an offer into a status with outcome columns, bypassing the
/// state machine. For read-side seeding only.
pub async fn force_offer(
    pool: &PgPool,
    offer_id: i64,
    status: &str,
    offer_amount: Option<f64>,
    declined_reason: Option<&str>,
    not_accepted_reason: Option<&str>,
) {
    sqlx::query(
        r#"
        UPDATE offers
        SET status = $2,
            offer_amount = $3,
            declined_reason = $4,
            not_accepted_reason = $5,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(offer_id)
    .bind(status)
    .bind(offer_amount)
    .bind(declined_reason)
    .bind(not_accepted_reason)
    .execute(pool)
    .await
    .expect("failed to force offer state");
}

/// Rewind a step's start time so it looks long-running
pub async fn backdate_step_start(pool: &PgPool, step_id: i64, hours: f64) {
    sqlx::query(
        r#"
        UPDATE workflow_steps
        SET started_at = NOW() - $2 * interval '1 hour'
        WHERE id = $1
        "#,
    )
    .bind(step_id)
    .bind(hours)
    .execute(pool)
    .await
    .expect("failed to backdate step");
}
