//! # Offer Model
//!
//! Sales quotations tracked from inbound request to accept/decline outcome.
//!
//! ## Overview
//!
//! The `Offer` model is the root entity of the workflow pipeline. External
//! producers (email/spreadsheet import) create offers in
//! `PENDING_REGISTRATION`; the workflow engine advances them through the
//! status graph until a terminal outcome is recorded. Offers are never
//! deleted, only annotated further (reason codes, order amounts).
//!
//! ## Database Schema
//!
//! Maps to the `offers` table:
//! ```sql
//! CREATE TABLE offers (
//!   id BIGSERIAL PRIMARY KEY,
//!   offer_number TEXT NOT NULL UNIQUE,
//!   client_id BIGINT NOT NULL,
//!   status TEXT NOT NULL DEFAULT 'PENDING_REGISTRATION',
//!   year_stats INTEGER NOT NULL,
//!   month_stats INTEGER NOT NULL,
//!   -- ... other fields
//! );
//! ```
//!
//! ## Offer Numbers
//!
//! Offer numbers are year-scoped and monotonically increasing:
//! `2025-0001`, `2025-0002`, ... The sequence restarts at 1 each year.
//!
//! ## Partition Keys
//!
//! `year_stats`/`month_stats` are denormalized from `mail_date` at creation
//! (ingestion date when `mail_date` is absent) and are immutable afterwards;
//! every aggregation query groups on them.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::{Result, WorkflowError};
use crate::state_machine::states::{DeclinedReason, OfferStatus, Priority};

/// A sales quotation moving through the multi-department pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub id: i64,
    pub offer_number: String,
    pub client_id: i64,
    pub managed_by_id: Option<i64>,
    pub status: OfferStatus,
    pub priority: Priority,
    pub item_name: Option<String>,
    pub is_new_item: bool,
    pub offer_amount: Option<f64>,
    pub order_amount: Option<f64>,
    pub mail_date: Option<NaiveDate>,
    pub offer_sent_date: Option<NaiveDate>,
    pub order_date: Option<NaiveDate>,
    pub reply_deadline: Option<NaiveDate>,
    pub declined_reason: Option<DeclinedReason>,
    pub declined_notes: Option<String>,
    pub not_accepted_reason: Option<String>,
    pub year_stats: i32,
    pub month_stats: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New Offer for creation by an external producer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOffer {
    pub client_id: i64,
    pub managed_by_id: Option<i64>,
    pub priority: Option<Priority>, // Defaults to media
    pub item_name: Option<String>,
    pub is_new_item: Option<bool>, // Defaults to true
    pub offer_amount: Option<f64>,
    pub mail_date: Option<NaiveDate>, // Defaults to the ingestion date
    pub reply_deadline: Option<NaiveDate>,
}

const OFFER_COLUMNS: &str = r#"
    id, offer_number, client_id, managed_by_id, status, priority,
    item_name, is_new_item, offer_amount, order_amount,
    mail_date, offer_sent_date, order_date, reply_deadline,
    declined_reason, declined_notes, not_accepted_reason,
    year_stats, month_stats, created_at, updated_at
"#;

impl Offer {
    /// Create a new offer in `PENDING_REGISTRATION` with a generated
    /// year-scoped offer number and partition keys derived from `mail_date`.
    pub async fn create(pool: &PgPool, new_offer: NewOffer) -> Result<Offer> {
        if let Some(amount) = new_offer.offer_amount {
            if amount < 0.0 {
                return Err(WorkflowError::validation(format!(
                    "offer_amount must be non-negative, got {amount}"
                )));
            }
        }

        let mail_date = new_offer
            .mail_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let offer_number = Self::generate_offer_number(pool, mail_date.year()).await?;

        let sql = format!(
            r#"
            INSERT INTO offers (
                offer_number, client_id, managed_by_id, status, priority,
                item_name, is_new_item, offer_amount, mail_date, reply_deadline,
                year_stats, month_stats, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW())
            RETURNING {OFFER_COLUMNS}
            "#
        );

        let offer = sqlx::query_as::<_, Offer>(&sql)
            .bind(&offer_number)
            .bind(new_offer.client_id)
            .bind(new_offer.managed_by_id)
            .bind(OfferStatus::default())
            .bind(new_offer.priority.unwrap_or_default())
            .bind(&new_offer.item_name)
            .bind(new_offer.is_new_item.unwrap_or(true))
            .bind(new_offer.offer_amount)
            .bind(mail_date)
            .bind(new_offer.reply_deadline)
            .bind(mail_date.year())
            .bind(mail_date.month() as i32)
            .fetch_one(pool)
            .await?;

        Ok(offer)
    }

    /// Find an offer by ID
    pub async fn find_by_id<'e>(executor: impl PgExecutor<'e>, id: i64) -> Result<Option<Offer>> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1");
        let offer = sqlx::query_as::<_, Offer>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(offer)
    }

    /// Find an offer by its human-readable offer number
    pub async fn find_by_number(pool: &PgPool, offer_number: &str) -> Result<Option<Offer>> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers WHERE offer_number = $1");
        let offer = sqlx::query_as::<_, Offer>(&sql)
            .bind(offer_number)
            .fetch_optional(pool)
            .await?;

        Ok(offer)
    }

    /// Next offer number for the given year: `{year}-{seq:04}` where the
    /// sequence continues from the count of offers already carrying that
    /// year's prefix.
    pub async fn generate_offer_number<'e>(
        executor: impl PgExecutor<'e>,
        year: i32,
    ) -> Result<String> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM offers WHERE offer_number LIKE $1")
                .bind(format!("{year}-%"))
                .fetch_one(executor)
                .await?;

        Ok(format!("{year}-{:04}", count + 1))
    }

    /// Update the offer amount, rejecting negatives before any write
    pub async fn update_amount(pool: &PgPool, id: i64, offer_amount: f64) -> Result<Offer> {
        if offer_amount < 0.0 {
            return Err(WorkflowError::validation(format!(
                "offer_amount must be non-negative, got {offer_amount}"
            )));
        }

        let sql = format!(
            r#"
            UPDATE offers
            SET offer_amount = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {OFFER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Offer>(&sql)
            .bind(id)
            .bind(offer_amount)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| WorkflowError::not_found("Offer", id))
    }

    /// Whether the offer currently holds a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
