use chrono::Utc;
use sqlx::PgExecutor;

use super::events::OfferEvent;
use super::states::OfferStatus;
use crate::error::{Result, WorkflowError};
use crate::models::Offer;

/// Persists offer status transitions with an optimistic version check.
///
/// The offer's status lives in place on the `offers` row. A transition is
/// one `UPDATE ... WHERE id = $1 AND updated_at = $2`; when another writer
/// touched the row since it was read, zero rows match and the transition
/// fails with a concurrency conflict instead of silently overwriting.
pub struct OfferTransitionPersistence;

const OFFER_COLUMNS: &str = r#"
    id, offer_number, client_id, managed_by_id, status, priority,
    item_name, is_new_item, offer_amount, order_amount,
    mail_date, offer_sent_date, order_date, reply_deadline,
    declined_reason, declined_notes, not_accepted_reason,
    year_stats, month_stats, created_at, updated_at
"#;

impl OfferTransitionPersistence {
    /// Read the offer's current status straight from the store
    pub async fn resolve_current_state<'e>(
        &self,
        executor: impl PgExecutor<'e>,
        offer_id: i64,
    ) -> Result<Option<OfferStatus>> {
        let status = sqlx::query_scalar::<_, OfferStatus>("SELECT status FROM offers WHERE id = $1")
            .bind(offer_id)
            .fetch_optional(executor)
            .await?;

        Ok(status)
    }

    /// Apply the transition and its event payload in a single statement.
    ///
    /// Outcome fields (`declined_reason`, `order_amount`, ...) travel with
    /// the event so the status change and its annotations commit together.
    /// Returns the updated row; a version mismatch surfaces as
    /// `ConcurrencyConflict`.
    pub async fn persist_transition<'e>(
        &self,
        executor: impl PgExecutor<'e>,
        offer: &Offer,
        target_state: OfferStatus,
        event: &OfferEvent,
    ) -> Result<Offer> {
        let mut sent_date = None;
        let mut order_amount = None;
        let mut order_date = None;
        let mut declined_reason = None;
        let mut declined_notes = None;
        let mut not_accepted_reason = None;

        match event {
            OfferEvent::Send(date) => {
                sent_date = Some(date.unwrap_or_else(|| Utc::now().date_naive()));
            }
            OfferEvent::Accept {
                order_amount: amount,
                order_date: date,
            } => {
                order_amount = *amount;
                order_date = *date;
            }
            OfferEvent::Decline { reason, notes } => {
                declined_reason = Some(*reason);
                declined_notes = notes.clone();
            }
            OfferEvent::NotAccept(reason) => {
                not_accepted_reason = reason.clone();
            }
            OfferEvent::StartWork | OfferEvent::BeginChecks | OfferEvent::MarkReady => {}
        }

        let sql = format!(
            r#"
            UPDATE offers
            SET status = $3,
                offer_sent_date = COALESCE($4, offer_sent_date),
                order_amount = COALESCE($5, order_amount),
                order_date = COALESCE($6, order_date),
                declined_reason = COALESCE($7, declined_reason),
                declined_notes = COALESCE($8, declined_notes),
                not_accepted_reason = COALESCE($9, not_accepted_reason),
                updated_at = NOW()
            WHERE id = $1 AND updated_at = $2
            RETURNING {OFFER_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Offer>(&sql)
            .bind(offer.id)
            .bind(offer.updated_at)
            .bind(target_state)
            .bind(sent_date)
            .bind(order_amount)
            .bind(order_date)
            .bind(declined_reason)
            .bind(declined_notes)
            .bind(not_accepted_reason)
            .fetch_optional(executor)
            .await?;

        updated.ok_or_else(|| WorkflowError::concurrency_conflict("Offer", offer.id))
    }
}
