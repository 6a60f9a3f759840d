use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{Result, WorkflowError};
use crate::models::Offer;

/// Trait for implementing state transition guards
#[async_trait]
pub trait StateGuard<T> {
    /// Check if a transition is allowed
    async fn check(&self, entity: &T, pool: &PgPool) -> Result<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard blocking `READY_TO_SEND` while any workflow step is still open.
///
/// Offers worked without an attached workflow pass trivially (zero steps,
/// zero open steps).
pub struct AllStepsTerminalGuard;

#[async_trait]
impl StateGuard<Offer> for AllStepsTerminalGuard {
    async fn check(&self, offer: &Offer, pool: &PgPool) -> Result<()> {
        let open_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM workflow_steps
            WHERE offer_id = $1 AND status NOT IN ('completed', 'skipped')
            "#,
        )
        .bind(offer.id)
        .fetch_one(pool)
        .await?;

        if open_count > 0 {
            return Err(WorkflowError::validation(format!(
                "Offer {} has {open_count} workflow steps still open",
                offer.id
            )));
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "All workflow steps must be completed or skipped"
    }
}
