//! New item vs reorder split for one year of offers.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMixBucket {
    pub requests: i64,
    pub accepted: i64,
    /// Summed `offer_amount` of accepted offers in the bucket
    pub accepted_value: f64,
}

/// Year totals split between first-time items and reorders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewVsReorderSplit {
    pub new_items: ItemMixBucket,
    pub reorders: ItemMixBucket,
}

pub async fn new_vs_reorder(pool: &PgPool, year: i32) -> Result<NewVsReorderSplit> {
    let rows = sqlx::query_as::<_, (bool, i64, i64, f64)>(
        r#"
        SELECT is_new_item,
               COUNT(*) AS requests,
               COUNT(*) FILTER (WHERE status = 'ACCETTATA') AS accepted,
               COALESCE(SUM(offer_amount) FILTER (WHERE status = 'ACCETTATA'), 0)::float8
                   AS accepted_value
        FROM offers
        WHERE year_stats = $1
        GROUP BY is_new_item
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(split_item_mix(rows))
}

pub(crate) fn split_item_mix(rows: Vec<(bool, i64, i64, f64)>) -> NewVsReorderSplit {
    let mut split = NewVsReorderSplit::default();
    for (is_new_item, requests, accepted, accepted_value) in rows {
        let bucket = if is_new_item {
            &mut split.new_items
        } else {
            &mut split.reorders
        };
        bucket.requests = requests;
        bucket.accepted = accepted;
        bucket.accepted_value = accepted_value;
    }
    split
}
