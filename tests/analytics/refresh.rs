//! Cache refresh operations: client loyalty and user performance.
//!
//! Both rebuild from offer history and overwrite their caches; running
//! a refresh twice must land on the same values.

use offerflow_core::analytics::MetricsAggregator;
use offerflow_core::models::{Client, UserPerformanceMetrics};

use crate::common;

#[tokio::test]
#[ignore]
async fn test_loyalty_refresh_writes_client_caches() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2033;

    // 20 reorders out of 25: raw 80, volume bonus lifts it to 88
    let gamma = common::seed_client(&pool, "Gamma Molle").await;
    for i in 0..25 {
        let offer = common::seed_offer_in(&pool, gamma.id, year, 1 + (i % 12)).await;
        if i < 20 {
            common::mark_reorder(&pool, offer.id).await;
        }
    }

    // 5 of 10 at the default threshold: no bonus, plain 50
    let delta = common::seed_client(&pool, "Delta Viti").await;
    for i in 0..10 {
        let offer = common::seed_offer_in(&pool, delta.id, year, 1 + (i % 12)).await;
        if i < 5 {
            common::mark_reorder(&pool, offer.id).await;
        }
    }

    let profiles = aggregator.client_loyalty(year).await.unwrap();
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].client_name, "Gamma Molle");
    assert_eq!(profiles[0].total_offers, 25);
    assert_eq!(profiles[0].reorder_count, 20);
    assert_eq!(profiles[0].reorder_percentage, 80.0);
    assert!((profiles[0].loyalty_score - 88.0).abs() < 1e-9);
    assert_eq!(profiles[1].client_name, "Delta Viti");
    assert_eq!(profiles[1].loyalty_score, 50.0);

    let written = aggregator.refresh_client_loyalty(&[year]).await.unwrap();
    assert_eq!(written, 2);

    let cached = Client::find_by_id(&pool, gamma.id).await.unwrap().unwrap();
    assert!((cached.loyalty_score - 88.0).abs() < 1e-9);
    assert_eq!(cached.reorder_count, 20);
    assert_eq!(cached.new_items_count, 5);

    let cached = Client::find_by_id(&pool, delta.id).await.unwrap().unwrap();
    assert_eq!(cached.loyalty_score, 50.0);

    // Rerunning lands on the same values
    let rewritten = aggregator.refresh_client_loyalty(&[year]).await.unwrap();
    assert_eq!(rewritten, 2);
    let cached = Client::find_by_id(&pool, gamma.id).await.unwrap().unwrap();
    assert!((cached.loyalty_score - 88.0).abs() < 1e-9);
}

#[tokio::test]
#[ignore]
async fn test_performance_refresh_builds_user_buckets() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2035;

    let client = common::seed_client(&pool, "Trafileria Brembo").await;
    let user_id = common::seed_user(&pool, "Paolo Gatti").await;

    // Three offers handled by the same user, each with a ten hour
    // processing window; one still open, so the workload is 1
    let accepted = common::seed_managed_offer(&pool, client.id, Some(user_id), year, 3).await;
    common::backdate_offer_creation(&pool, accepted.id, 10.0).await;
    common::force_offer(&pool, accepted.id, "ACCETTATA", Some(5_000.0), None, None).await;

    let declined = common::seed_managed_offer(&pool, client.id, Some(user_id), year, 3).await;
    common::backdate_offer_creation(&pool, declined.id, 10.0).await;
    common::force_offer(&pool, declined.id, "DECLINATA", None, Some("TEMPI DI CONSEGNA"), None)
        .await;

    let open = common::seed_managed_offer(&pool, client.id, Some(user_id), year, 3).await;
    common::backdate_offer_creation(&pool, open.id, 10.0).await;

    let buckets = aggregator.refresh_user_performance(&[year]).await.unwrap();
    assert_eq!(buckets, 1);

    let rows = UserPerformanceMetrics::list_for_user(&pool, user_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let row = &rows[0];
    assert_eq!(row.offers_handled, 3);
    assert_eq!(row.accepted_count, 1);
    assert_eq!(row.declined_count, 1);
    assert_eq!(row.current_workload, 1);
    assert!((row.success_rate - 100.0 / 3.0).abs() < 1e-6);
    assert!((row.avg_processing_time_hours - 10.0).abs() < 0.1);
    assert_eq!(row.period.len(), 7, "period is YYYY-MM: {}", row.period);

    // The upsert replaces the bucket instead of stacking a second row
    aggregator.refresh_user_performance(&[year]).await.unwrap();
    let rows = UserPerformanceMetrics::list_for_user(&pool, user_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].offers_handled, 3);
}
