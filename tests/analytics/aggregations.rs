//! Aggregation queries against seeded offer data.
//!
//! Every test owns a distinct statistics year, so suites sharing the
//! database never leak into each other's aggregates.

use chrono::{Duration, Utc};

use offerflow_core::analytics::{MetricsAggregator, UNKNOWN_SECTOR};
use offerflow_core::models::NewWorkflowStep;
use offerflow_core::state_machine::{Department, StepStatus};
use offerflow_core::workflow::{StepUpdate, WorkflowEngine};

use crate::common;

#[tokio::test]
#[ignore]
async fn test_monthly_evolution_and_comparison() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2031;

    let alfa = common::seed_client(&pool, "Alfa Precision").await;
    let beta = common::seed_client(&pool, "Beta Precision").await;

    // March: accepted, declined, still pending
    let o1 = common::seed_offer_in(&pool, alfa.id, year, 3).await;
    common::force_offer(&pool, o1.id, "ACCETTATA", Some(10_000.0), None, None).await;
    let o2 = common::seed_offer_in(&pool, alfa.id, year, 3).await;
    common::force_offer(&pool, o2.id, "DECLINATA", None, Some("TARGET BASSO"), None).await;
    common::seed_offer_in(&pool, alfa.id, year, 3).await;

    // July: one not accepted, one accepted for the second client
    let o4 = common::seed_offer_in(&pool, alfa.id, year, 7).await;
    common::force_offer(&pool, o4.id, "NON_ACCETTATA", None, None, Some("prezzo alto")).await;
    let o5 = common::seed_offer_in(&pool, beta.id, year, 7).await;
    common::force_offer(&pool, o5.id, "ACCETTATA", Some(4_000.0), None, None).await;

    let months = aggregator.monthly_evolution(year).await.unwrap();
    assert_eq!(months.len(), 12);

    let march = &months[2];
    assert_eq!(march.month_name, "March");
    assert_eq!(march.requests, 3);
    assert_eq!(march.proposed, 2);
    assert_eq!(march.accepted, 1);
    assert_eq!(march.declined, 1);
    assert_eq!(march.order_value, 10_000.0);

    let july = &months[6];
    assert_eq!(july.requests, 2);
    assert_eq!(july.accepted, 1);
    assert_eq!(july.declined, 1);
    assert_eq!(july.order_value, 4_000.0);

    // Months without offers are zeroed, and the series accounts for
    // every offer of the year
    assert!(months.iter().all(|m| m.month == 3 || m.month == 7 || m.requests == 0));
    let total: i64 = months.iter().map(|m| m.requests).sum();
    assert_eq!(total, 5);

    // The same numbers pivoted against an empty neighbor year
    let pivot = aggregator.comparison(&[year - 1, year]).await.unwrap();
    assert_eq!(pivot.requests.len(), 12);
    assert_eq!(pivot.requests[2].month, "March");
    assert_eq!(pivot.requests[2].by_year[&year], 3);
    assert_eq!(pivot.requests[2].by_year[&(year - 1)], 0);
    assert_eq!(pivot.order_value[2].by_year[&year], 10_000.0);
    assert_eq!(pivot.accepted[6].by_year[&year], 1);
}

#[tokio::test]
#[ignore]
async fn test_reasons_analysis_shares_and_null_reasons() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2036;

    let client = common::seed_client(&pool, "Delta Stampaggio").await;

    for _ in 0..2 {
        let offer = common::seed_offer_in(&pool, client.id, year, 2).await;
        common::force_offer(&pool, offer.id, "DECLINATA", None, Some("TARGET BASSO"), None).await;
    }
    let offer = common::seed_offer_in(&pool, client.id, year, 2).await;
    common::force_offer(&pool, offer.id, "DECLINATA", None, Some("QUANTITÀ ALTE"), None).await;

    let offer = common::seed_offer_in(&pool, client.id, year, 5).await;
    common::force_offer(&pool, offer.id, "NON_ACCETTATA", None, None, Some("prezzo alto")).await;
    let offer = common::seed_offer_in(&pool, client.id, year, 5).await;
    common::force_offer(&pool, offer.id, "NON_ACCETTATA", None, None, None).await;

    let analysis = aggregator.reasons_analysis(year).await.unwrap();

    assert_eq!(analysis.declined_reasons.len(), 2);
    assert_eq!(analysis.declined_reasons[0].reason, "TARGET BASSO");
    assert_eq!(analysis.declined_reasons[0].count, 2);
    assert!((analysis.declined_reasons[0].percentage - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(analysis.declined_reasons[1].reason, "QUANTITÀ ALTE");
    assert!((analysis.declined_reasons[1].percentage - 100.0 / 3.0).abs() < 1e-9);

    // The reasonless rejection counts toward the total but gets no row
    assert_eq!(analysis.not_accepted_reasons.len(), 1);
    assert_eq!(analysis.not_accepted_reasons[0].reason, "prezzo alto");
    assert_eq!(analysis.not_accepted_reasons[0].percentage, 50.0);
}

#[tokio::test]
#[ignore]
async fn test_client_ranking_ties_and_limit() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2032;

    // Equal accepted value for all three; creation order must survive
    for name in ["Officina Uno", "Officina Due", "Officina Tre"] {
        let client = common::seed_client(&pool, name).await;
        let offer = common::seed_offer_in(&pool, client.id, year, 4).await;
        common::force_offer(&pool, offer.id, "ACCETTATA", Some(5_000.0), None, None).await;
    }

    let ranked = aggregator.client_ranking(year, None).await.unwrap();
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].client_name, "Officina Uno");
    assert_eq!(ranked[1].client_name, "Officina Due");
    assert_eq!(ranked[2].client_name, "Officina Tre");
    assert!(ranked.iter().all(|r| r.total_value == 5_000.0));
    assert!(ranked.iter().all(|r| r.success_rate == 100.0));

    let top_two = aggregator.client_ranking(year, Some(2)).await.unwrap();
    assert_eq!(top_two.len(), 2);
    assert_eq!(top_two[0].client_name, "Officina Uno");
    assert_eq!(top_two[1].client_name, "Officina Due");
}

#[tokio::test]
#[ignore]
async fn test_sector_distribution_labels_missing_sector() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2037;

    let plain = common::seed_client(&pool, "Torneria Senza Settore").await;
    let auto = common::seed_client_in_sector(&pool, "Freni Premium", Some("Automotive")).await;

    let offer = common::seed_offer_in(&pool, plain.id, year, 6).await;
    common::force_offer(&pool, offer.id, "ACCETTATA", Some(9_000.0), None, None).await;
    let offer = common::seed_offer_in(&pool, auto.id, year, 6).await;
    common::force_offer(&pool, offer.id, "ACCETTATA", Some(3_000.0), None, None).await;
    // Non-accepted offers stay out of the distribution
    common::seed_offer_in(&pool, auto.id, year, 6).await;

    let sectors = aggregator.sector_distribution(year).await.unwrap();

    assert_eq!(sectors.len(), 2);
    assert_eq!(sectors[0].sector, UNKNOWN_SECTOR);
    assert_eq!(sectors[0].accepted_count, 1);
    assert_eq!(sectors[0].total_value, 9_000.0);
    assert_eq!(sectors[1].sector, "Automotive");
    assert_eq!(sectors[1].total_value, 3_000.0);
}

#[tokio::test]
#[ignore]
async fn test_new_vs_reorder_split() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2038;

    let client = common::seed_client(&pool, "Viteria Brembana").await;

    let new_accepted = common::seed_offer_in(&pool, client.id, year, 1).await;
    common::force_offer(&pool, new_accepted.id, "ACCETTATA", Some(7_000.0), None, None).await;
    common::seed_offer_in(&pool, client.id, year, 1).await;

    let reorder = common::seed_offer_in(&pool, client.id, year, 2).await;
    common::mark_reorder(&pool, reorder.id).await;
    common::force_offer(&pool, reorder.id, "ACCETTATA", Some(1_500.0), None, None).await;

    let split = aggregator.new_vs_reorder(year).await.unwrap();

    assert_eq!(split.new_items.requests, 2);
    assert_eq!(split.new_items.accepted, 1);
    assert_eq!(split.new_items.accepted_value, 7_000.0);
    assert_eq!(split.reorders.requests, 1);
    assert_eq!(split.reorders.accepted, 1);
    assert_eq!(split.reorders.accepted_value, 1_500.0);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_and_seasonal_trends() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2039;

    let client = common::seed_client(&pool, "Carpenteria Adda").await;

    common::seed_offer_in(&pool, client.id, year, 3).await;
    let o2 = common::seed_offer_in(&pool, client.id, year, 3).await;
    common::force_offer(&pool, o2.id, "ACCETTATA", Some(8_000.0), None, None).await;
    let o3 = common::seed_offer_in(&pool, client.id, year, 3).await;
    common::force_offer(&pool, o3.id, "DECLINATA", None, Some("TEMPI DI CONSEGNA"), None).await;
    let o4 = common::seed_offer_in(&pool, client.id, year, 4).await;
    common::force_offer(&pool, o4.id, "SENT", Some(2_000.0), None, None).await;
    let o5 = common::seed_offer_in(&pool, client.id, year, 4).await;
    common::force_offer(&pool, o5.id, "NON_ACCETTATA", None, None, None).await;

    let stats = aggregator.dashboard_stats(Some(year)).await.unwrap();
    assert_eq!(stats.total_offers, 5);
    assert_eq!(stats.pending_registration, 1);
    assert_eq!(stats.in_progress, 0);
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.declined, 2);
    assert_eq!(stats.total_value, 10_000.0);
    assert_eq!(stats.by_year[&year], 5);

    // The unscoped dashboard spans other suites' years too
    let global = aggregator.dashboard_stats(None).await.unwrap();
    assert!(global.total_offers >= 5);
    assert_eq!(global.by_year[&year], 5);

    let trends = aggregator.seasonal_trends(year).await.unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0].month, format!("{year}-03"));
    assert_eq!(trends[0].total, 3);
    assert_eq!(trends[0].accepted, 1);
    assert_eq!(trends[0].declined, 1);
    assert_eq!(trends[0].avg_value, 8_000.0);
    assert_eq!(trends[1].month, format!("{year}-04"));
    assert_eq!(trends[1].declined, 0);
    assert_eq!(trends[1].avg_value, 2_000.0);
}

#[tokio::test]
#[ignore]
async fn test_workflow_timing_per_department() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let engine = WorkflowEngine::new(pool.clone());
    let year = 2034;

    let client = common::seed_client(&pool, "Fonderia Serio").await;
    let offer = common::seed_offer_in(&pool, client.id, year, 8).await;

    let steps = engine
        .create_workflow(
            offer.id,
            vec![
                NewWorkflowStep::new(Department::Commerciale, 0),
                NewWorkflowStep::new(Department::Tecnico, 1),
            ],
        )
        .await
        .unwrap();

    // Ten hours on the commercial desk, over its 8h threshold
    let started = Utc::now() - Duration::hours(10);
    engine
        .advance_step(
            steps[0].id,
            StepUpdate::new(StepStatus::Completed).with_timestamps(Some(started), None),
        )
        .await
        .unwrap();

    let timing = aggregator.workflow_timing(year).await.unwrap();

    // All five departments, pipeline order, zero-filled
    assert_eq!(timing.len(), 5);
    let departments: Vec<Department> = timing.iter().map(|t| t.department).collect();
    assert_eq!(departments, Department::ALL.to_vec());

    let commercial = &timing[0];
    assert_eq!(commercial.total_steps, 1);
    assert_eq!(commercial.bottleneck_count, 1);
    assert!((commercial.avg_duration_hours - 10.0).abs() < 0.1);
    assert_eq!(commercial.min_duration_hours, commercial.max_duration_hours);

    // The pending technical step counts but contributes no duration
    let technical = &timing[2];
    assert_eq!(technical.total_steps, 1);
    assert_eq!(technical.avg_duration_hours, 0.0);
    assert_eq!(technical.bottleneck_count, 0);

    let purchasing = &timing[3];
    assert_eq!(purchasing.total_steps, 0);
}

#[tokio::test]
#[ignore]
async fn test_repeated_reads_return_identical_results() {
    let pool = common::test_pool().await;
    let aggregator = MetricsAggregator::new(pool.clone());
    let year = 2040;

    let client = common::seed_client(&pool, "Minuteria Oglio").await;
    let offer = common::seed_offer_in(&pool, client.id, year, 9).await;
    common::force_offer(&pool, offer.id, "ACCETTATA", Some(6_000.0), None, None).await;

    assert_eq!(
        aggregator.monthly_evolution(year).await.unwrap(),
        aggregator.monthly_evolution(year).await.unwrap()
    );
    assert_eq!(
        aggregator.client_ranking(year, None).await.unwrap(),
        aggregator.client_ranking(year, None).await.unwrap()
    );
    assert_eq!(
        aggregator.dashboard_stats(Some(year)).await.unwrap(),
        aggregator.dashboard_stats(Some(year)).await.unwrap()
    );
}
