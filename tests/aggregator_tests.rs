// Metric reducer tests: deploy counts, failure rates, high-water marks, merges

mod common;

use common::{deployment, deployments_at, ts};
use insightd::insight::aggregator::TERMINAL_STATUSES;
use insightd::models::{ChangeFailureRate, DataPoint, DeployFrequency, DeploymentStatus, MetricKind};

const APP: &str = "app-1";

#[test]
fn deploy_frequency_counts_all_records() {
    let bucket = ts(2020, 10, 11, 0);
    let mut records = deployments_at("a", APP, ts(2020, 10, 11, 5), 2);
    records.push(deployment("r", APP, ts(2020, 10, 11, 7), DeploymentStatus::Running));

    let metric = MetricKind::DeploymentFrequency.metric();
    let (point, hwm) = metric.reduce(bucket, ts(2020, 10, 11, 4), &records);
    assert_eq!(
        point,
        DataPoint::DeployFrequency(DeployFrequency {
            timestamp: bucket,
            deploy_count: 3,
        })
    );
    assert_eq!(hwm, ts(2020, 10, 11, 7));
    assert_eq!(metric.status_filter(), None);
}

#[test]
fn empty_batch_keeps_lower_bound_as_high_water_mark() {
    for kind in MetricKind::ALL {
        let (point, hwm) = kind.metric().reduce(100, 150, &[]);
        assert_eq!(hwm, 150);
        assert_eq!(point.timestamp(), 100);
        assert_eq!(point.kind(), kind);
    }
}

#[test]
fn change_failure_rate_from_mixed_statuses() {
    let t = ts(2020, 1, 1, 1);
    let records = vec![
        deployment("1", APP, t, DeploymentStatus::Failure),
        deployment("2", APP, t, DeploymentStatus::Failure),
        deployment("3", APP, t + 1, DeploymentStatus::Success),
        deployment("4", APP, t + 2, DeploymentStatus::Success),
    ];
    let metric = MetricKind::ChangeFailureRate.metric();
    let (point, hwm) = metric.reduce(ts(2020, 1, 1, 0), t, &records);
    assert_eq!(
        point,
        DataPoint::ChangeFailureRate(ChangeFailureRate {
            timestamp: ts(2020, 1, 1, 0),
            rate: 0.5,
            success_count: 2,
            failure_count: 2,
        })
    );
    assert_eq!(hwm, t + 2);
    assert_eq!(metric.status_filter(), Some(&TERMINAL_STATUSES[..]));
}

#[test]
fn change_failure_rate_one_in_four() {
    let t = ts(2020, 1, 1, 0);
    let records = vec![
        deployment("1", APP, t, DeploymentStatus::Success),
        deployment("2", APP, t, DeploymentStatus::Success),
        deployment("3", APP, t, DeploymentStatus::Failure),
        deployment("4", APP, t, DeploymentStatus::Success),
    ];
    let (point, _) = MetricKind::ChangeFailureRate.metric().reduce(t, t, &records);
    let DataPoint::ChangeFailureRate(p) = point else {
        panic!("expected change failure rate point");
    };
    assert_eq!(p.rate, 0.25);
    assert_eq!(p.success_count, 3);
    assert_eq!(p.failure_count, 1);
}

#[test]
fn change_failure_rate_is_zero_without_failures_or_terminals() {
    let only_success = ChangeFailureRate::from_counts(0, 5, 0);
    assert_eq!(only_success.rate, 0.0);

    let none = ChangeFailureRate::from_counts(0, 0, 0);
    assert_eq!(none.rate, 0.0);

    // Non-terminal statuses that slip through are not counted.
    let records = vec![deployment("p", APP, 10, DeploymentStatus::Pending)];
    let (point, _) = MetricKind::ChangeFailureRate.metric().reduce(0, 0, &records);
    assert_eq!(
        point,
        DataPoint::ChangeFailureRate(ChangeFailureRate::from_counts(0, 0, 0))
    );
}

#[test]
fn deploy_frequency_merge_adds_counts() {
    let metric = MetricKind::DeploymentFrequency.metric();
    let a = DataPoint::DeployFrequency(DeployFrequency {
        timestamp: 7,
        deploy_count: 10,
    });
    let b = DataPoint::DeployFrequency(DeployFrequency {
        timestamp: 7,
        deploy_count: 3,
    });
    assert_eq!(
        metric.merge(&a, &b),
        Some(DataPoint::DeployFrequency(DeployFrequency {
            timestamp: 7,
            deploy_count: 13,
        }))
    );
}

#[test]
fn change_failure_rate_merge_recomputes_rate_from_counts() {
    let metric = MetricKind::ChangeFailureRate.metric();
    let a = DataPoint::ChangeFailureRate(ChangeFailureRate::from_counts(7, 1, 1));
    let b = DataPoint::ChangeFailureRate(ChangeFailureRate::from_counts(7, 2, 0));
    let Some(DataPoint::ChangeFailureRate(merged)) = metric.merge(&a, &b) else {
        panic!("expected change failure rate point");
    };
    assert_eq!(merged.success_count, 3);
    assert_eq!(merged.failure_count, 1);
    assert_eq!(merged.rate, 0.25);
}

#[test]
fn merge_rejects_other_kind() {
    let df = DataPoint::DeployFrequency(DeployFrequency {
        timestamp: 0,
        deploy_count: 1,
    });
    let cfr = DataPoint::ChangeFailureRate(ChangeFailureRate::from_counts(0, 1, 0));
    assert_eq!(MetricKind::DeploymentFrequency.metric().merge(&df, &cfr), None);
    assert_eq!(MetricKind::ChangeFailureRate.metric().merge(&df, &cfr), None);
}
