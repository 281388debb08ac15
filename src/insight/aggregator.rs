// Per-kind reducers: a batch of records -> one data point. Pure and total.

use crate::models::{
    ChangeFailureRate, DataPoint, DeployFrequency, DeploymentRecord, DeploymentStatus, MetricKind,
};

/// Statuses counted by change failure rate.
pub const TERMINAL_STATUSES: [DeploymentStatus; 2] =
    [DeploymentStatus::Failure, DeploymentStatus::Success];

/// What the collector needs from a metric kind.
pub trait InsightMetric: Send + Sync {
    fn kind(&self) -> MetricKind;

    /// Status restriction pushed down to the record store, if any.
    fn status_filter(&self) -> Option<&'static [DeploymentStatus]>;

    /// Reduces the records of one bucket. Returns the point (stamped `bucket_ts`) and the
    /// high-water mark: max `created_at`, or `lower_bound` when `records` is empty.
    fn reduce(
        &self,
        bucket_ts: i64,
        lower_bound: i64,
        records: &[DeploymentRecord],
    ) -> (DataPoint, i64);

    /// Combines two observations of the same bucket. `None` if either point is another kind.
    fn merge(&self, existing: &DataPoint, new: &DataPoint) -> Option<DataPoint>;
}

pub struct DeployFrequencyMetric;

pub struct ChangeFailureRateMetric;

impl MetricKind {
    pub fn metric(&self) -> &'static dyn InsightMetric {
        match self {
            MetricKind::DeploymentFrequency => &DeployFrequencyMetric,
            MetricKind::ChangeFailureRate => &ChangeFailureRateMetric,
        }
    }
}

impl InsightMetric for DeployFrequencyMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::DeploymentFrequency
    }

    fn status_filter(&self) -> Option<&'static [DeploymentStatus]> {
        None
    }

    fn reduce(
        &self,
        bucket_ts: i64,
        lower_bound: i64,
        records: &[DeploymentRecord],
    ) -> (DataPoint, i64) {
        let point = DeployFrequency {
            timestamp: bucket_ts,
            deploy_count: records.len() as u64,
        };
        (
            DataPoint::DeployFrequency(point),
            high_water_mark(records, lower_bound),
        )
    }

    fn merge(&self, existing: &DataPoint, new: &DataPoint) -> Option<DataPoint> {
        match (existing, new) {
            (DataPoint::DeployFrequency(a), DataPoint::DeployFrequency(b)) => {
                Some(DataPoint::DeployFrequency(DeployFrequency {
                    timestamp: a.timestamp,
                    deploy_count: a.deploy_count + b.deploy_count,
                }))
            }
            _ => None,
        }
    }
}

impl InsightMetric for ChangeFailureRateMetric {
    fn kind(&self) -> MetricKind {
        MetricKind::ChangeFailureRate
    }

    fn status_filter(&self) -> Option<&'static [DeploymentStatus]> {
        Some(&TERMINAL_STATUSES)
    }

    fn reduce(
        &self,
        bucket_ts: i64,
        lower_bound: i64,
        records: &[DeploymentRecord],
    ) -> (DataPoint, i64) {
        let mut success_count = 0u64;
        let mut failure_count = 0u64;
        for r in records {
            match r.status {
                DeploymentStatus::Success => success_count += 1,
                DeploymentStatus::Failure => failure_count += 1,
                _ => {}
            }
        }
        let point = ChangeFailureRate::from_counts(bucket_ts, success_count, failure_count);
        (
            DataPoint::ChangeFailureRate(point),
            high_water_mark(records, lower_bound),
        )
    }

    fn merge(&self, existing: &DataPoint, new: &DataPoint) -> Option<DataPoint> {
        match (existing, new) {
            (DataPoint::ChangeFailureRate(a), DataPoint::ChangeFailureRate(b)) => {
                Some(DataPoint::ChangeFailureRate(ChangeFailureRate::from_counts(
                    a.timestamp,
                    a.success_count + b.success_count,
                    a.failure_count + b.failure_count,
                )))
            }
            _ => None,
        }
    }
}

fn high_water_mark(records: &[DeploymentRecord], lower_bound: i64) -> i64 {
    records
        .iter()
        .map(|r| r.created_at)
        .max()
        .unwrap_or(lower_bound)
}
