// Metric kinds, steps and the per-bucket data points stored in chunks

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

use crate::error::InsightError;

/// Delivery metric a chunk rolls up. Config/URL form is snake_case ("deployment_frequency").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SchemaRead, SchemaWrite,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    DeploymentFrequency,
    ChangeFailureRate,
}

impl MetricKind {
    pub const ALL: [MetricKind; 2] = [MetricKind::DeploymentFrequency, MetricKind::ChangeFailureRate];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::DeploymentFrequency => "deployment_frequency",
            MetricKind::ChangeFailureRate => "change_failure_rate",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deployment_frequency" => Ok(MetricKind::DeploymentFrequency),
            "change_failure_rate" => Ok(MetricKind::ChangeFailureRate),
            other => Err(InsightError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Bucket granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Daily, Step::Weekly, Step::Monthly, Step::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Daily => "daily",
            Step::Weekly => "weekly",
            Step::Monthly => "monthly",
            Step::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Step::Daily),
            "weekly" => Ok(Step::Weekly),
            "monthly" => Ok(Step::Monthly),
            "yearly" => Ok(Step::Yearly),
            other => Err(InsightError::UnsupportedStep(other.to_string())),
        }
    }
}

/// Deployments started in one bucket. `timestamp` is the bucket start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct DeployFrequency {
    pub timestamp: i64,
    pub deploy_count: u64,
}

/// Share of terminal deployments in one bucket that failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFailureRate {
    pub timestamp: i64,
    pub rate: f64,
    pub success_count: u64,
    pub failure_count: u64,
}

impl ChangeFailureRate {
    /// Builds the point from tallies; rate is 0 when there were no terminal deployments.
    pub fn from_counts(timestamp: i64, success_count: u64, failure_count: u64) -> Self {
        let total = success_count + failure_count;
        let rate = if total == 0 {
            0.0
        } else {
            failure_count as f64 / total as f64
        };
        Self {
            timestamp,
            rate,
            success_count,
            failure_count,
        }
    }
}

/// One bucket of a rollup sequence. JSON form is the inner struct (untagged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(untagged)]
pub enum DataPoint {
    DeployFrequency(DeployFrequency),
    ChangeFailureRate(ChangeFailureRate),
}

impl DataPoint {
    pub fn timestamp(&self) -> i64 {
        match self {
            DataPoint::DeployFrequency(p) => p.timestamp,
            DataPoint::ChangeFailureRate(p) => p.timestamp,
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            DataPoint::DeployFrequency(_) => MetricKind::DeploymentFrequency,
            DataPoint::ChangeFailureRate(_) => MetricKind::ChangeFailureRate,
        }
    }
}
