// Deployment records as read from the record store (read-only to the collector)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Deployment lifecycle status; serializes to SCREAMING_SNAKE_CASE (e.g. "SUCCESS").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Pending,
    Planned,
    Running,
    RollingBack,
    Success,
    Failure,
    Cancelled,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "PENDING",
            DeploymentStatus::Planned => "PLANNED",
            DeploymentStatus::Running => "RUNNING",
            DeploymentStatus::RollingBack => "ROLLING_BACK",
            DeploymentStatus::Success => "SUCCESS",
            DeploymentStatus::Failure => "FAILURE",
            DeploymentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DeploymentStatus::Pending),
            "PLANNED" => Ok(DeploymentStatus::Planned),
            "RUNNING" => Ok(DeploymentStatus::Running),
            "ROLLING_BACK" => Ok(DeploymentStatus::RollingBack),
            "SUCCESS" => Ok(DeploymentStatus::Success),
            "FAILURE" => Ok(DeploymentStatus::Failure),
            "CANCELLED" => Ok(DeploymentStatus::Cancelled),
            other => Err(format!("unknown deployment status {:?}", other)),
        }
    }
}

/// One deployment. `created_at` is unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub id: String,
    pub application_id: String,
    pub created_at: i64,
    pub status: DeploymentStatus,
}
