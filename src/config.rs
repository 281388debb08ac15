use std::collections::HashSet;
use std::str::FromStr;

use serde::Deserialize;

use crate::models::{MetricKind, Step};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub collector: CollectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between collection ticks when `schedule` is not set.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Optional cron expression with seconds field (e.g. "0 0 * * * *" = hourly). Uses local time.
    #[serde(default)]
    pub schedule: Option<String>,
    /// Page size for record store queries.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// How far back a never-collected chunk starts.
    #[serde(default = "default_backfill_days")]
    pub backfill_days: u32,
    #[serde(default)]
    pub targets: Vec<CollectionTarget>,
}

/// One application to collect; kinds and steps default to all of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionTarget {
    pub application_id: String,
    #[serde(default = "all_kinds")]
    pub kinds: Vec<MetricKind>,
    #[serde(default = "all_steps")]
    pub steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_page_size() -> usize {
    crate::insight::DEFAULT_PAGE_SIZE
}

fn default_backfill_days() -> u32 {
    30
}

fn all_kinds() -> Vec<MetricKind> {
    MetricKind::ALL.to_vec()
}

fn all_steps() -> Vec<Step> {
    Step::ALL.to_vec()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.collector.interval_secs > 0,
            "collector.interval_secs must be > 0, got {}",
            self.collector.interval_secs
        );
        anyhow::ensure!(
            self.collector.page_size > 0,
            "collector.page_size must be > 0, got {}",
            self.collector.page_size
        );
        anyhow::ensure!(
            self.collector.backfill_days > 0,
            "collector.backfill_days must be > 0, got {}",
            self.collector.backfill_days
        );
        if let Some(ref schedule) = self.collector.schedule {
            cron::Schedule::from_str(schedule).map_err(|e| {
                anyhow::anyhow!("collector.schedule {:?} is not a valid cron: {}", schedule, e)
            })?;
        }
        let mut applications = HashSet::new();
        for (i, target) in self.collector.targets.iter().enumerate() {
            anyhow::ensure!(
                !target.application_id.is_empty(),
                "collector.targets[{}].application_id must be non-empty",
                i
            );
            anyhow::ensure!(
                !target.kinds.is_empty(),
                "collector.targets[{}].kinds must be non-empty",
                i
            );
            anyhow::ensure!(
                !target.steps.is_empty(),
                "collector.targets[{}].steps must be non-empty",
                i
            );
            // One task writes each (application, kind) chunk, and each step is folded in once.
            anyhow::ensure!(
                applications.insert(target.application_id.as_str()),
                "collector.targets[{}].application_id {:?} is listed more than once",
                i,
                target.application_id
            );
            anyhow::ensure!(
                target.kinds.iter().collect::<HashSet<_>>().len() == target.kinds.len(),
                "collector.targets[{}].kinds has duplicates",
                i
            );
            anyhow::ensure!(
                target.steps.iter().collect::<HashSet<_>>().len() == target.steps.len(),
                "collector.targets[{}].steps has duplicates",
                i
            );
        }
        Ok(())
    }
}
