// Insight rollups: bucket planning, record scanning, per-kind reduction, chunk merging and the
// collector that drives them.

pub mod aggregator;
pub mod bucket;
pub mod collector;
pub mod merge;
pub mod scanner;

pub use aggregator::{ChangeFailureRateMetric, DeployFrequencyMetric, InsightMetric};
pub use collector::{CollectError, CollectionRequest, Collector, WalkSummary};
pub use merge::MergeOutcome;
pub use scanner::{DEFAULT_PAGE_SIZE, IncrementalScanner};
