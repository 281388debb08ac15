// Persisted rollup state for one (application, metric kind): four bucket sequences + watermark.
// Sequences are strictly increasing by bucket start; only the tail of a sequence is ever
// rewritten and new buckets are only appended (see insight::merge).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

use super::{DataPoint, DeploymentRecord, MetricKind, Step};

/// Data points per granularity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct DataPoints {
    pub daily: Vec<DataPoint>,
    pub weekly: Vec<DataPoint>,
    pub monthly: Vec<DataPoint>,
    pub yearly: Vec<DataPoint>,
}

impl DataPoints {
    pub fn get(&self, step: Step) -> &[DataPoint] {
        match step {
            Step::Daily => &self.daily,
            Step::Weekly => &self.weekly,
            Step::Monthly => &self.monthly,
            Step::Yearly => &self.yearly,
        }
    }

    pub(crate) fn get_mut(&mut self, step: Step) -> &mut Vec<DataPoint> {
        match step {
            Step::Daily => &mut self.daily,
            Step::Weekly => &mut self.weekly,
            Step::Monthly => &mut self.monthly,
            Step::Yearly => &mut self.yearly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub application_id: String,
    pub kind: MetricKind,
    /// Highest record `created_at` folded in so far (unix seconds); 0 when nothing was folded.
    pub accumulated_to: i64,
    /// Ids of folded records whose `created_at == accumulated_to`, sorted.
    pub frontier_ids: Vec<String>,
    pub data_points: DataPoints,
    /// Storage handle; opaque to the collector.
    pub file_path: String,
}

impl Chunk {
    /// Empty chunk for a key that has never been collected.
    pub fn new(application_id: &str, kind: MetricKind) -> Self {
        Self {
            application_id: application_id.to_string(),
            kind,
            accumulated_to: 0,
            frontier_ids: Vec::new(),
            data_points: DataPoints::default(),
            file_path: chunk_file_path(application_id, kind),
        }
    }

    pub fn points(&self, step: Step) -> &[DataPoint] {
        self.data_points.get(step)
    }

    /// Snapshot of the watermark, used to skip records a previous call already folded in.
    pub fn frontier(&self) -> Frontier {
        Frontier {
            at: self.accumulated_to,
            ids: self.frontier_ids.iter().cloned().collect(),
        }
    }
}

/// Records already counted at the watermark timestamp.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    at: i64,
    ids: HashSet<String>,
}

impl Frontier {
    pub fn contains(&self, record: &DeploymentRecord) -> bool {
        record.created_at == self.at && self.ids.contains(&record.id)
    }
}

/// Storage key for a chunk: `insights/<kind>/<application_id>.bin`.
pub fn chunk_file_path(application_id: &str, kind: MetricKind) -> String {
    format!("insights/{}/{}.bin", kind.as_str(), application_id)
}
