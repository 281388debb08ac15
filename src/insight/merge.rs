// Folds a freshly reduced data point into one granularity of a chunk.
// Tail with the same bucket start -> combined in place (continuation); otherwise appended.

use crate::error::InsightError;
use crate::insight::aggregator::InsightMetric;
use crate::models::{Chunk, DataPoint, DeploymentRecord, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The trailing bucket was re-opened and extended.
    Continued,
    /// A new bucket was appended.
    Appended,
}

/// Merges `point` into the `step` sequence. On error the chunk is untouched.
pub fn merge(
    chunk: &mut Chunk,
    step: Step,
    point: DataPoint,
    metric: &dyn InsightMetric,
) -> Result<MergeOutcome, InsightError> {
    let chunk_kind = chunk.kind;
    if point.kind() != chunk_kind {
        return Err(InsightError::KindMismatch {
            chunk: chunk_kind,
            requested: point.kind(),
        });
    }

    let bucket = point.timestamp();
    let points = chunk.data_points.get_mut(step);
    match points.last().map(DataPoint::timestamp) {
        Some(tail) if tail > bucket => Err(InsightError::OutOfOrderBucket { step, bucket, tail }),
        Some(tail) if tail == bucket => {
            if let Some(last) = points.last_mut() {
                let combined = metric
                    .merge(last, &point)
                    .ok_or(InsightError::KindMismatch {
                        chunk: last.kind(),
                        requested: point.kind(),
                    })?;
                *last = combined;
            }
            Ok(MergeOutcome::Continued)
        }
        _ => {
            points.push(point);
            Ok(MergeOutcome::Appended)
        }
    }
}

/// Moves `accumulated_to` up to `high_water_mark` and records which of `records` sit on it.
/// Never moves the watermark back; no-op when `records` is empty.
pub fn advance_watermark(chunk: &mut Chunk, high_water_mark: i64, records: &[DeploymentRecord]) {
    if records.is_empty() || high_water_mark < chunk.accumulated_to {
        return;
    }
    if high_water_mark > chunk.accumulated_to {
        chunk.accumulated_to = high_water_mark;
        chunk.frontier_ids.clear();
    }
    for r in records.iter().filter(|r| r.created_at == high_water_mark) {
        if let Err(pos) = chunk.frontier_ids.binary_search(&r.id) {
            chunk.frontier_ids.insert(pos, r.id.clone());
        }
    }
}
