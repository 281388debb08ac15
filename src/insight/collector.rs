// Bucket-by-bucket driver: scan -> reduce -> merge, one bucket at a time.
//
// The first window starts at the literal `range_from` (possibly mid-bucket) and ends at the
// next boundary; later windows are aligned. A bucket with records always moves the walk on,
// even past `range_to`, so the chunk catches up with the latest data. An empty bucket moves on
// while its start is before `range_to` and ends the walk otherwise.
//
// A bucket's effect on the chunk is applied only after its scan succeeded, so an error or a
// cancellation leaves every earlier bucket committed and nothing half-applied.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::InsightError;
use crate::insight::{bucket, merge, scanner::IncrementalScanner};
use crate::models::{Chunk, Frontier, MetricKind, Step};
use crate::record_store::DeploymentStore;

/// One collection call for an (application, kind, step). `range_to` is the minimum coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    pub application_id: String,
    pub kind: MetricKind,
    pub step: Step,
    pub range_from: i64,
    pub range_to: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub buckets_scanned: u32,
    pub buckets_merged: u32,
    pub records: u64,
}

/// Failed collection; `chunk` holds every bucket committed before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct CollectError {
    pub chunk: Chunk,
    pub source: InsightError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    AtBucket(i64),
    Terminated,
}

pub struct Collector<S> {
    store: Arc<S>,
    page_size: usize,
}

impl<S: DeploymentStore> Collector<S> {
    pub fn new(store: Arc<S>, page_size: usize) -> Self {
        Self { store, page_size }
    }

    /// Extends `previous` with the records of `request` and returns the updated chunk.
    pub async fn collect(
        &self,
        request: &CollectionRequest,
        previous: Chunk,
        cancel: &CancellationToken,
    ) -> Result<Chunk, CollectError> {
        let mut chunk = previous;
        let frontier = chunk.frontier();
        match self
            .collect_into(request, &mut chunk, &frontier, cancel)
            .await
        {
            Ok(_) => Ok(chunk),
            Err(source) => Err(CollectError { chunk, source }),
        }
    }

    /// In-place form of [`Collector::collect`]. Records in `frontier` were folded in by an
    /// earlier call and are skipped; several steps over one chunk share the frontier taken
    /// before the first of them.
    #[instrument(
        skip_all,
        fields(
            application_id = %request.application_id,
            kind = %request.kind,
            step = %request.step,
        )
    )]
    pub async fn collect_into(
        &self,
        request: &CollectionRequest,
        chunk: &mut Chunk,
        frontier: &Frontier,
        cancel: &CancellationToken,
    ) -> Result<WalkSummary, InsightError> {
        if chunk.kind != request.kind {
            return Err(InsightError::KindMismatch {
                chunk: chunk.kind,
                requested: request.kind,
            });
        }
        let metric = request.kind.metric();
        let scanner = IncrementalScanner::new(self.store.as_ref(), self.page_size);
        let mut summary = WalkSummary::default();
        let mut state = WalkState::AtBucket(request.range_from);

        while let WalkState::AtBucket(bound_start) = state {
            if cancel.is_cancelled() {
                return Err(InsightError::Cancelled);
            }
            let (bucket_ts, bound_end) = bucket::bounds(bound_start, request.step);
            if bound_end <= bound_start {
                break;
            }

            let records = scanner
                .scan(
                    &request.application_id,
                    bound_start,
                    bound_end,
                    metric.status_filter(),
                    cancel,
                )
                .await?;
            summary.buckets_scanned += 1;
            let records: Vec<_> = records
                .into_iter()
                .filter(|r| !frontier.contains(r))
                .collect();

            if records.is_empty() {
                state = if bound_start < request.range_to {
                    WalkState::AtBucket(bound_end)
                } else {
                    WalkState::Terminated
                };
                continue;
            }

            let (point, high_water_mark) = metric.reduce(bucket_ts, bound_start, &records);
            let outcome = merge::merge(chunk, request.step, point, metric)?;
            merge::advance_watermark(chunk, high_water_mark, &records);
            summary.buckets_merged += 1;
            summary.records += records.len() as u64;
            debug!(
                bucket = bucket_ts,
                records = records.len(),
                outcome = ?outcome,
                "bucket merged"
            );
            state = WalkState::AtBucket(bound_end);
        }

        debug!(
            buckets_scanned = summary.buckets_scanned,
            buckets_merged = summary.buckets_merged,
            records = summary.records,
            accumulated_to = chunk.accumulated_to,
            "walk done"
        );
        Ok(summary)
    }
}
