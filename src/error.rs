// Errors of one collection call. None of them is fatal to the process: the scheduler retries
// on its next tick and the chunk watermark tells it where to resume.

use crate::chunk_repo::codec::CodecError;
use crate::models::{MetricKind, Step};
use crate::record_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    /// Record store page fetch failed; surfaced as-is.
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("chunk codec: {0}")]
    Codec(#[from] CodecError),
    #[error("unsupported metric kind {0:?}")]
    UnsupportedKind(String),
    #[error("unsupported step {0:?}")]
    UnsupportedStep(String),
    #[error("chunk holds {chunk} data, got {requested}")]
    KindMismatch {
        chunk: MetricKind,
        requested: MetricKind,
    },
    #[error("{step} bucket {bucket} is older than the last bucket {tail}")]
    OutOfOrderBucket { step: Step, bucket: i64, tail: i64 },
    #[error("collection cancelled")]
    Cancelled,
}
