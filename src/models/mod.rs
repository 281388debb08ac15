// Domain models: deployment records (input) and insight chunks (output)

mod chunk;
mod deployment;
mod insight;

pub use chunk::{Chunk, DataPoints, Frontier, chunk_file_path};
pub use deployment::{DeploymentRecord, DeploymentStatus};
pub use insight::{ChangeFailureRate, DataPoint, DeployFrequency, MetricKind, Step};
