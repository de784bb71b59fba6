use thiserror::Error;

use crate::clustering::domain::cluster_assignment::ClusterAssignment;
use crate::clustering::domain::clustering_params::ClusteringParams;
use crate::shared::face_record::FaceRecord;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusteringError {
    #[error("nothing to cluster: the corpus is empty")]
    EmptyCorpus,
    #[error("invalid clustering parameters: {0}")]
    InvalidParameters(String),
    #[error("record {index} has embedding dimension {found}, expected {expected}")]
    InconsistentDimension {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Domain interface for partitioning faces into identity clusters.
///
/// Implementations must be deterministic: the same records in the same
/// order with the same parameters always yield the same assignment.
pub trait FaceClusterer: Send + Sync {
    fn cluster(
        &self,
        records: &[FaceRecord],
        params: &ClusteringParams,
    ) -> Result<ClusterAssignment, ClusteringError>;
}
