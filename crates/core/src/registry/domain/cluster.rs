use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::clustering::domain::cluster_assignment::ClusterId;
use crate::shared::face_record::FaceRef;

/// One identity group in a built registry.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    pub representative: Vec<f32>,
    /// Distinct source images. A photo with two people in it can appear
    /// under two clusters.
    pub members: BTreeSet<String>,
    /// Corpus positions of the faces in this cluster, ascending.
    pub record_indices: Vec<usize>,
    /// Face used for the cluster's thumbnail: its lowest-indexed member.
    pub exemplar: FaceRef,
    pub thumbnail: Option<PathBuf>,
}

impl Cluster {
    /// Number of faces, which can exceed the number of member images.
    pub fn face_count(&self) -> usize {
        self.record_indices.len()
    }
}
