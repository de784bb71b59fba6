use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use thiserror::Error;

use crate::clustering::domain::cluster_assignment::{ClusterAssignment, ClusterId};
use crate::clustering::domain::clustering_params::ClusteringParams;
use crate::registry::domain::cluster::Cluster;
use crate::registry::domain::representative_policy::RepresentativePolicy;
use crate::shared::embedding::is_finite;
use crate::shared::face_record::{FaceRecord, FaceRef};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("assignment labels {assignment} records but the corpus has {records}")]
    LengthMismatch { records: usize, assignment: usize },
    #[error("cluster {0} has no members")]
    EmptyCluster(ClusterId),
    #[error("cluster {id} has dimension {found}, registry uses {expected}")]
    InconsistentDimension {
        id: ClusterId,
        expected: usize,
        found: usize,
    },
    #[error("cluster {0} has a non-finite representative")]
    NonFiniteRepresentative(ClusterId),
}

/// Immutable, queryable summary of one clustering run.
///
/// Always rebuilt from scratch; there is no incremental update. Share it
/// through [`RegistryHandle`](super::registry_handle::RegistryHandle).
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRegistry {
    clusters: BTreeMap<ClusterId, Cluster>,
    policy: RepresentativePolicy,
    clustering: Option<ClusteringParams>,
    dimension: usize,
    face_count: usize,
}

impl ClusterRegistry {
    pub fn empty(policy: RepresentativePolicy) -> Self {
        Self {
            clusters: BTreeMap::new(),
            policy,
            clustering: None,
            dimension: 0,
            face_count: 0,
        }
    }

    pub fn build(
        records: &[FaceRecord],
        assignment: &ClusterAssignment,
        policy: RepresentativePolicy,
    ) -> Result<Self, RegistryError> {
        if records.len() != assignment.len() {
            return Err(RegistryError::LengthMismatch {
                records: records.len(),
                assignment: assignment.len(),
            });
        }

        let mut clusters = Vec::with_capacity(assignment.cluster_count());
        for (id, indices) in assignment.groups() {
            let faces: Vec<&FaceRecord> = indices.iter().map(|i| &records[*i]).collect();
            let first = faces.first().ok_or(RegistryError::EmptyCluster(id))?;
            if let Some(bad) = faces.iter().find(|r| r.dimension() != first.dimension()) {
                return Err(RegistryError::InconsistentDimension {
                    id,
                    expected: first.dimension(),
                    found: bad.dimension(),
                });
            }
            let representative = policy
                .representative(&faces)
                .ok_or(RegistryError::EmptyCluster(id))?;

            clusters.push(Cluster {
                id,
                representative,
                members: faces.iter().map(|r| r.filename.clone()).collect(),
                exemplar: FaceRef::from(*first),
                record_indices: indices,
                thumbnail: None,
            });
        }

        Self::from_clusters(clusters, policy, None, records.len())
    }

    /// Assembles a registry from already-derived clusters, as a store does
    /// when loading.
    pub fn from_clusters<I: IntoIterator<Item = Cluster>>(
        clusters: I,
        policy: RepresentativePolicy,
        clustering: Option<ClusteringParams>,
        face_count: usize,
    ) -> Result<Self, RegistryError> {
        let clusters: BTreeMap<ClusterId, Cluster> =
            clusters.into_iter().map(|c| (c.id, c)).collect();

        let dimension = clusters
            .values()
            .next()
            .map_or(0, |c| c.representative.len());
        for cluster in clusters.values() {
            if cluster.members.is_empty() || cluster.representative.is_empty() {
                return Err(RegistryError::EmptyCluster(cluster.id));
            }
            if cluster.representative.len() != dimension {
                return Err(RegistryError::InconsistentDimension {
                    id: cluster.id,
                    expected: dimension,
                    found: cluster.representative.len(),
                });
            }
            if !is_finite(&cluster.representative) {
                return Err(RegistryError::NonFiniteRepresentative(cluster.id));
            }
        }

        Ok(Self {
            clusters,
            policy,
            clustering,
            dimension,
            face_count,
        })
    }

    pub fn with_clustering_params(mut self, params: ClusteringParams) -> Self {
        self.clustering = Some(params);
        self
    }

    /// Attaches thumbnail paths; ids not in the registry are ignored.
    pub fn with_thumbnails(mut self, thumbnails: BTreeMap<ClusterId, PathBuf>) -> Self {
        for (id, path) in thumbnails {
            if let Some(cluster) = self.clusters.get_mut(&id) {
                cluster.thumbnail = Some(path);
            }
        }
        self
    }

    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    /// Clusters in ascending id order.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn representatives(&self) -> BTreeMap<ClusterId, &[f32]> {
        self.clusters
            .iter()
            .map(|(id, c)| (*id, c.representative.as_slice()))
            .collect()
    }

    pub fn members(&self) -> BTreeMap<ClusterId, &BTreeSet<String>> {
        self.clusters.iter().map(|(id, c)| (*id, &c.members)).collect()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn policy(&self) -> RepresentativePolicy {
        self.policy
    }

    pub fn clustering_params(&self) -> Option<ClusteringParams> {
        self.clustering
    }

    /// Representative length; 0 for an empty registry.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of corpus faces the registry was built from.
    pub fn face_count(&self) -> usize {
        self.face_count
    }
}
