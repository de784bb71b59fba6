use serde::Serialize;
use thiserror::Error;

use crate::clustering::domain::cluster_assignment::ClusterId;
use crate::registry::domain::cluster_registry::ClusterRegistry;
use crate::shared::embedding::{cosine_similarity, is_finite, l2_norm};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("invalid query embedding: {0}")]
    InvalidQuery(String),
    #[error("registry has no clusters")]
    RegistryEmpty,
    #[error("best match is cluster {best_cluster} at {score:.4}, below threshold {threshold}")]
    NoConfidentMatch {
        best_cluster: ClusterId,
        score: f64,
        threshold: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BestMatch {
    pub cluster_id: ClusterId,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f64,
}

/// Answer to a query, as handed to callers outside the core.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    pub cluster_id: ClusterId,
    pub score: f64,
    pub matched_filenames: Vec<String>,
}

/// Nearest-representative search over a registry snapshot.
///
/// A linear scan: O(clusters × dimension) per query, fine into the low
/// thousands of clusters. Equal scores resolve to the lowest cluster id.
///
/// Without a threshold the best cluster is always returned, however poor.
/// With one, anything scoring below it is [`MatchError::NoConfidentMatch`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MatchEngine {
    minimum_acceptable_score: Option<f64>,
}

impl MatchEngine {
    pub fn new(minimum_acceptable_score: Option<f64>) -> Self {
        Self {
            minimum_acceptable_score,
        }
    }

    pub fn best_match(
        &self,
        query: &[f32],
        registry: &ClusterRegistry,
    ) -> Result<BestMatch, MatchError> {
        validate_query(query)?;
        if registry.is_empty() {
            return Err(MatchError::RegistryEmpty);
        }
        if query.len() != registry.dimension() {
            return Err(MatchError::InvalidQuery(format!(
                "dimension {} does not match registry dimension {}",
                query.len(),
                registry.dimension()
            )));
        }

        let mut best: Option<BestMatch> = None;
        for cluster in registry.clusters() {
            let score = cosine_similarity(query, &cluster.representative);
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(BestMatch {
                    cluster_id: cluster.id,
                    score,
                });
            }
        }
        let best = best.ok_or(MatchError::RegistryEmpty)?;

        match self.minimum_acceptable_score {
            Some(threshold) if best.score < threshold => Err(MatchError::NoConfidentMatch {
                best_cluster: best.cluster_id,
                score: best.score,
                threshold,
            }),
            _ => Ok(best),
        }
    }

    /// [`best_match`](Self::best_match) plus the winning cluster's member images.
    pub fn find_match(
        &self,
        query: &[f32],
        registry: &ClusterRegistry,
    ) -> Result<MatchResult, MatchError> {
        let best = self.best_match(query, registry)?;
        let matched_filenames = registry
            .get(best.cluster_id)
            .map(|c| c.members.iter().cloned().collect())
            .unwrap_or_default();
        Ok(MatchResult {
            cluster_id: best.cluster_id,
            score: best.score,
            matched_filenames,
        })
    }
}

fn validate_query(query: &[f32]) -> Result<(), MatchError> {
    if query.is_empty() {
        return Err(MatchError::InvalidQuery("embedding is empty".into()));
    }
    if !is_finite(query) {
        return Err(MatchError::InvalidQuery(
            "embedding contains NaN or infinite values".into(),
        ));
    }
    if l2_norm(query) == 0.0 {
        return Err(MatchError::InvalidQuery("embedding has zero norm".into()));
    }
    Ok(())
}
