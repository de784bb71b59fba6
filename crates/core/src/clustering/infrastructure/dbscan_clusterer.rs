/// DBSCAN over cosine distance with a fixed, index-ordered sweep.
///
/// Builds the full pairwise distance matrix up front: O(n²) time and
/// memory (4 bytes per pair), which dominates the pipeline's cost. Fine
/// for tens of thousands of faces; larger corpora need an approximate
/// neighbor index instead of the dense matrix.
///
/// Records are visited in index order (ingestion order). A border point
/// reachable from several clusters joins the one whose sweep reaches it
/// first. Points that are not density-reachable from any core point become
/// singleton clusters, so every record is labelled; with `min_points = 1`
/// every point is a core point and this never happens.
use std::collections::VecDeque;

use ndarray::Array2;

use crate::clustering::domain::cluster_assignment::{ClusterAssignment, ClusterId};
use crate::clustering::domain::clustering_params::ClusteringParams;
use crate::clustering::domain::face_clusterer::{ClusteringError, FaceClusterer};
use crate::shared::embedding::l2_norm;
use crate::shared::face_record::FaceRecord;

pub struct DbscanClusterer;

impl DbscanClusterer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DbscanClusterer {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceClusterer for DbscanClusterer {
    fn cluster(
        &self,
        records: &[FaceRecord],
        params: &ClusteringParams,
    ) -> Result<ClusterAssignment, ClusteringError> {
        params.validate()?;
        let first = records.first().ok_or(ClusteringError::EmptyCorpus)?;
        let expected = first.dimension();
        if let Some((index, bad)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.dimension() != expected)
        {
            return Err(ClusteringError::InconsistentDimension {
                index,
                expected,
                found: bad.dimension(),
            });
        }

        let distances = cosine_distance_matrix(records);
        let labels = dbscan(&distances, params.epsilon, params.min_points);
        let assignment = ClusterAssignment::from_labels(labels);
        log::debug!(
            "DBSCAN (eps={}, min_points={}) grouped {} faces into {} clusters",
            params.epsilon,
            params.min_points,
            records.len(),
            assignment.cluster_count()
        );
        Ok(assignment)
    }
}

/// Symmetric `n × n` matrix of `1 - cos(a, b)`.
///
/// Zero-norm embeddings have similarity 0 to everything, i.e. distance 1.
pub fn cosine_distance_matrix(records: &[FaceRecord]) -> Array2<f32> {
    let n = records.len();
    let dim = records.first().map_or(0, FaceRecord::dimension);

    let mut unit = Array2::<f32>::zeros((n, dim));
    for (i, record) in records.iter().enumerate() {
        let norm = l2_norm(&record.embedding);
        if norm > 0.0 {
            for (j, x) in record.embedding.iter().enumerate() {
                unit[[i, j]] = (*x as f64 / norm) as f32;
            }
        }
    }

    let mut distances = unit.dot(&unit.t()).mapv_into(|s| 1.0 - s.clamp(-1.0, 1.0));

    // The product isn't bit-symmetric; mirror the upper triangle so the
    // neighbor relation is.
    for i in 0..n {
        distances[[i, i]] = 0.0;
        for j in (i + 1)..n {
            distances[[j, i]] = distances[[i, j]];
        }
    }
    distances
}

fn region_query(distances: &Array2<f32>, point: usize, epsilon: f64) -> Vec<usize> {
    distances
        .row(point)
        .iter()
        .enumerate()
        .filter(|(_, d)| **d as f64 <= epsilon)
        .map(|(j, _)| j)
        .collect()
}

fn dbscan(distances: &Array2<f32>, epsilon: f64, min_points: usize) -> Vec<ClusterId> {
    let n = distances.nrows();
    let mut labels: Vec<Option<ClusterId>> = vec![None; n];
    let mut next: ClusterId = 0;

    for seed in 0..n {
        if labels[seed].is_some() {
            continue;
        }
        let neighbors = region_query(distances, seed, epsilon);
        if neighbors.len() < min_points {
            // Noise for now; a later sweep may still claim it as a border point.
            continue;
        }

        let id = next;
        next += 1;
        labels[seed] = Some(id);

        let mut queue: VecDeque<usize> = neighbors.into_iter().collect();
        while let Some(point) = queue.pop_front() {
            if labels[point].is_some() {
                continue;
            }
            labels[point] = Some(id);
            let reach = region_query(distances, point, epsilon);
            if reach.len() >= min_points {
                queue.extend(reach.into_iter().filter(|p| labels[*p].is_none()));
            }
        }
    }

    labels
        .into_iter()
        .map(|label| {
            label.unwrap_or_else(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}
