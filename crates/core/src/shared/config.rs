use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clustering::domain::clustering_params::ClusteringParams;
use crate::registry::domain::representative_policy::RepresentativePolicy;
use crate::shared::constants::{DEFAULT_DETECTION_CONFIDENCE, DEFAULT_EPSILON, DEFAULT_MIN_POINTS};
use crate::shared::json_store;

#[derive(Error, Debug, PartialEq)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Tunables for ingestion, clustering, matching and thumbnailing.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceFindConfig {
    pub epsilon: f64,
    pub min_points: usize,
    pub representative_policy: RepresentativePolicy,
    /// Matches scoring below this are rejected. `None` always returns the best cluster.
    pub minimum_acceptable_score: Option<f64>,
    /// Detector instances run in parallel during ingestion.
    pub workers: usize,
    /// Square edge length for thumbnails; `None` keeps the raw crop.
    pub thumbnail_size: Option<u32>,
    pub detection_confidence: f64,
}

impl Default for FaceFindConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            min_points: DEFAULT_MIN_POINTS,
            representative_policy: RepresentativePolicy::default(),
            minimum_acceptable_score: None,
            workers: 1,
            thumbnail_size: None,
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE,
        }
    }
}

impl FaceFindConfig {
    /// `<config dir>/FaceFind/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceFind").join("config.json"))
    }

    /// Loads from `path`, or from [`Self::default_path`] when `None`.
    ///
    /// A missing file yields defaults silently; an unreadable or malformed
    /// one yields defaults with a warning.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match json_store::read_json::<Self>(&path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn clustering_params(&self) -> ClusteringParams {
        ClusteringParams {
            epsilon: self.epsilon,
            min_points: self.min_points,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clustering_params()
            .validate()
            .map_err(|e| ConfigError(e.to_string()))?;
        if let Some(score) = self.minimum_acceptable_score {
            if !(-1.0..=1.0).contains(&score) {
                return Err(ConfigError(format!(
                    "minimum_acceptable_score must be within [-1, 1], got {score}"
                )));
            }
        }
        if self.workers == 0 {
            return Err(ConfigError("workers must be at least 1".into()));
        }
        if self.thumbnail_size == Some(0) {
            return Err(ConfigError("thumbnail_size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(ConfigError(format!(
                "detection_confidence must be within [0, 1], got {}",
                self.detection_confidence
            )));
        }
        Ok(())
    }
}
