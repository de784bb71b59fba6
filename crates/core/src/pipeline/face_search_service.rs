use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::imaging::infrastructure::image_decoder::decode_rgb;
use crate::matching::domain::match_engine::{MatchEngine, MatchError, MatchResult};
use crate::registry::domain::cluster_registry::ClusterRegistry;
use crate::registry::domain::registry_handle::RegistryHandle;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("query image is unreadable: {0}")]
    ImageUnreadable(String),
    #[error("no face detected in query image")]
    NoFaceDetected,
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl SearchError {
    /// Stable machine-readable name, for callers that report errors as data.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ImageUnreadable(_) => "image_unreadable",
            Self::NoFaceDetected => "no_face_detected",
            Self::Detection(_) => "detection_failed",
            Self::Match(MatchError::InvalidQuery(_)) => "invalid_query",
            Self::Match(MatchError::RegistryEmpty) => "registry_empty",
            Self::Match(MatchError::NoConfidentMatch { .. }) => "no_confident_match",
        }
    }
}

/// Process-wide query context: one detector, the current registry and the
/// match policy, built once at startup and shared by reference.
///
/// Embedding queries run concurrently against registry snapshots. Image
/// queries serialise on the detector, whose sessions need exclusive access.
pub struct FaceSearchService {
    detector: Mutex<Box<dyn FaceDetector>>,
    registry: RegistryHandle,
    engine: MatchEngine,
}

impl FaceSearchService {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        registry: ClusterRegistry,
        engine: MatchEngine,
    ) -> Self {
        Self {
            detector: Mutex::new(detector),
            registry: RegistryHandle::new(registry),
            engine,
        }
    }

    /// Detects faces in an encoded image and matches the most confident one.
    pub fn search_image(&self, bytes: &[u8]) -> Result<MatchResult, SearchError> {
        let image = decode_rgb(bytes).map_err(|e| SearchError::ImageUnreadable(e.to_string()))?;
        let detections = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|_| DetectionError::Unavailable("detector lock poisoned".into()))?;
            detector.detect(&image)?
        };
        let face = detections.first().ok_or(SearchError::NoFaceDetected)?;
        if detections.len() > 1 {
            log::debug!(
                "Query image has {} faces; matching the most confident",
                detections.len()
            );
        }
        self.search_embedding(&face.embedding)
    }

    pub fn search_embedding(&self, embedding: &[f32]) -> Result<MatchResult, SearchError> {
        let registry = self.registry.snapshot();
        Ok(self.engine.find_match(embedding, &registry)?)
    }

    pub fn registry(&self) -> Arc<ClusterRegistry> {
        self.registry.snapshot()
    }

    /// Replaces the registry for all subsequent queries. Queries already
    /// running finish against the snapshot they started with.
    pub fn publish(&self, registry: ClusterRegistry) -> Arc<ClusterRegistry> {
        log::info!("Publishing registry with {} clusters", registry.len());
        self.registry.publish(registry)
    }
}
