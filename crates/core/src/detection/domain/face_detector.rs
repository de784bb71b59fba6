use thiserror::Error;

use crate::shared::face_record::BoundingBox;
use crate::shared::raster::Raster;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("face detection model failed: {0}")]
    Inference(String),
    #[error("face detector unavailable: {0}")]
    Unavailable(String),
}

/// One face found by a detector.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub embedding: Vec<f32>,
}

/// Domain interface for face detection and embedding extraction.
///
/// A call is one blocking unit of work per image; there are no partial
/// results. Detections come back most-confident first. Implementations may
/// hold inference sessions that need exclusive access, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, image: &Raster) -> Result<Vec<Detection>, DetectionError>;
}
