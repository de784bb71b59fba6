use thiserror::Error;

use crate::registry::domain::cluster::Cluster;
use crate::shared::face_record::{BoundingBox, FaceRef};
use crate::shared::raster::Raster;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThumbnailError {
    #[error("face box {bbox:?} in {filename} has no area inside the image")]
    DegenerateCrop { filename: String, bbox: [f32; 4] },
    #[error("source image {filename} is unavailable: {reason}")]
    SourceMissing { filename: String, reason: String },
}

/// Integer pixel rectangle `[x1, x2) × [y1, y2)`, guaranteed non-empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRect {
    pub fn as_array(&self) -> [u32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Truncates `bbox` to whole pixels and clamps it into `[0, width] × [0, height]`.
///
/// `None` if nothing is left.
pub fn clamp_bbox(bbox: &BoundingBox, width: u32, height: u32) -> Option<CropRect> {
    let clamp = |v: f32, max: u32| (v as i64).clamp(0, max as i64) as u32;
    let rect = CropRect {
        x1: clamp(bbox.x1, width),
        y1: clamp(bbox.y1, height),
        x2: clamp(bbox.x2, width),
        y2: clamp(bbox.y2, height),
    };
    (rect.x2 > rect.x1 && rect.y2 > rect.y1).then_some(rect)
}

/// Crops one face out of its source image.
pub fn extract_face(face: &FaceRef, source: &Raster) -> Result<Raster, ThumbnailError> {
    let rect = clamp_bbox(&face.bbox, source.width(), source.height()).ok_or_else(|| {
        ThumbnailError::DegenerateCrop {
            filename: face.filename.clone(),
            bbox: face.bbox.as_array(),
        }
    })?;
    Ok(source.crop(rect.x1, rect.y1, rect.x2, rect.y2))
}

/// Display crop for a cluster: its exemplar face cut from `source`, which
/// must be the exemplar's image.
pub fn extract(cluster: &Cluster, source: &Raster) -> Result<Raster, ThumbnailError> {
    extract_face(&cluster.exemplar, source)
}
