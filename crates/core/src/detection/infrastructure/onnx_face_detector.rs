use std::path::Path;

use super::arcface_embedder::ArcFaceEmbedder;
use super::yolo_face_locator::YoloFaceLocator;
use crate::detection::domain::face_detector::{Detection, DetectionError, FaceDetector};
use crate::shared::face_record::BoundingBox;
use crate::shared::raster::Raster;

/// Two-stage detector: YOLO finds faces, ArcFace embeds each one.
///
/// Faces whose box lies entirely outside the image are dropped, since no
/// crop can be embedded for them.
pub struct OnnxFaceDetector {
    locator: YoloFaceLocator,
    embedder: ArcFaceEmbedder,
}

impl OnnxFaceDetector {
    pub fn new(
        detector_model: &Path,
        embedding_model: &Path,
        confidence: f64,
        intra_threads: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            locator: YoloFaceLocator::new(detector_model, confidence, intra_threads)?,
            embedder: ArcFaceEmbedder::new(embedding_model, intra_threads)?,
        })
    }

    fn detect_inner(
        &mut self,
        image: &Raster,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let located = self.locator.locate(image)?;
        let mut detections = Vec::with_capacity(located.len());
        for face in located {
            let Some(crop) = square_crop(image, &face.bbox) else {
                log::debug!("Dropping face outside image bounds: {:?}", face.bbox);
                continue;
            };
            detections.push(Detection {
                bbox: face.bbox,
                confidence: face.confidence,
                embedding: self.embedder.embed(&crop)?,
            });
        }
        Ok(detections)
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, image: &Raster) -> Result<Vec<Detection>, DetectionError> {
        self.detect_inner(image)
            .map_err(|e| DetectionError::Inference(e.to_string()))
    }
}

/// Square crop centered on the box, clamped to image bounds.
///
/// Returns `None` when nothing of the box is inside the image.
fn square_crop(image: &Raster, bbox: &BoundingBox) -> Option<Raster> {
    let fw = image.width() as f32;
    let fh = image.height() as f32;

    let cx = (bbox.x1 + bbox.x2) / 2.0;
    let cy = (bbox.y1 + bbox.y2) / 2.0;
    let half = bbox.width().max(bbox.height()) / 2.0;

    let x1 = (cx - half).clamp(0.0, fw) as u32;
    let y1 = (cy - half).clamp(0.0, fh) as u32;
    let x2 = (cx + half).clamp(0.0, fw) as u32;
    let y2 = (cy + half).clamp(0.0, fh) as u32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(image.crop(x1, y1, x2, y2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(w: u32, h: u32) -> Raster {
        Raster::new(vec![0u8; (w * h * 3) as usize], w, h, 3)
    }

    #[test]
    fn test_square_crop_expands_to_longest_side() {
        let bbox = BoundingBox::new(80.0, 60.0, 120.0, 140.0);
        let crop = square_crop(&image(200, 200), &bbox).unwrap();
        assert_eq!(crop.width(), 80);
        assert_eq!(crop.height(), 80);
    }

    #[test]
    fn test_square_crop_clamps_at_edges() {
        let bbox = BoundingBox::new(-20.0, -20.0, 20.0, 20.0);
        let crop = square_crop(&image(100, 100), &bbox).unwrap();
        assert_eq!(crop.width(), 20);
        assert_eq!(crop.height(), 20);
    }

    #[test]
    fn test_square_crop_outside_image_is_none() {
        let bbox = BoundingBox::new(150.0, 150.0, 180.0, 180.0);
        assert!(square_crop(&image(100, 100), &bbox).is_none());
    }
}
