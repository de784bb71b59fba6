/// YOLO face localisation using ONNX Runtime via `ort`.
///
/// Letterbox preprocessing, inference and NMS. Produces boxes in source
/// image coordinates, most confident first; embedding happens elsewhere.
use std::path::Path;

use super::execution_provider;
use super::math::bbox_iou;
use crate::shared::face_record::BoundingBox;
use crate::shared::raster::Raster;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO letterbox padding value.
const PAD_GRAY: f32 = 114.0 / 255.0;

#[derive(Clone, Debug, PartialEq)]
pub struct LocatedFace {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

pub struct YoloFaceLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl YoloFaceLocator {
    /// Load a YOLO ONNX model.
    ///
    /// The input resolution is read from the model's input shape (NCHW),
    /// falling back to 640 when the shape is dynamic.
    pub fn new(
        model_path: &Path,
        confidence: f64,
        intra_threads: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = execution_provider::build_session(model_path, intra_threads)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    pub fn locate(
        &mut self,
        image: &Raster,
    ) -> Result<Vec<LocatedFace>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(image, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }

        // Output is [1, features, detections] or [1, detections, features].
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Ok(Vec::new());
        }

        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        let feature = |det: usize, f: usize| -> f64 {
            if transposed {
                data[f * num_dets + det] as f64
            } else {
                data[det * num_feats + f] as f64
            }
        };

        let mut raw = Vec::new();
        for i in 0..num_dets {
            // [cx, cy, w, h, conf, ...landmarks]
            let conf = feature(i, 4);
            if conf < self.confidence {
                continue;
            }
            let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
            let unpad = |v: f64, pad: u32| ((v - pad as f64) / scale) as f32;
            raw.push(LocatedFace {
                bbox: BoundingBox::new(
                    unpad(cx - w / 2.0, pad_x),
                    unpad(cy - h / 2.0, pad_y),
                    unpad(cx + w / 2.0, pad_x),
                    unpad(cy + h / 2.0, pad_y),
                ),
                confidence: conf as f32,
            });
        }

        Ok(nms(raw, NMS_IOU_THRESH))
    }
}

/// Letterbox-resize an image to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(image: &Raster, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = image.width() as f64;
    let fh = image.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut tensor = ndarray::Array4::<f32>::from_elem(
        (1, 3, target_size as usize, target_size as usize),
        PAD_GRAY,
    );

    let src = image.as_ndarray();
    let src_h = image.height() as usize;
    let src_w = image.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(mut faces: Vec<LocatedFace>, iou_thresh: f64) -> Vec<LocatedFace> {
    faces.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<LocatedFace> = Vec::new();
    for face in faces {
        if keep.iter().all(|k| bbox_iou(&k.bbox, &face.bbox) <= iou_thresh) {
            keep.push(face);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> LocatedFace {
        LocatedFace {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, content 640x320, vertical padding 160
        let image = Raster::new(vec![255u8; 200 * 100 * 3], 200, 100, 3);
        let (tensor, scale, pad_x, pad_y) = letterbox(&image, 640);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 1e-9);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
        assert!((tensor[[0, 0, 0, 0]] - PAD_GRAY).abs() < 1e-6);
        assert!((tensor[[0, 0, 320, 320]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlaps_and_orders_by_confidence() {
        let faces = vec![
            face(0.0, 0.0, 10.0, 10.0, 0.6),
            face(1.0, 1.0, 11.0, 11.0, 0.9),
            face(50.0, 50.0, 60.0, 60.0, 0.7),
        ];
        let kept = nms(faces, NMS_IOU_THRESH);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.7);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(Vec::new(), NMS_IOU_THRESH).is_empty());
    }
}
