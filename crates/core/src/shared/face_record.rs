use serde::{Deserialize, Serialize};

/// Axis-aligned face box `[x1, y1, x2, y2]` in source-image pixels.
///
/// Detector output is kept as-is; coordinates may fall outside the image
/// and are only clamped when a crop is taken.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.as_array().map(f64::from)
    }
}

/// One detected face: where it came from and what it looks like.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub filename: String,
    pub bbox: BoundingBox,
    #[serde(with = "crate::shared::exact_float")]
    pub embedding: Vec<f32>,
}

impl FaceRecord {
    pub fn new(filename: impl Into<String>, bbox: BoundingBox, embedding: Vec<f32>) -> Self {
        Self {
            filename: filename.into(),
            bbox,
            embedding,
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// The filename and box of a single face, without its embedding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceRef {
    pub filename: String,
    pub bbox: BoundingBox,
}

impl From<&FaceRecord> for FaceRef {
    fn from(record: &FaceRecord) -> Self {
        Self {
            filename: record.filename.clone(),
            bbox: record.bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let b = BoundingBox::new(10.0, 20.0, 50.0, 100.0);
        assert_eq!(b.width(), 40.0);
        assert_eq!(b.height(), 80.0);
    }

    #[test]
    fn test_bbox_serializes_as_array() {
        let b = BoundingBox::new(1.5, 2.0, 3.25, 4.0);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.5,2.0,3.25,4.0]");
    }

    #[test]
    fn test_record_json_roundtrip_is_bit_exact() {
        let record = FaceRecord::new(
            "IMG_0001.jpg",
            BoundingBox::new(12.345_678, 0.1, 99.9, 300.7),
            vec![0.1, -0.2, 0.300_000_02, 1.0e-7],
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: FaceRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.filename, record.filename);
        assert_eq!(
            back.bbox.as_array().map(f32::to_bits),
            record.bbox.as_array().map(f32::to_bits)
        );
        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&back.embedding), bits(&record.embedding));
    }

    #[test]
    fn test_face_ref_from_record() {
        let record = FaceRecord::new("a.jpg", BoundingBox::new(0.0, 0.0, 1.0, 1.0), vec![1.0]);
        let face = FaceRef::from(&record);
        assert_eq!(face.filename, "a.jpg");
        assert_eq!(face.bbox, record.bbox);
    }
}
