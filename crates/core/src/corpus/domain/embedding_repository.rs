use std::collections::HashSet;

use thiserror::Error;

use crate::corpus::domain::corpus_store::CorpusStore;
use crate::detection::domain::face_detector::{Detection, DetectionError, FaceDetector};
use crate::imaging::infrastructure::image_decoder::decode_rgb;
use crate::shared::embedding::is_finite;
use crate::shared::face_record::FaceRecord;
use crate::shared::json_store::StoreError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("image {image_id} is unreadable: {reason}")]
    ImageUnreadable { image_id: String, reason: String },
    #[error("detection failed for {image_id}: {source}")]
    Detection {
        image_id: String,
        #[source]
        source: DetectionError,
    },
    #[error("embedding in {image_id} has dimension {found}, corpus uses {expected}")]
    DimensionMismatch {
        image_id: String,
        expected: usize,
        found: usize,
    },
    #[error("embedding in {image_id} contains NaN or infinite values")]
    NonFiniteEmbedding { image_id: String },
}

/// Decodes one image and runs the detector on it.
///
/// Zero faces is a valid, empty result.
pub fn detect_faces(
    image_id: &str,
    bytes: &[u8],
    detector: &mut dyn FaceDetector,
) -> Result<Vec<Detection>, IngestError> {
    let image = decode_rgb(bytes).map_err(|e| IngestError::ImageUnreadable {
        image_id: image_id.to_string(),
        reason: e.to_string(),
    })?;
    detector.detect(&image).map_err(|source| IngestError::Detection {
        image_id: image_id.to_string(),
        source,
    })
}

/// Ordered, append-only collection of detected faces.
///
/// All embeddings share one dimension, fixed by the first record. The
/// repository does not deduplicate: ingesting an image twice appends its
/// faces twice, and callers that want idempotence check
/// [`contains_image`](Self::contains_image) first.
#[derive(Debug, Default, Clone)]
pub struct EmbeddingRepository {
    records: Vec<FaceRecord>,
    images: HashSet<String>,
}

impl EmbeddingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts previously persisted records, checking that embeddings are
    /// finite and share one dimension.
    pub fn from_records(records: Vec<FaceRecord>) -> Result<Self, StoreError> {
        if let Some((index, bad)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| !is_finite(&r.embedding))
        {
            return Err(StoreError::Format(format!(
                "record {index} ({}) has a non-finite embedding",
                bad.filename
            )));
        }
        if let Some(first) = records.first() {
            let expected = first.dimension();
            if let Some((index, bad)) = records
                .iter()
                .enumerate()
                .find(|(_, r)| r.dimension() != expected)
            {
                return Err(StoreError::Format(format!(
                    "record {index} ({}) has dimension {}, expected {expected}",
                    bad.filename,
                    bad.dimension()
                )));
            }
        }
        let images = records.iter().map(|r| r.filename.clone()).collect();
        Ok(Self { records, images })
    }

    pub fn load(store: &dyn CorpusStore) -> Result<Self, StoreError> {
        Self::from_records(store.load()?)
    }

    pub fn save(&self, store: &dyn CorpusStore) -> Result<(), StoreError> {
        store.save(&self.records)
    }

    pub fn records(&self) -> &[FaceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.records.first().map(FaceRecord::dimension)
    }

    /// True if at least one face from `image_id` is already stored.
    pub fn contains_image(&self, image_id: &str) -> bool {
        self.images.contains(image_id)
    }

    /// Detects faces in one image and appends them.
    ///
    /// Returns the newly appended records. On error nothing is appended.
    pub fn ingest(
        &mut self,
        image_id: &str,
        bytes: &[u8],
        detector: &mut dyn FaceDetector,
    ) -> Result<&[FaceRecord], IngestError> {
        let detections = detect_faces(image_id, bytes, detector)?;
        self.append(image_id, detections)
    }

    /// Appends detections that were computed elsewhere (e.g. on a worker).
    ///
    /// All-or-nothing: a non-finite embedding or a dimension mismatch in any
    /// detection rejects the batch.
    pub fn append(
        &mut self,
        image_id: &str,
        detections: Vec<Detection>,
    ) -> Result<&[FaceRecord], IngestError> {
        if detections.iter().any(|d| !is_finite(&d.embedding)) {
            return Err(IngestError::NonFiniteEmbedding {
                image_id: image_id.to_string(),
            });
        }
        let expected = self
            .dimension()
            .or_else(|| detections.first().map(|d| d.embedding.len()));
        if let Some(expected) = expected {
            if let Some(bad) = detections.iter().find(|d| d.embedding.len() != expected) {
                return Err(IngestError::DimensionMismatch {
                    image_id: image_id.to_string(),
                    expected,
                    found: bad.embedding.len(),
                });
            }
        }

        let start = self.records.len();
        for detection in detections {
            self.records
                .push(FaceRecord::new(image_id, detection.bbox, detection.embedding));
        }
        if self.records.len() > start {
            self.images.insert(image_id.to_string());
        }
        Ok(&self.records[start..])
    }
}
