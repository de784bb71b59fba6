//! In-memory adapters shared by the pipeline tests.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::{Arc, Mutex};

use crate::clustering::domain::cluster_assignment::ClusterId;
use crate::corpus::domain::corpus_store::CorpusStore;
use crate::detection::domain::face_detector::{Detection, DetectionError, FaceDetector};
use crate::imaging::domain::image_source::ImageSource;
use crate::imaging::infrastructure::image_decoder::encode_png;
use crate::registry::domain::cluster_registry::ClusterRegistry;
use crate::registry::domain::registry_store::RegistryStore;
use crate::shared::face_record::{BoundingBox, FaceRecord};
use crate::shared::json_store::StoreError;
use crate::shared::raster::Raster;

/// 20×20 PNG filled with one colour.
pub fn colour_png(rgb: [u8; 3]) -> Vec<u8> {
    encode_png(&Raster::new(rgb.repeat(400), 20, 20, 3))
}

pub struct MemoryImageSource {
    images: BTreeMap<String, Vec<u8>>,
}

impl MemoryImageSource {
    pub fn new(images: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            images: images.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, image_id: &str, bytes: Vec<u8>) {
        self.images.insert(image_id.to_string(), bytes);
    }
}

impl ImageSource for MemoryImageSource {
    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.images.keys().cloned().collect())
    }

    fn read(&self, image_id: &str) -> io::Result<Vec<u8>> {
        self.images
            .get(image_id)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, image_id.to_string()))
    }
}

/// Derives faces from the top-left pixel, so tests control detections
/// through image colour:
///
/// - red 255: no face
/// - red 254: detector error
/// - red 253: one face with a NaN embedding
/// - blue 255: two faces
/// - otherwise one face with embedding `[r, g, b + 1]`
#[derive(Default)]
pub struct PixelDetector {
    pub calls: Arc<Mutex<usize>>,
}

impl FaceDetector for PixelDetector {
    fn detect(&mut self, image: &Raster) -> Result<Vec<Detection>, DetectionError> {
        *self.calls.lock().unwrap() += 1;
        let [r, g, b] = [image.data()[0], image.data()[1], image.data()[2]];
        let face = |embedding: Vec<f32>| Detection {
            bbox: BoundingBox::new(2.0, 3.0, 12.0, 15.0),
            confidence: 0.9,
            embedding,
        };
        match (r, b) {
            (255, _) => Ok(Vec::new()),
            (254, _) => Err(DetectionError::Inference("model crashed".into())),
            (253, _) => Ok(vec![face(vec![f32::NAN, g as f32, b as f32 + 1.0])]),
            (_, 255) => Ok(vec![
                face(vec![r as f32, g as f32, 1.0]),
                face(vec![g as f32, r as f32, 1.0]),
            ]),
            _ => Ok(vec![face(vec![r as f32, g as f32, b as f32 + 1.0])]),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryCorpusStore {
    pub records: Arc<Mutex<Vec<FaceRecord>>>,
}

impl CorpusStore for MemoryCorpusStore {
    fn load(&self) -> Result<Vec<FaceRecord>, StoreError> {
        Ok(self.records.lock().unwrap().clone())
    }

    fn save(&self, records: &[FaceRecord]) -> Result<(), StoreError> {
        *self.records.lock().unwrap() = records.to_vec();
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryRegistryStore {
    pub registry: Arc<Mutex<Option<ClusterRegistry>>>,
}

impl RegistryStore for MemoryRegistryStore {
    fn save(&self, registry: &ClusterRegistry) -> Result<(), StoreError> {
        *self.registry.lock().unwrap() = Some(registry.clone());
        Ok(())
    }

    fn load(&self) -> Result<ClusterRegistry, StoreError> {
        self.registry
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| StoreError::Format("no registry saved".into()))
    }

    fn load_members(&self) -> Result<BTreeMap<ClusterId, BTreeSet<String>>, StoreError> {
        Ok(self
            .load()?
            .members()
            .into_iter()
            .map(|(id, members)| (id, members.clone()))
            .collect())
    }
}
