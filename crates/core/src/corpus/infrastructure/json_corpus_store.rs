use std::path::PathBuf;

use crate::corpus::domain::corpus_store::CorpusStore;
use crate::shared::face_record::FaceRecord;
use crate::shared::json_store::{self, StoreError};

/// Corpus snapshot as a JSON array of `{filename, bbox, embedding}` objects.
pub struct JsonCorpusStore {
    path: PathBuf,
}

impl JsonCorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusStore for JsonCorpusStore {
    fn load(&self) -> Result<Vec<FaceRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        json_store::read_json(&self.path)
    }

    fn save(&self, records: &[FaceRecord]) -> Result<(), StoreError> {
        json_store::write_json(&self.path, records)?;
        log::debug!("Saved {} face records to {}", records.len(), self.path.display());
        Ok(())
    }
}
