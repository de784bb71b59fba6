use crate::shared::face_record::FaceRecord;
use crate::shared::json_store::StoreError;

/// Durable home of the corpus snapshot.
///
/// `load(save(records))` must reproduce every embedding bit-for-bit.
pub trait CorpusStore: Send + Sync {
    /// Records in their saved order. A store that was never written is empty.
    fn load(&self) -> Result<Vec<FaceRecord>, StoreError>;

    fn save(&self, records: &[FaceRecord]) -> Result<(), StoreError>;
}
