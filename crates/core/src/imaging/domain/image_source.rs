/// A corpus of source images addressed by identifier (the base filename).
///
/// Both ingestion and thumbnailing read through this, so tests can serve
/// images from memory.
pub trait ImageSource: Send + Sync {
    /// All image identifiers, in a stable order.
    fn list(&self) -> std::io::Result<Vec<String>>;

    /// Raw, still-encoded bytes of one image.
    fn read(&self, image_id: &str) -> std::io::Result<Vec<u8>>;
}
