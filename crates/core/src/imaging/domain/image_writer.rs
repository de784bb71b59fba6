use std::path::Path;

use crate::shared::raster::Raster;

/// Writes a single image to a file.
pub trait ImageWriter: Send + Sync {
    /// Writes `image` to `path`, optionally resizing to `size` first.
    fn write(
        &self,
        path: &Path,
        image: &Raster,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
