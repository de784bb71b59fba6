use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::clustering::domain::cluster_assignment::ClusterId;
use crate::imaging::domain::image_source::ImageSource;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::imaging::infrastructure::image_decoder::decode_rgb;
use crate::pipeline::pipeline_logger::{PipelineLogger, THUMBNAILS_SKIPPED, THUMBNAILS_WRITTEN};
use crate::registry::domain::cluster::Cluster;
use crate::registry::domain::cluster_registry::ClusterRegistry;
use crate::registry::domain::registry_store::RegistryStore;
use crate::thumbnails::domain::thumbnail_extractor::{extract, ThumbnailError};

/// File name of a cluster's thumbnail inside the output directory.
pub fn thumbnail_file_name(id: ClusterId) -> String {
    format!("person_{id}.jpg")
}

/// Writes one display crop per cluster and records the paths in the registry.
///
/// A cluster whose crop fails (source gone, degenerate box, write error) is
/// counted and skipped; the rest of the batch carries on.
pub struct ExtractThumbnailsUseCase {
    source: Box<dyn ImageSource>,
    writer: Box<dyn ImageWriter>,
    registry_store: Box<dyn RegistryStore>,
    output_dir: PathBuf,
    size: Option<u32>,
    logger: Box<dyn PipelineLogger>,
}

impl ExtractThumbnailsUseCase {
    pub fn new(
        source: Box<dyn ImageSource>,
        writer: Box<dyn ImageWriter>,
        registry_store: Box<dyn RegistryStore>,
        output_dir: PathBuf,
        size: Option<u32>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            writer,
            registry_store,
            output_dir,
            size,
            logger,
        }
    }

    pub fn execute(&mut self) -> Result<ClusterRegistry, Box<dyn std::error::Error>> {
        let registry = self.registry_store.load()?;
        let total = registry.len();
        let mut written = BTreeMap::new();

        for (done, cluster) in registry.clusters().enumerate() {
            let path = self.output_dir.join(thumbnail_file_name(cluster.id));
            match self.write_thumbnail(cluster, &path) {
                Ok(()) => {
                    self.logger.count(THUMBNAILS_WRITTEN, 1);
                    written.insert(cluster.id, path);
                }
                Err(e) => self.logger.skipped(
                    THUMBNAILS_SKIPPED,
                    &format!("No thumbnail for cluster {}: {e}", cluster.id),
                ),
            }
            self.logger.progress(done + 1, total);
        }

        let count = written.len();
        let registry = registry.with_thumbnails(written);
        self.registry_store.save(&registry)?;
        self.logger.info(&format!(
            "Wrote {count} of {total} thumbnails to {}",
            self.output_dir.display()
        ));
        self.logger.summary();
        Ok(registry)
    }

    fn write_thumbnail(
        &self,
        cluster: &Cluster,
        path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let filename = &cluster.exemplar.filename;
        let missing = |reason: String| ThumbnailError::SourceMissing {
            filename: filename.clone(),
            reason,
        };
        let bytes = self
            .source
            .read(filename)
            .map_err(|e| missing(e.to_string()))?;
        let image = decode_rgb(&bytes).map_err(|e| missing(e.to_string()))?;
        let crop = extract(cluster, &image)?;
        self.writer
            .write(path, &crop, self.size.map(|edge| (edge, edge)))
    }
}
