use std::time::Instant;

use crate::clustering::domain::clustering_params::ClusteringParams;
use crate::clustering::domain::face_clusterer::FaceClusterer;
use crate::corpus::domain::corpus_store::CorpusStore;
use crate::corpus::domain::embedding_repository::EmbeddingRepository;
use crate::pipeline::pipeline_logger::{PipelineLogger, CLUSTERS};
use crate::registry::domain::cluster_registry::ClusterRegistry;
use crate::registry::domain::registry_store::RegistryStore;
use crate::registry::domain::representative_policy::RepresentativePolicy;

/// Full registry rebuild: load corpus → cluster → summarise → persist.
///
/// Returns the new registry so a running service can publish it.
pub struct ClusterCorpusUseCase {
    corpus: Box<dyn CorpusStore>,
    clusterer: Box<dyn FaceClusterer>,
    registry_store: Box<dyn RegistryStore>,
    params: ClusteringParams,
    policy: RepresentativePolicy,
    logger: Box<dyn PipelineLogger>,
}

impl ClusterCorpusUseCase {
    pub fn new(
        corpus: Box<dyn CorpusStore>,
        clusterer: Box<dyn FaceClusterer>,
        registry_store: Box<dyn RegistryStore>,
        params: ClusteringParams,
        policy: RepresentativePolicy,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            corpus,
            clusterer,
            registry_store,
            params,
            policy,
            logger,
        }
    }

    pub fn execute(&mut self) -> Result<ClusterRegistry, Box<dyn std::error::Error>> {
        let repository = EmbeddingRepository::load(self.corpus.as_ref())?;
        self.logger.info(&format!(
            "Clustering {} faces (epsilon={}, min_points={}, policy={})",
            repository.len(),
            self.params.epsilon,
            self.params.min_points,
            self.policy
        ));

        let started = Instant::now();
        let assignment = self.clusterer.cluster(repository.records(), &self.params)?;
        self.logger
            .timing("cluster", started.elapsed().as_secs_f64() * 1000.0);

        let started = Instant::now();
        let registry = ClusterRegistry::build(repository.records(), &assignment, self.policy)?
            .with_clustering_params(self.params);
        self.registry_store.save(&registry)?;
        self.logger
            .timing("registry", started.elapsed().as_secs_f64() * 1000.0);

        let singletons = registry.clusters().filter(|c| c.face_count() == 1).count();
        self.logger.count(CLUSTERS, registry.len());
        self.logger.info(&format!(
            "Found {} clusters ({singletons} single-face) across {} faces",
            registry.len(),
            registry.face_count()
        ));
        self.logger.summary();
        Ok(registry)
    }
}
