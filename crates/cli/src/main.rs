use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use facefind_core::clustering::infrastructure::dbscan_clusterer::DbscanClusterer;
use facefind_core::corpus::infrastructure::json_corpus_store::JsonCorpusStore;
use facefind_core::detection::domain::face_detector::FaceDetector;
use facefind_core::detection::infrastructure::model_resolver::{self, ModelPaths};
use facefind_core::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use facefind_core::imaging::infrastructure::directory_image_source::DirectoryImageSource;
use facefind_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use facefind_core::matching::domain::match_engine::{MatchEngine, MatchResult};
use facefind_core::pipeline::cluster_corpus_use_case::ClusterCorpusUseCase;
use facefind_core::pipeline::extract_thumbnails_use_case::ExtractThumbnailsUseCase;
use facefind_core::pipeline::face_search_service::{FaceSearchService, SearchError};
use facefind_core::pipeline::ingest_corpus_use_case::IngestCorpusUseCase;
use facefind_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facefind_core::registry::domain::registry_store::RegistryStore;
use facefind_core::registry::domain::representative_policy::RepresentativePolicy;
use facefind_core::registry::infrastructure::json_registry_store::JsonRegistryStore;
use facefind_core::shared::config::FaceFindConfig;
use facefind_core::shared::constants::CORPUS_FILE_NAME;

/// Group a photo collection by the people in it, and find a person's photos.
#[derive(Parser)]
#[command(name = "facefind", version)]
struct Cli {
    /// Config file (default: <config dir>/FaceFind/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the face corpus and cluster registry.
    #[arg(long, global = true, default_value = "facefind-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect and embed every face in the images under a directory.
    Ingest {
        /// Image directory, searched recursively.
        images: PathBuf,

        /// Parallel detector instances.
        #[arg(long)]
        workers: Option<usize>,

        /// Face detection confidence threshold (0.0-1.0).
        #[arg(long)]
        confidence: Option<f64>,

        /// Directory with pre-downloaded ONNX models.
        #[arg(long)]
        models: Option<PathBuf>,
    },
    /// Cluster the corpus into identities and rebuild the registry.
    Cluster {
        /// Maximum cosine distance between neighbouring faces.
        #[arg(long)]
        epsilon: Option<f64>,

        /// Neighbourhood size (self included) for a core face.
        #[arg(long)]
        min_points: Option<usize>,

        /// Representative policy: centroid or first_member.
        #[arg(long)]
        policy: Option<RepresentativePolicy>,
    },
    /// Write one face thumbnail per cluster.
    Thumbnails {
        /// Image directory the corpus was ingested from.
        images: PathBuf,

        /// Output directory (default: <data dir>/thumbnails).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Resize thumbnails to this square edge length.
        #[arg(long)]
        size: Option<u32>,
    },
    /// Find the cluster a face belongs to; prints JSON.
    Match {
        /// Query image; its most confident face is matched.
        #[arg(required_unless_present = "embedding")]
        image: Option<PathBuf>,

        /// JSON file holding a query embedding instead of an image.
        #[arg(long, conflicts_with = "image")]
        embedding: Option<PathBuf>,

        /// Reject matches scoring below this (-1.0 to 1.0).
        #[arg(long)]
        min_score: Option<f64>,

        /// Directory with pre-downloaded ONNX models.
        #[arg(long)]
        models: Option<PathBuf>,
    },
    /// List clusters, or the member images of one cluster.
    Show {
        #[arg(long)]
        cluster: Option<u32>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = FaceFindConfig::load(cli.config.as_deref());
    let data_dir = cli.data_dir;

    match cli.command {
        Command::Ingest {
            images,
            workers,
            confidence,
            models,
        } => {
            config.workers = workers.unwrap_or(config.workers);
            config.detection_confidence = confidence.unwrap_or(config.detection_confidence);
            config.validate()?;
            run_ingest(&config, &data_dir, &images, models.as_deref())
        }
        Command::Cluster {
            epsilon,
            min_points,
            policy,
        } => {
            config.epsilon = epsilon.unwrap_or(config.epsilon);
            config.min_points = min_points.unwrap_or(config.min_points);
            config.representative_policy = policy.unwrap_or(config.representative_policy);
            config.validate()?;
            run_cluster(&config, &data_dir)
        }
        Command::Thumbnails {
            images,
            output,
            size,
        } => {
            config.thumbnail_size = size.or(config.thumbnail_size);
            config.validate()?;
            let output = output.unwrap_or_else(|| data_dir.join("thumbnails"));
            run_thumbnails(&config, &data_dir, &images, output)
        }
        Command::Match {
            image,
            embedding,
            min_score,
            models,
        } => {
            config.minimum_acceptable_score = min_score.or(config.minimum_acceptable_score);
            config.validate()?;
            run_match(&config, &data_dir, image, embedding, models.as_deref())
        }
        Command::Show { cluster } => run_show(&data_dir, cluster),
    }
}

fn run_ingest(
    config: &FaceFindConfig,
    data_dir: &Path,
    images: &Path,
    models: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = DirectoryImageSource::open(images)
        .map_err(|e| format!("Cannot read image directory {}: {e}", images.display()))?;
    let paths = resolve_models(models)?;
    let intra_threads = intra_threads_per_worker(config.workers);
    let detectors = (0..config.workers)
        .map(|_| build_detector(&paths, config.detection_confidence, intra_threads))
        .collect::<Result<Vec<_>, _>>()?;

    let report = IngestCorpusUseCase::new(
        Box::new(source),
        Box::new(JsonCorpusStore::new(data_dir.join(CORPUS_FILE_NAME))),
        detectors,
        Box::new(StdoutPipelineLogger::default()),
    )
    .execute()?;

    log::info!(
        "Ingested {} of {} images ({} failed, {} already present); corpus holds {} faces",
        report.images_processed,
        report.images_found,
        report.images_failed,
        report.images_already_ingested,
        report.total_faces
    );
    Ok(())
}

fn run_cluster(config: &FaceFindConfig, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ClusterCorpusUseCase::new(
        Box::new(JsonCorpusStore::new(data_dir.join(CORPUS_FILE_NAME))),
        Box::new(DbscanClusterer::new()),
        Box::new(registry_store(data_dir)),
        config.clustering_params(),
        config.representative_policy,
        Box::new(StdoutPipelineLogger::default()),
    )
    .execute()?;

    log::info!(
        "Registry written to {} ({} clusters)",
        registry_store(data_dir).dir().display(),
        registry.len()
    );
    Ok(())
}

fn run_thumbnails(
    config: &FaceFindConfig,
    data_dir: &Path,
    images: &Path,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = DirectoryImageSource::open(images)
        .map_err(|e| format!("Cannot read image directory {}: {e}", images.display()))?;
    ExtractThumbnailsUseCase::new(
        Box::new(source),
        Box::new(ImageFileWriter::new()),
        Box::new(existing_registry_store(data_dir)?),
        output,
        config.thumbnail_size,
        Box::new(StdoutPipelineLogger::default()),
    )
    .execute()?;
    Ok(())
}

fn run_match(
    config: &FaceFindConfig,
    data_dir: &Path,
    image: Option<PathBuf>,
    embedding: Option<PathBuf>,
    models: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = existing_registry_store(data_dir)?.load()?;
    let engine = MatchEngine::new(config.minimum_acceptable_score);

    let result: Result<MatchResult, SearchError> = match (image, embedding) {
        (_, Some(path)) => {
            let query: Vec<f32> = serde_json::from_slice(&fs::read(&path)?)
                .map_err(|e| format!("{} is not a JSON array of numbers: {e}", path.display()))?;
            engine.find_match(&query, &registry).map_err(SearchError::from)
        }
        (Some(path), None) => {
            let bytes = fs::read(&path)
                .map_err(|e| format!("Cannot read query image {}: {e}", path.display()))?;
            let paths = resolve_models(models)?;
            let threads = intra_threads_per_worker(1);
            let detector = build_detector(&paths, config.detection_confidence, threads)?;
            FaceSearchService::new(detector, registry, engine).search_image(&bytes)
        }
        (None, None) => return Err("Either a query image or --embedding is required".into()),
    };

    match result {
        Ok(found) => {
            println!("{}", serde_json::to_string_pretty(&found)?);
            Ok(())
        }
        Err(e) => {
            let report = serde_json::json!({ "error": e.kind(), "message": e.to_string() });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Err(e.into())
        }
    }
}

fn run_show(data_dir: &Path, cluster: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let store = existing_registry_store(data_dir)?;

    if let Some(id) = cluster {
        let members = store.load_members()?;
        let images = members
            .get(&id)
            .ok_or_else(|| format!("No cluster {id} in registry"))?;
        for filename in images {
            println!("{filename}");
        }
        return Ok(());
    }

    let registry = store.load()?;
    println!(
        "{} clusters over {} faces (policy: {})",
        registry.len(),
        registry.face_count(),
        registry.policy()
    );
    for c in registry.clusters() {
        let thumbnail = c
            .thumbnail
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "{:>6}  {:>5} faces  {:>5} images  {thumbnail}",
            c.id,
            c.face_count(),
            c.members.len()
        );
    }
    Ok(())
}

fn registry_store(data_dir: &Path) -> JsonRegistryStore {
    JsonRegistryStore::new(data_dir.join("registry"))
}

fn existing_registry_store(
    data_dir: &Path,
) -> Result<JsonRegistryStore, Box<dyn std::error::Error>> {
    let store = registry_store(data_dir);
    if !store.exists() {
        return Err(format!(
            "No registry in {}; run `facefind cluster` first",
            store.dir().display()
        )
        .into());
    }
    Ok(store)
}

fn resolve_models(bundled: Option<&Path>) -> Result<ModelPaths, Box<dyn std::error::Error>> {
    log::info!("Resolving face models");
    let paths = model_resolver::resolve_face_models(bundled, Some(&download_progress))?;
    Ok(paths)
}

fn build_detector(
    paths: &ModelPaths,
    confidence: f64,
    intra_threads: usize,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    Ok(Box::new(OnnxFaceDetector::new(
        &paths.detector,
        &paths.embedding,
        confidence,
        intra_threads,
    )?))
}

/// Splits the machine's cores between detector instances.
fn intra_threads_per_worker(workers: usize) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    (cores / workers.max(1)).max(1)
}

fn download_progress(model: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {model}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {model}... {downloaded} bytes");
    }
}
