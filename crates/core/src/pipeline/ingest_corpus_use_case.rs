use std::time::Instant;

use crate::corpus::domain::corpus_store::CorpusStore;
use crate::corpus::domain::embedding_repository::{EmbeddingRepository, IngestError};
use crate::detection::domain::face_detector::FaceDetector;
use crate::imaging::domain::image_source::ImageSource;
use crate::pipeline::infrastructure::parallel_detection::{detect_in_parallel, DetectionOutcome};
use crate::pipeline::pipeline_logger::{
    PipelineLogger, DETECTION_FAILURES, FACES_DETECTED, FACES_REJECTED, IMAGES_ALREADY_INGESTED,
    IMAGES_PROCESSED, IMAGES_UNREADABLE, IMAGES_WITHOUT_FACES,
};

/// Counts from one ingestion run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub images_found: usize,
    pub images_already_ingested: usize,
    pub images_processed: usize,
    pub images_failed: usize,
    pub faces_added: usize,
    pub total_faces: usize,
}

/// Batch ingestion: list → skip known → detect (parallel) → append → save.
///
/// One worker thread per detector. Faces are appended in image listing
/// order whatever the worker count, so the corpus and hence clustering are
/// reproducible. Per-image failures are logged, counted and skipped.
pub struct IngestCorpusUseCase {
    source: Box<dyn ImageSource>,
    store: Box<dyn CorpusStore>,
    detectors: Vec<Box<dyn FaceDetector>>,
    logger: Box<dyn PipelineLogger>,
}

impl IngestCorpusUseCase {
    pub fn new(
        source: Box<dyn ImageSource>,
        store: Box<dyn CorpusStore>,
        detectors: Vec<Box<dyn FaceDetector>>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            store,
            detectors,
            logger,
        }
    }

    pub fn execute(&mut self) -> Result<IngestReport, Box<dyn std::error::Error>> {
        if self.detectors.is_empty() {
            return Err("ingestion needs at least one detector".into());
        }
        let Self {
            source,
            store,
            detectors,
            logger,
        } = self;

        let mut repository = EmbeddingRepository::load(store.as_ref())?;
        let listed = source.list()?;
        let mut report = IngestReport {
            images_found: listed.len(),
            ..IngestReport::default()
        };

        let pending: Vec<String> = listed
            .into_iter()
            .filter(|id| !repository.contains_image(id))
            .collect();
        report.images_already_ingested = report.images_found - pending.len();
        logger.count(IMAGES_ALREADY_INGESTED, report.images_already_ingested);
        logger.info(&format!(
            "Ingesting {} images ({} already in corpus) with {} workers",
            pending.len(),
            report.images_already_ingested,
            detectors.len()
        ));

        let started = Instant::now();
        let total = pending.len();
        let mut done = 0;
        detect_in_parallel(source.as_ref(), &pending, detectors, |outcome| {
            done += 1;
            record_outcome(&mut repository, outcome, logger.as_mut(), &mut report);
            logger.progress(done, total);
        });
        logger.timing("detect", started.elapsed().as_secs_f64() * 1000.0);

        repository.save(store.as_ref())?;
        report.total_faces = repository.len();
        logger.info(&format!(
            "Corpus now holds {} faces ({} new)",
            report.total_faces, report.faces_added
        ));
        logger.summary();
        Ok(report)
    }
}

fn record_outcome(
    repository: &mut EmbeddingRepository,
    outcome: DetectionOutcome,
    logger: &mut dyn PipelineLogger,
    report: &mut IngestReport,
) {
    let appended = outcome
        .result
        .and_then(|detections| repository.append(&outcome.image_id, detections).map(<[_]>::len));

    match appended {
        Ok(0) => {
            report.images_processed += 1;
            logger.count(IMAGES_PROCESSED, 1);
            logger.count(IMAGES_WITHOUT_FACES, 1);
        }
        Ok(faces) => {
            report.images_processed += 1;
            report.faces_added += faces;
            logger.count(IMAGES_PROCESSED, 1);
            logger.count(FACES_DETECTED, faces);
        }
        Err(e) => {
            report.images_failed += 1;
            let counter = match e {
                IngestError::ImageUnreadable { .. } => IMAGES_UNREADABLE,
                IngestError::Detection { .. } => DETECTION_FAILURES,
                IngestError::DimensionMismatch { .. } | IngestError::NonFiniteEmbedding { .. } => {
                    FACES_REJECTED
                }
            };
            logger.skipped(counter, &format!("Skipping {}: {e}", outcome.image_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::recording::RecordingLogger;
    use crate::pipeline::test_support::{
        colour_png, MemoryCorpusStore, MemoryImageSource, PixelDetector,
    };
    use crate::shared::face_record::{BoundingBox, FaceRecord};
    use std::sync::{Arc, Mutex};

    fn detectors(n: usize) -> Vec<Box<dyn FaceDetector>> {
        (0..n)
            .map(|_| Box::new(PixelDetector::default()) as Box<dyn FaceDetector>)
            .collect()
    }

    fn use_case(
        images: Vec<(String, Vec<u8>)>,
        store: &MemoryCorpusStore,
        workers: usize,
        logger: &RecordingLogger,
    ) -> IngestCorpusUseCase {
        IngestCorpusUseCase::new(
            Box::new(MemoryImageSource::new(images)),
            Box::new(store.clone()),
            detectors(workers),
            Box::new(logger.clone()),
        )
    }

    fn mixed_batch() -> Vec<(String, Vec<u8>)> {
        vec![
            ("a.png".into(), colour_png([10, 20, 30])),
            ("b.png".into(), colour_png([255, 0, 0])),
            ("c.png".into(), b"garbage".to_vec()),
            ("d.png".into(), colour_png([1, 2, 255])),
            ("e.png".into(), colour_png([254, 0, 0])),
            ("f.png".into(), colour_png([40, 50, 60])),
        ]
    }

    #[test]
    fn test_failures_are_counted_and_skipped() {
        let store = MemoryCorpusStore::default();
        let logger = RecordingLogger::default();

        let report = use_case(mixed_batch(), &store, 2, &logger)
            .execute()
            .unwrap();

        assert_eq!(
            report,
            IngestReport {
                images_found: 6,
                images_already_ingested: 0,
                images_processed: 4,
                images_failed: 2,
                faces_added: 4,
                total_faces: 4,
            }
        );
        assert_eq!(logger.counter(IMAGES_UNREADABLE), 1);
        assert_eq!(logger.counter(DETECTION_FAILURES), 1);
        assert_eq!(logger.counter(IMAGES_WITHOUT_FACES), 1);
        assert_eq!(logger.counter(FACES_DETECTED), 4);
        assert_eq!(logger.skipped.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_records_follow_listing_order() {
        let store = MemoryCorpusStore::default();
        use_case(mixed_batch(), &store, 3, &RecordingLogger::default())
            .execute()
            .unwrap();

        let records = store.records.lock().unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "d.png", "d.png", "f.png"]);
        assert_eq!(records[0].embedding, vec![10.0, 20.0, 31.0]);
        assert_eq!(records[1].embedding, vec![1.0, 2.0, 1.0]);
        assert_eq!(records[2].embedding, vec![2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_worker_count_does_not_change_corpus() {
        let one = MemoryCorpusStore::default();
        let four = MemoryCorpusStore::default();
        use_case(mixed_batch(), &one, 1, &RecordingLogger::default())
            .execute()
            .unwrap();
        use_case(mixed_batch(), &four, 4, &RecordingLogger::default())
            .execute()
            .unwrap();
        assert_eq!(*one.records.lock().unwrap(), *four.records.lock().unwrap());
    }

    #[test]
    fn test_known_images_are_not_detected_again() {
        let store = MemoryCorpusStore::default();
        store.records.lock().unwrap().push(FaceRecord::new(
            "a.png",
            BoundingBox::new(0.0, 0.0, 5.0, 5.0),
            vec![9.0, 9.0, 9.0],
        ));
        let calls = Arc::new(Mutex::new(0));
        let detector = PixelDetector {
            calls: Arc::clone(&calls),
        };
        let images = vec![
            ("a.png".to_string(), colour_png([10, 20, 30])),
            ("z.png".to_string(), colour_png([70, 80, 90])),
        ];

        let report = IngestCorpusUseCase::new(
            Box::new(MemoryImageSource::new(images)),
            Box::new(store.clone()),
            vec![Box::new(detector)],
            Box::new(RecordingLogger::default()),
        )
        .execute()
        .unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(report.images_already_ingested, 1);
        assert_eq!(report.total_faces, 2);
        let records = store.records.lock().unwrap();
        assert_eq!(records[0].embedding, vec![9.0, 9.0, 9.0]);
        assert_eq!(records[1].filename, "z.png");
    }

    #[test]
    fn test_dimension_mismatch_rejects_image() {
        let store = MemoryCorpusStore::default();
        store.records.lock().unwrap().push(FaceRecord::new(
            "old.png",
            BoundingBox::new(0.0, 0.0, 5.0, 5.0),
            vec![1.0, 0.0],
        ));
        let logger = RecordingLogger::default();
        let images = vec![("new.png".to_string(), colour_png([10, 20, 30]))];

        let report = use_case(images, &store, 1, &logger).execute().unwrap();

        assert_eq!(report.images_failed, 1);
        assert_eq!(report.total_faces, 1);
        assert_eq!(logger.counter(FACES_REJECTED), 1);
    }

    #[test]
    fn test_non_finite_embedding_rejects_image() {
        let store = MemoryCorpusStore::default();
        let logger = RecordingLogger::default();
        let images = vec![
            ("a.png".to_string(), colour_png([10, 20, 30])),
            ("nan.png".to_string(), colour_png([253, 20, 30])),
        ];

        let report = use_case(images, &store, 2, &logger).execute().unwrap();

        assert_eq!(report.images_failed, 1);
        assert_eq!(report.total_faces, 1);
        assert_eq!(logger.counter(FACES_REJECTED), 1);
        let records = store.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r.embedding.iter().all(|x| x.is_finite())));
    }

    #[test]
    fn test_progress_reaches_total() {
        let logger = RecordingLogger::default();
        use_case(mixed_batch(), &MemoryCorpusStore::default(), 2, &logger)
            .execute()
            .unwrap();
        let progress = logger.progress.lock().unwrap();
        assert_eq!(progress.len(), 6);
        assert_eq!(progress.last(), Some(&(6, 6)));
    }

    #[test]
    fn test_requires_a_detector() {
        let result = use_case(mixed_batch(), &MemoryCorpusStore::default(), 0, &Default::default())
            .execute();
        assert!(result.is_err());
    }
}
