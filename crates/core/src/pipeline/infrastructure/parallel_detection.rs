use std::collections::BTreeMap;
use std::thread;

use crate::corpus::domain::embedding_repository::{detect_faces, IngestError};
use crate::detection::domain::face_detector::{Detection, FaceDetector};
use crate::imaging::domain::image_source::ImageSource;

const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Detection result for one image of a batch.
pub struct DetectionOutcome {
    pub index: usize,
    pub image_id: String,
    pub result: Result<Vec<Detection>, IngestError>,
}

/// Runs read → decode → detect over `image_ids` with one thread per detector.
///
/// Layout: `feeder → N detector workers → caller`. Workers pull jobs from a
/// shared channel, so a slow image does not stall the others. Outcomes are
/// re-sequenced before `on_outcome` sees them, so the caller always observes
/// input order whatever the worker count.
pub fn detect_in_parallel<F>(
    source: &dyn ImageSource,
    image_ids: &[String],
    detectors: &mut [Box<dyn FaceDetector>],
    mut on_outcome: F,
) where
    F: FnMut(DetectionOutcome),
{
    let cap = DEFAULT_CHANNEL_CAPACITY.max(detectors.len() * 2);
    let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, &str)>(cap);
    let (outcome_tx, outcome_rx) = crossbeam_channel::bounded::<DetectionOutcome>(cap);

    thread::scope(|s| {
        for detector in detectors.iter_mut() {
            let job_rx = job_rx.clone();
            let outcome_tx = outcome_tx.clone();
            s.spawn(move || {
                for (index, image_id) in job_rx {
                    let result = read_and_detect(source, image_id, detector.as_mut());
                    let outcome = DetectionOutcome {
                        index,
                        image_id: image_id.to_string(),
                        result,
                    };
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(outcome_tx);

        s.spawn(move || {
            for (index, image_id) in image_ids.iter().enumerate() {
                if job_tx.send((index, image_id.as_str())).is_err() {
                    break;
                }
            }
        });

        let mut pending: BTreeMap<usize, DetectionOutcome> = BTreeMap::new();
        let mut next = 0;
        for outcome in outcome_rx {
            pending.insert(outcome.index, outcome);
            while let Some(ready) = pending.remove(&next) {
                on_outcome(ready);
                next += 1;
            }
        }
    });
}

fn read_and_detect(
    source: &dyn ImageSource,
    image_id: &str,
    detector: &mut dyn FaceDetector,
) -> Result<Vec<Detection>, IngestError> {
    let bytes = source
        .read(image_id)
        .map_err(|e| IngestError::ImageUnreadable {
            image_id: image_id.to_string(),
            reason: e.to_string(),
        })?;
    detect_faces(image_id, &bytes, detector)
}
