use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

pub const IMAGES_PROCESSED: &str = "images_processed";
pub const IMAGES_ALREADY_INGESTED: &str = "images_already_ingested";
pub const IMAGES_UNREADABLE: &str = "images_unreadable";
pub const IMAGES_WITHOUT_FACES: &str = "images_without_faces";
pub const DETECTION_FAILURES: &str = "detection_failures";
pub const FACES_DETECTED: &str = "faces_detected";
pub const FACES_REJECTED: &str = "faces_rejected";
pub const CLUSTERS: &str = "clusters";
pub const THUMBNAILS_WRITTEN: &str = "thumbnails_written";
pub const THUMBNAILS_SKIPPED: &str = "thumbnails_skipped";

/// Observer for batch runs: ingestion, clustering and thumbnailing.
///
/// Per-item failures are reported through [`skipped`](Self::skipped) and
/// never stop a batch; the counters let a caller see how much was lost.
pub trait PipelineLogger: Send {
    /// Report item-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Add `by` to a named counter.
    fn count(&mut self, counter: &str, by: usize);

    fn info(&mut self, message: &str);

    /// An item was dropped from the batch: bump `counter` and say why.
    fn skipped(&mut self, counter: &str, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. For tests and embedding callers.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn count(&mut self, _counter: &str, _by: usize) {}
    fn info(&mut self, _message: &str) {}
    fn skipped(&mut self, _counter: &str, _message: &str) {}
}

/// CLI logger: throttled progress through `log`, with timings and counters
/// collected for a summary at the end.
pub struct StdoutPipelineLogger {
    throttle: usize,
    timings: HashMap<String, Vec<f64>>,
    counters: BTreeMap<String, usize>,
    start_time: Instant,
    total_items: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle: usize) -> Self {
        Self {
            throttle: throttle.max(1),
            timings: HashMap::new(),
            counters: BTreeMap::new(),
            start_time: Instant::now(),
            total_items: 0,
        }
    }

    pub fn counter(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.counters.is_empty() {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Run summary ({} items, {elapsed:.1}s total):",
            self.total_items
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:8.1}ms  total {total_ms:8.0}ms"
            ));
        }
        for (name, value) in &self.counters {
            lines.push(format!("  {name}: {value}"));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(25)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_items = total;
        if total > 0 && (current % self.throttle == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} images ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn count(&mut self, counter: &str, by: usize) {
        *self.counters.entry(counter.to_string()).or_default() += by;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn skipped(&mut self, counter: &str, message: &str) {
        self.count(counter, 1);
        log::warn!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
