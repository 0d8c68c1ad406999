//! One scan-and-report pass over all targets.
//!
//! Every target is scanned independently: a failing scan or an invalid point
//! only skips that target. All points of a cycle share one timestamp and are
//! written with a single sink call, or dropped entirely in dry-run mode.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, trace, warn};

use crate::collector::scanner::{ScanError, TreeScanner};
use crate::collector::traits::FileSystem;
use crate::fmt::format_bytes;
use crate::model::{
    Batch, MEASUREMENT, MetricPoint, PointError, ScanTarget, SizeSample, TagSet, derived_tags,
    merge_tag_sets,
};
use crate::sink::{MetricSink, SinkError};

/// Outcome of one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Points built from successful scans.
    pub points: usize,
    /// Points accepted by the sink. Zero in dry-run mode or on sink failure.
    pub sent: usize,
    /// Targets dropped because of a scan or point error.
    pub skipped: usize,
    pub dry_run: bool,
    pub sink_error: Option<SinkError>,
    pub elapsed: Duration,
}

/// Scans targets and reports their sizes to a sink.
pub struct ScanCycle<F: FileSystem, S: MetricSink> {
    scanner: TreeScanner<F>,
    sink: S,
    database: String,
    retention_policy: Option<String>,
    static_tags: TagSet,
    dry_run: bool,
}

impl<F: FileSystem, S: MetricSink> ScanCycle<F, S> {
    pub fn new(scanner: TreeScanner<F>, sink: S, database: impl Into<String>) -> Self {
        Self {
            scanner,
            sink,
            database: database.into(),
            retention_policy: None,
            static_tags: TagSet::new(),
            dry_run: false,
        }
    }

    /// Static tags added to every point; derived and set tags override them.
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.static_tags = tags;
        self
    }

    pub fn with_retention_policy(mut self, retention_policy: Option<String>) -> Self {
        self.retention_policy = retention_policy;
        self
    }

    /// In dry-run mode batches are built and logged but never sent.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs one cycle stamped with the current time.
    pub fn run_once(&mut self, targets: &[ScanTarget]) -> Report {
        self.run_once_at(targets, Utc::now())
    }

    /// Runs one cycle; every point gets timestamp `at`.
    pub fn run_once_at(&mut self, targets: &[ScanTarget], at: DateTime<Utc>) -> Report {
        let started = Instant::now();
        let mut report = Report {
            dry_run: self.dry_run,
            ..Report::default()
        };

        let results = self.scan_all(targets, at);

        let mut batch = Batch::new(self.database.clone(), self.retention_policy.clone());
        for (target, result) in results {
            let sample = match result {
                Ok(sample) => sample,
                Err(e) => {
                    warn!(
                        "Skipping {} ({}): scan failed: {}",
                        target.mapping.label,
                        target.mapping.path.display(),
                        e
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            debug!(
                "{}: {} ({})",
                sample.mapping.label,
                sample.bytes,
                format_bytes(sample.bytes)
            );

            match self.build_point(target, &sample) {
                Ok(point) => batch.add_point(point),
                Err(e) => {
                    warn!(
                        "Skipping {}: cannot build point: {}",
                        target.mapping.label, e
                    );
                    report.skipped += 1;
                }
            }
        }
        report.points = batch.len();

        self.deliver(&batch, &mut report);

        report.elapsed = started.elapsed();
        info!(
            "Cycle done in {:.2?}: {} points, {} sent, {} skipped{}",
            report.elapsed,
            report.points,
            report.sent,
            report.skipped,
            if report.dry_run { " (dry run)" } else { "" }
        );
        report
    }

    /// Scans every target in order, keeping each result next to its target.
    fn scan_all<'t>(
        &self,
        targets: &'t [ScanTarget],
        at: DateTime<Utc>,
    ) -> Vec<(&'t ScanTarget, Result<SizeSample, ScanError>)> {
        trace!("Starting scan of {} targets", targets.len());
        let results = targets
            .iter()
            .map(|target| {
                let result = self
                    .scanner
                    .scan_size(&target.mapping.path)
                    .map(|bytes| SizeSample {
                        mapping: target.mapping.clone(),
                        bytes,
                        observed_at: at,
                    });
                (target, result)
            })
            .collect();
        trace!("Finished scan of {} targets", targets.len());
        results
    }

    fn build_point(
        &self,
        target: &ScanTarget,
        sample: &SizeSample,
    ) -> Result<MetricPoint, PointError> {
        let derived = derived_tags(&sample.mapping.label);
        let set_tag: TagSet = target
            .set
            .iter()
            .map(|name| ("set".to_string(), name.clone()))
            .collect();
        let tags = merge_tag_sets(&[&self.static_tags, &target.tags, &derived, &set_tag]);
        MetricPoint::new(MEASUREMENT, tags, sample.bytes, sample.observed_at)
    }

    fn deliver(&mut self, batch: &Batch, report: &mut Report) {
        if self.dry_run {
            for point in &batch.points {
                debug!("Dry run point: {:?} value={}", point.tags(), point.value());
            }
            debug!("Dry run: discarding {} points", batch.len());
            return;
        }
        info!("Sending {} points to {}", batch.len(), batch.database);
        match self.sink.write_batch(batch) {
            Ok(()) => report.sent = batch.len(),
            Err(e) => {
                error!("Failed to write points: {}", e);
                report.sink_error = Some(e);
            }
        }
    }
}
