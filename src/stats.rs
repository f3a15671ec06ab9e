//! Run statistics: the accumulator every file report is folded into.
//!
//! Counting rules:
//! - byte totals per target include only successful conversions
//! - per-target `failed` counts every failed target
//! - a file is failed overall only when every requested target failed, and
//!   only such files are listed in `failed_files`

use crate::convert::ConversionOutcome;
use crate::imaging::{OutputFormat, TargetRole};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetStats {
    pub format: OutputFormat,
    pub role: TargetRole,
    pub converted: usize,
    pub failed: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub thumbnails_written: usize,
    pub thumbnails_failed: usize,
}

impl TargetStats {
    pub fn new(format: OutputFormat, role: TargetRole) -> Self {
        Self {
            format,
            role,
            converted: 0,
            failed: 0,
            bytes_before: 0,
            bytes_after: 0,
            thumbnails_written: 0,
            thumbnails_failed: 0,
        }
    }

    /// `(before - after) / before * 100`; 0 when nothing was converted.
    /// Negative when outputs grew.
    pub fn reduction_percent(&self) -> f64 {
        if self.bytes_before == 0 {
            return 0.0;
        }
        let before = self.bytes_before as f64;
        (before - self.bytes_after as f64) / before * 100.0
    }

    fn record(&mut self, report: &TargetReport) {
        match report.outcome.output_bytes() {
            Some(after) => {
                self.converted += 1;
                self.bytes_before += report.outcome.input_bytes;
                self.bytes_after += after;
            }
            None => self.failed += 1,
        }
        self.thumbnails_written += report.thumbnails_written;
        self.thumbnails_failed += report.thumbnails_failed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub format: OutputFormat,
}

/// One target of one file, plus its thumbnails.
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub outcome: ConversionOutcome,
    pub thumbnails_written: usize,
    pub thumbnails_failed: usize,
}

/// Everything that happened to one source file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub source: PathBuf,
    pub input_bytes: u64,
    pub targets: Vec<TargetReport>,
}

impl FileReport {
    pub fn failed_overall(&self) -> bool {
        !self.targets.is_empty() && self.targets.iter().all(|t| !t.outcome.succeeded())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub total_files: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_discovered: u64,
    pub primary: TargetStats,
    pub webp: Option<TargetStats>,
    pub failed_files: Vec<FailedFile>,
    pub interrupted: bool,
}

impl RunStatistics {
    pub fn new(total_files: usize, primary: OutputFormat, with_webp: bool) -> Self {
        Self {
            total_files,
            processed: 0,
            skipped: 0,
            failed: 0,
            bytes_discovered: 0,
            primary: TargetStats::new(primary, TargetRole::Primary),
            webp: with_webp
                .then(|| TargetStats::new(OutputFormat::Webp, TargetRole::WebpCompanion)),
            failed_files: Vec::new(),
            interrupted: false,
        }
    }

    pub fn record(&mut self, report: &FileReport) {
        self.processed += 1;
        self.bytes_discovered += report.input_bytes;

        for target in &report.targets {
            match target.outcome.target.role {
                TargetRole::Primary => self.primary.record(target),
                TargetRole::WebpCompanion => {
                    if let Some(webp) = self.webp.as_mut() {
                        webp.record(target);
                    }
                }
            }
        }

        if report.failed_overall() {
            self.failed += 1;
            self.failed_files.extend(report.targets.iter().map(|t| FailedFile {
                path: report.source.clone(),
                format: t.outcome.format(),
            }));
        }
    }

    /// A file that was never started because the run was interrupted.
    pub fn record_skipped(&mut self, input_bytes: u64) {
        self.skipped += 1;
        self.bytes_discovered += input_bytes;
        self.interrupted = true;
    }

    pub fn succeeded(&self) -> usize {
        self.processed - self.failed
    }

    /// Sum of every target's output bytes.
    pub fn total_bytes_after(&self) -> u64 {
        self.primary.bytes_after + self.webp.as_ref().map_or(0, |w| w.bytes_after)
    }
}
