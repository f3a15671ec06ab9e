//! CLI output formatting for every stage of a run.
//!
//! # Output Format
//!
//! ## Probe
//!
//! ```text
//! Output format: AVIF (.avif)
//! ```
//!
//! ## Progress
//!
//! ```text
//! Converting 3 files → AVIF + WebP companion
//! [001/003] photos/Beach Day.png
//!     AVIF: 2.10 MB → 0.31 MB
//!     WEBP: 2.10 MB → 0.42 MB
//! [002/003] photos/broken.jpg
//!     AVIF: failed (Decode failed: ...)
//! ```
//!
//! ## Report
//!
//! ```text
//! Processed 3 of 3 files, 1 failed
//! Input: 6.30 MB
//!
//! AVIF
//!     Converted: 2, failed: 1
//!     Size: 4.20 MB → 0.62 MB (85.2% smaller)
//!     Thumbnails: 6
//!
//! Failed files
//!     photos/broken.jpg (AVIF)
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::convert::OutcomeStatus;
use crate::imaging::{OutputFormat, TargetRole};
use crate::run::RunEvent;
use crate::stats::{RunStatistics, TargetStats};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based index zero-padded to the width of `total`, at least 3.
fn format_index(pos: usize, total: usize) -> String {
    let width = total.to_string().len().max(3);
    format!("{:0>width$}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Byte count in megabytes with two decimals.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn target_label(format: OutputFormat, role: TargetRole) -> String {
    match role {
        TargetRole::Primary => format.codec_name().to_string(),
        TargetRole::WebpCompanion => format!("{} (companion)", format.codec_name()),
    }
}

fn reduction_phrase(percent: f64) -> String {
    if percent < 0.0 {
        format!("{:.1}% larger", -percent)
    } else {
        format!("{:.1}% smaller", percent)
    }
}

// ============================================================================
// Probe
// ============================================================================

pub fn format_probe(format: OutputFormat) -> Vec<String> {
    vec![format!(
        "Output format: {} ({})",
        format.codec_name(),
        format.extension()
    )]
}

pub fn print_probe(format: OutputFormat) {
    for line in format_probe(format) {
        println!("{}", line);
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single run progress event as display lines.
pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    match event {
        RunEvent::Started {
            total,
            format,
            webp,
        } => {
            let companion = if *webp { " + WebP companion" } else { "" };
            vec![format!(
                "Converting {} files → {}{}",
                total,
                format.codec_name(),
                companion
            )]
        }
        RunEvent::FileDone {
            index,
            total,
            report,
        } => {
            let mut lines = vec![format!(
                "[{}/{}] {}",
                format_index(*index, *total),
                format_index(*total, *total),
                report.source.display()
            )];
            for target in &report.targets {
                let outcome = &target.outcome;
                let detail = match &outcome.status {
                    OutcomeStatus::Converted { output_bytes } => format!(
                        "{} → {}",
                        format_mb(outcome.input_bytes),
                        format_mb(*output_bytes)
                    ),
                    OutcomeStatus::Failed { reason, .. } => format!("failed ({})", reason),
                };
                lines.push(format!(
                    "{}{}: {}",
                    indent(1),
                    outcome.format().codec_name(),
                    detail
                ));
            }
            lines
        }
    }
}

// ============================================================================
// Report
// ============================================================================

fn format_target(stats: &TargetStats) -> Vec<String> {
    let mut lines = vec![target_label(stats.format, stats.role)];
    lines.push(format!(
        "{}Converted: {}, failed: {}",
        indent(1),
        stats.converted,
        stats.failed
    ));
    lines.push(format!(
        "{}Size: {} → {} ({})",
        indent(1),
        format_mb(stats.bytes_before),
        format_mb(stats.bytes_after),
        reduction_phrase(stats.reduction_percent())
    ));
    if stats.thumbnails_written > 0 || stats.thumbnails_failed > 0 {
        let failed = match stats.thumbnails_failed {
            0 => String::new(),
            n => format!(", {} failed", n),
        };
        lines.push(format!(
            "{}Thumbnails: {}{}",
            indent(1),
            stats.thumbnails_written,
            failed
        ));
    }
    lines
}

/// Format the end-of-run summary.
pub fn format_report(stats: &RunStatistics) -> Vec<String> {
    let mut lines = vec![format!(
        "Processed {} of {} files, {} failed",
        stats.processed, stats.total_files, stats.failed
    )];
    lines.push(format!("Input: {}", format_mb(stats.bytes_discovered)));

    lines.push(String::new());
    lines.extend(format_target(&stats.primary));
    if let Some(webp) = &stats.webp {
        lines.push(String::new());
        lines.extend(format_target(webp));
    }

    if !stats.failed_files.is_empty() {
        lines.push(String::new());
        lines.push("Failed files".to_string());
        for failed in &stats.failed_files {
            lines.push(format!(
                "{}{} ({})",
                indent(1),
                failed.path.display(),
                failed.format.codec_name()
            ));
        }
    }

    if stats.interrupted {
        lines.push(String::new());
        lines.push(format!(
            "Interrupted: {} files were not started",
            stats.skipped
        ));
    }
    lines
}

pub fn print_report(stats: &RunStatistics) {
    for line in format_report(stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
