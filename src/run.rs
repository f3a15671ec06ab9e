//! Run coordination: drive the conversion engine over a discovered file set.
//!
//! Files are independent, so they are converted in parallel on the global
//! rayon pool. For each file the primary target and the optional WebP
//! companion are converted concurrently with `rayon::join`.
//!
//! Per-file results are collected in discovery order and folded into
//! [`RunStatistics`] on the calling thread, which is the only place
//! statistics are mutated. Progress events are sent over an optional
//! channel as files finish, in completion order.
//!
//! ## Output layout
//!
//! ```text
//! source/trips/Beach Day.png
//!   → output/trips/img-beach-day.jpg
//!   → output/trips/img-beach-day_thumb_150x150.jpg    (create_thumbnails)
//!   → webp/trips/img-beach-day.webp                   (webp_dir + create_webp)
//! ```
//!
//! Two sources in one directory can sanitize to the same stem (`A.jpg` and
//! `a.jpeg`). Names are assigned before any work starts, in discovery order:
//! the first keeps the plain stem, later ones get `-2`, `-3`, and so on.
//!
//! ## Interruption
//!
//! A set `cancel` flag stops new files from starting. Files already in
//! flight finish normally; the rest are counted as skipped and the run is
//! reported as interrupted.

use crate::config::ConvertConfig;
use crate::convert::{self, ConversionOutcome, ConvertError, Converter};
use crate::imaging::{ImageBackend, OutputFormat, RustBackend, Target};
use crate::naming::{self, NamingOptions};
use crate::stats::{FileReport, RunStatistics, TargetReport};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a run reads from and writes to.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    /// Root of the WebP companion tree. No companions without it.
    pub webp_dir: Option<PathBuf>,
    pub primary: OutputFormat,
}

impl RunPlan {
    /// Companion directory when the companion is requested.
    fn companion_dir(&self, config: &ConvertConfig) -> Option<&Path> {
        self.webp_dir.as_deref().filter(|_| config.create_webp)
    }
}

/// Progress reported while a run is in flight.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started {
        total: usize,
        format: OutputFormat,
        webp: bool,
    },
    /// `index` is 1-based completion order.
    FileDone {
        index: usize,
        total: usize,
        report: FileReport,
    },
}

enum FileResult {
    Done(FileReport),
    Skipped { input_bytes: u64 },
}

/// Convert `files` with the production backend.
pub fn run(
    plan: &RunPlan,
    files: &[PathBuf],
    config: &ConvertConfig,
    events: Option<Sender<RunEvent>>,
    cancel: &AtomicBool,
) -> Result<RunStatistics, RunError> {
    let backend = RustBackend::new();
    run_with_backend(&backend, plan, files, config, events, cancel)
}

/// Convert `files` using a specific backend (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    plan: &RunPlan,
    files: &[PathBuf],
    config: &ConvertConfig,
    events: Option<Sender<RunEvent>>,
    cancel: &AtomicBool,
) -> Result<RunStatistics, RunError> {
    std::fs::create_dir_all(&plan.output_dir)?;
    let companion_dir = plan.companion_dir(config);
    if let Some(dir) = companion_dir {
        std::fs::create_dir_all(dir)?;
    }

    let total = files.len();
    let mut stats = RunStatistics::new(total, plan.primary, companion_dir.is_some());
    emit(
        &events,
        RunEvent::Started {
            total,
            format: plan.primary,
            webp: companion_dir.is_some(),
        },
    );
    tracing::info!(
        files = total,
        format = %plan.primary,
        webp = companion_dir.is_some(),
        "starting run"
    );

    let converter = Converter::new(backend, config);
    let names = output_names(plan, files, NamingOptions::from_config(config));
    let completed = AtomicUsize::new(0);

    let results: Vec<FileResult> = files
        .par_iter()
        .zip(names.par_iter())
        .map(|(source, name)| {
            if cancel.load(Ordering::SeqCst) {
                return FileResult::Skipped {
                    input_bytes: convert::file_size(source),
                };
            }
            let report = process_file(&converter, plan, config, source, name);
            let index = completed.fetch_add(1, Ordering::SeqCst) + 1;
            emit(
                &events,
                RunEvent::FileDone {
                    index,
                    total,
                    report: report.clone(),
                },
            );
            FileResult::Done(report)
        })
        .collect();

    for result in &results {
        match result {
            FileResult::Done(report) => stats.record(report),
            FileResult::Skipped { input_bytes } => stats.record_skipped(*input_bytes),
        }
    }

    if stats.interrupted {
        tracing::warn!(skipped = stats.skipped, "run interrupted");
    }
    Ok(stats)
}

fn emit(events: &Option<Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Mirrored directory and output stem of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputName {
    parent: PathBuf,
    stem: String,
}

/// Output names for `files`, unique per directory.
///
/// Assigned in discovery order, so the same tree always gets the same names
/// whatever order the workers finish in.
fn output_names(plan: &RunPlan, files: &[PathBuf], options: NamingOptions) -> Vec<OutputName> {
    let mut taken: HashSet<(PathBuf, String)> = HashSet::new();
    files
        .iter()
        .map(|source| {
            let parent = relative_parent(&plan.source_root, source);
            let raw = source
                .file_stem()
                .map(|s| s.to_string_lossy())
                .unwrap_or_default();
            let base = naming::sanitize(&raw, options);

            let mut stem = base.clone();
            let mut n = 2;
            while taken.contains(&(parent.clone(), stem.clone())) {
                stem = format!("{base}-{n}");
                n += 1;
            }
            if stem != base {
                tracing::warn!(
                    source = %source.display(),
                    name = %stem,
                    "output name already taken, suffixed"
                );
            }
            taken.insert((parent.clone(), stem.clone()));
            OutputName { parent, stem }
        })
        .collect()
}

fn process_file<B: ImageBackend>(
    converter: &Converter<'_, B>,
    plan: &RunPlan,
    config: &ConvertConfig,
    source: &Path,
    name: &OutputName,
) -> FileReport {
    let input_bytes = convert::file_size(source);
    let stem = name.stem.as_str();
    let primary_dir = plan.output_dir.join(&name.parent);
    let companion_dir = plan.companion_dir(config).map(|d| d.join(&name.parent));
    let primary = Target::primary(plan.primary);

    let (primary, companion) = rayon::join(
        || convert_target(converter, config, source, &primary_dir, stem, primary),
        || {
            companion_dir.as_deref().map(|dir| {
                convert_target(converter, config, source, dir, stem, Target::webp_companion())
            })
        },
    );

    let mut targets = vec![primary];
    targets.extend(companion);
    FileReport {
        source: source.to_path_buf(),
        input_bytes,
        targets,
    }
}

fn convert_target<B: ImageBackend>(
    converter: &Converter<'_, B>,
    config: &ConvertConfig,
    source: &Path,
    dir: &Path,
    stem: &str,
    target: Target,
) -> TargetReport {
    let output = dir.join(format!("{stem}{}", target.format.extension()));

    if let Err(e) = std::fs::create_dir_all(dir) {
        let error = ConvertError::Write(e);
        tracing::warn!(dir = %dir.display(), error = %error, "cannot create output directory");
        return TargetReport {
            outcome: ConversionOutcome::failed(source, &output, target, &error),
            thumbnails_written: 0,
            thumbnails_failed: 0,
        };
    }

    let outcome = converter.convert(source, &output, target);
    let (thumbnails_written, thumbnails_failed) =
        if config.create_thumbnails && outcome.succeeded() {
            converter.make_thumbnails(source, dir, stem, target)
        } else {
            (0, 0)
        };

    TargetReport {
        outcome,
        thumbnails_written,
        thumbnails_failed,
    }
}

/// Directory of `source` relative to `root`; empty for files directly in root.
fn relative_parent(root: &Path, source: &Path) -> PathBuf {
    source
        .strip_prefix(root)
        .ok()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
