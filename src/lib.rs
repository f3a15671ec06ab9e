//! # webshrink
//!
//! Batch converter that turns a directory tree of photos into web-ready
//! images. Every source is resized to fit a bounding box, normalized for the
//! target codec, optionally tagged with custom EXIF, and written under a
//! mirrored directory tree with a web-safe file name.
//!
//! # Pipeline
//!
//! ```text
//! probe     pick the best working codec once: AVIF → WebP → JPEG
//! scan      source/  →  sorted list of image files
//! convert   each file, in parallel: decode → normalize → EXIF → encode → write
//! report    fold per-file outcomes into RunStatistics
//! ```
//!
//! Besides the primary output, each file can get a WebP companion in a
//! separate tree and a set of square-bounded thumbnails next to each output.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | JSON config: defaults, overlay merge, validation, save |
//! | [`scan`] | Recursive discovery of supported source files |
//! | [`naming`] | Transliteration and slugification of output file names |
//! | [`imaging`] | Codec probe, pixel transforms, EXIF writer, codec backends |
//! | [`convert`] | Per-file conversion engine with atomic writes and thumbnails |
//! | [`run`] | Parallel run coordinator, progress events, cancellation |
//! | [`stats`] | Run statistics accumulator |
//! | [`output`] | CLI output formatting for progress and the final report |
//!
//! # Design Decisions
//!
//! ## Probe by Encoding
//!
//! Whether AVIF works depends on how the binary was built and on the
//! machine it runs on. Instead of trusting feature flags, the probe encodes a
//! tiny image with each candidate and picks the first that produces bytes.
//! The choice is made once per run so every output of a run shares a format.
//!
//! ## Failures Are Data
//!
//! A corrupt source or a failing encoder must not stop a batch of thousands
//! of files. Conversion errors are captured in a
//! [`ConversionOutcome`](convert::ConversionOutcome) and counted; only
//! configuration and discovery errors abort a run.
//!
//! ## Single Fold Point
//!
//! Workers never touch shared counters. Each returns a
//! [`FileReport`](stats::FileReport); the coordinator folds them into
//! [`RunStatistics`](stats::RunStatistics) in discovery order, so totals are
//! deterministic regardless of thread scheduling.

pub mod config;
pub mod convert;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod run;
pub mod scan;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_helpers;
