//! Per-file conversion engine.
//!
//! One [`Converter`] serves every file and target of a run. For a single
//! (source, target) pair it runs:
//!
//! ```text
//! decode → normalize (alpha, resize) → metadata plan → encode → atomic write
//! ```
//!
//! Failures never escape [`Converter::convert`]: they are captured in the
//! returned [`ConversionOutcome`] so one bad file cannot stop a run, and a
//! failed target never leaves a file at its output path.
//!
//! ## Metadata plan
//!
//! | `remove_exif` | custom fields | written EXIF |
//! |---|---|---|
//! | true | none | nothing |
//! | true | some | custom fields only |
//! | false | none | source EXIF, unchanged |
//! | false | some | source IFD0 + custom fields |
//!
//! Thumbnails are written without metadata.

use crate::config::ConvertConfig;
use crate::imaging::{
    BackendError, EncodeParams, ImageBackend, OutputFormat, SourceImage, Target, exif, transform,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Thumbnail quality never exceeds this.
pub const THUMBNAIL_MAX_QUALITY: u32 = 80;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Decode failed: {0}")]
    Decode(BackendError),
    #[error("Encode failed: {0}")]
    Encode(BackendError),
    #[error("Write failed: {0}")]
    Write(#[from] std::io::Error),
}

impl ConvertError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConvertError::Decode(_) => FailureKind::Decode,
            ConvertError::Encode(_) => FailureKind::Encode,
            ConvertError::Write(_) => FailureKind::Write,
        }
    }
}

/// Pipeline stage at which a target failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Decode,
    Encode,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Converted { output_bytes: u64 },
    Failed { kind: FailureKind, reason: String },
}

/// Result of converting one source file into one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub source: PathBuf,
    pub output: PathBuf,
    pub target: Target,
    /// Size of the source file; 0 if it could not be read.
    pub input_bytes: u64,
    pub status: OutcomeStatus,
}

impl ConversionOutcome {
    /// An outcome for a target that failed before or during conversion.
    pub fn failed(source: &Path, output: &Path, target: Target, error: &ConvertError) -> Self {
        Self {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            target,
            input_bytes: file_size(source),
            status: OutcomeStatus::Failed {
                kind: error.kind(),
                reason: error.to_string(),
            },
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.target.format
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Converted { .. })
    }

    pub fn output_bytes(&self) -> Option<u64> {
        match self.status {
            OutcomeStatus::Converted { output_bytes } => Some(output_bytes),
            OutcomeStatus::Failed { .. } => None,
        }
    }
}

/// Size of a file on disk, 0 when unreadable.
pub fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Output file name of a thumbnail: `<stem>_thumb_<size>x<size><ext>`.
pub fn thumbnail_name(stem: &str, size: u32, format: OutputFormat) -> String {
    format!("{stem}_thumb_{size}x{size}{}", format.extension())
}

pub struct Converter<'a, B: ImageBackend> {
    backend: &'a B,
    config: &'a ConvertConfig,
    custom_fields_set: bool,
}

impl<'a, B: ImageBackend> Converter<'a, B> {
    pub fn new(backend: &'a B, config: &'a ConvertConfig) -> Self {
        Self {
            backend,
            config,
            custom_fields_set: config.custom_exif.any_set(),
        }
    }

    /// Convert `source` into `output` for `target`.
    pub fn convert(&self, source: &Path, output: &Path, target: Target) -> ConversionOutcome {
        let input_bytes = file_size(source);
        let status = match self.try_convert(source, output, target) {
            Ok(output_bytes) => OutcomeStatus::Converted { output_bytes },
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    format = %target.format,
                    error = %e,
                    "conversion failed"
                );
                OutcomeStatus::Failed {
                    kind: e.kind(),
                    reason: e.to_string(),
                }
            }
        };
        ConversionOutcome {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            target,
            input_bytes,
            status,
        }
    }

    fn try_convert(
        &self,
        source: &Path,
        output: &Path,
        target: Target,
    ) -> Result<u64, ConvertError> {
        let SourceImage { image, exif } = self
            .backend
            .decode(source)
            .map_err(ConvertError::Decode)?;
        let image = transform::normalize(image, self.config, target);
        let metadata = self.plan_metadata(source, exif.as_deref());
        let params = EncodeParams::for_target(self.config, target);

        let bytes = self
            .backend
            .encode(&image, &params, metadata.as_deref())
            .map_err(ConvertError::Encode)?;
        write_atomic(output, &bytes)?;

        tracing::debug!(
            source = %source.display(),
            output = %output.display(),
            bytes = bytes.len(),
            "converted"
        );
        Ok(bytes.len() as u64)
    }

    fn plan_metadata(&self, source: &Path, existing: Option<&[u8]>) -> Option<Vec<u8>> {
        let planned = if self.config.remove_exif {
            self.custom_fields_set
                .then(|| exif::apply(None, &self.config.custom_exif))
                .flatten()
        } else {
            exif::apply(existing, &self.config.custom_exif)
        };
        // A JPEG APP1 segment cannot hold more; the image is written bare.
        planned.filter(|blob| {
            let fits = blob.len() <= exif::MAX_EXIF_LEN;
            if !fits {
                tracing::warn!(
                    source = %source.display(),
                    bytes = blob.len(),
                    "EXIF too large to embed, dropped"
                );
            }
            fits
        })
    }

    /// Write one thumbnail of `source` into `output_dir` and return its path.
    ///
    /// Decodes the source again so the thumbnail is made from full-resolution
    /// pixels rather than the web-sized output.
    pub fn make_thumbnail(
        &self,
        source: &Path,
        output_dir: &Path,
        stem: &str,
        size: u32,
        target: Target,
    ) -> Result<PathBuf, ConvertError> {
        let decoded = self.backend.decode(source).map_err(ConvertError::Decode)?;
        let mut image = transform::thumbnail(&decoded.image, size);
        if image.color().has_alpha() && !target.keeps_alpha(self.config) {
            image = transform::flatten_alpha(&image);
        }

        let params =
            EncodeParams::for_target(self.config, target).with_quality_cap(THUMBNAIL_MAX_QUALITY);
        let bytes = self
            .backend
            .encode(&image, &params, None)
            .map_err(ConvertError::Encode)?;

        let path = output_dir.join(thumbnail_name(stem, size, target.format));
        write_atomic(&path, &bytes)?;
        Ok(path)
    }

    /// All configured thumbnails for one successful target.
    ///
    /// Returns (written, failed). Failures are logged and never propagate.
    pub fn make_thumbnails(
        &self,
        source: &Path,
        output_dir: &Path,
        stem: &str,
        target: Target,
    ) -> (usize, usize) {
        let mut written = 0;
        let mut failed = 0;
        for &size in &self.config.thumbnail_sizes {
            match self.make_thumbnail(source, output_dir, stem, size, target) {
                Ok(_) => written += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        source = %source.display(),
                        size,
                        role = ?target.role,
                        error = %e,
                        "thumbnail failed"
                    );
                }
            }
        }
        (written, failed)
    }
}

/// Write through a temp file in the destination directory, then rename.
///
/// Readers never see a partial file, and on error nothing is left at `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".webshrink-")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
