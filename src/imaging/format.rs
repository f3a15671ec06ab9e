//! Output formats and runtime codec selection.
//!
//! The output codec is chosen once per run by actually encoding a tiny image,
//! because a compiled-in feature flag is no guarantee that the encoder works
//! on this machine. The chain, best first:
//!
//! | Step | Format | Route |
//! |---|---|---|
//! | 1 | AVIF | format registry (`ImageFormat::Avif`) |
//! | 2 | AVIF | direct encoder |
//! | 3 | WebP | direct encoder |
//! | – | JPEG | never probed, always available |
//!
//! Each attempt writes into a fresh temporary file that is removed when the
//! attempt returns, whatever its result. Probe failures are expected on
//! minimal builds and only logged at debug level.

use super::backend::BackendError;
use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// The closed set of output codecs, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Avif,
    Webp,
    Jpeg,
}

impl OutputFormat {
    pub fn codec_name(self) -> &'static str {
        match self {
            OutputFormat::Avif => "AVIF",
            OutputFormat::Webp => "WEBP",
            OutputFormat::Jpeg => "JPEG",
        }
    }

    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Avif => ".avif",
            OutputFormat::Webp => ".webp",
            OutputFormat::Jpeg => ".jpg",
        }
    }

    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec_name())
    }
}

/// How a probe reaches an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderRoute {
    /// Through the generic format registry's save path.
    Registry,
    /// By constructing the codec's encoder directly.
    Direct,
}

/// Something that can attempt a real encode for capability detection.
pub trait CodecProbe {
    /// Encode `image` as `format` into the file at `path`.
    fn try_encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        route: EncoderRoute,
        path: &Path,
    ) -> Result<(), BackendError>;
}

const PROBE_CHAIN: &[(OutputFormat, EncoderRoute)] = &[
    (OutputFormat::Avif, EncoderRoute::Registry),
    (OutputFormat::Avif, EncoderRoute::Direct),
    (OutputFormat::Webp, EncoderRoute::Direct),
];

const PROBE_EDGE: u32 = 10;

fn probe_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(
        PROBE_EDGE,
        PROBE_EDGE,
        Rgb([255, 0, 0]),
    ))
}

/// Walk the fallback chain and return the first format that encodes.
///
/// Never fails: JPEG is returned when every probe does.
pub fn detect(probe: &impl CodecProbe, scratch_dir: &Path) -> OutputFormat {
    let image = probe_image();
    for &(format, route) in PROBE_CHAIN {
        match attempt(probe, &image, format, route, scratch_dir) {
            Ok(()) => {
                tracing::info!(format = %format, ?route, "selected output format");
                return format;
            }
            Err(e) => tracing::debug!(format = %format, ?route, error = %e, "codec probe failed"),
        }
    }
    tracing::info!(format = %OutputFormat::Jpeg, "no modern encoder available, using fallback");
    OutputFormat::Jpeg
}

fn attempt(
    probe: &impl CodecProbe,
    image: &DynamicImage,
    format: OutputFormat,
    route: EncoderRoute,
    scratch_dir: &Path,
) -> Result<(), BackendError> {
    let scratch = tempfile::Builder::new()
        .prefix(".probe-")
        .suffix(format.extension())
        .tempfile_in(scratch_dir)?;
    probe.try_encode(image, format, route, scratch.path())?;
    if fs::metadata(scratch.path())?.len() == 0 {
        return Err(BackendError::Encode(format!(
            "{format} probe produced an empty file"
        )));
    }
    Ok(())
}

/// Production entry point: probe the real codecs in the system temp directory.
pub fn detect_output_format() -> OutputFormat {
    detect(&super::RustBackend::new(), &std::env::temp_dir())
}
