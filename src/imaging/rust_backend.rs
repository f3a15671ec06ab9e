//! Production codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, BMP, TIFF, WebP, GIF) | `image` crate, format guessed from content |
//! | Source EXIF | `ImageDecoder::exif_metadata` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e) |
//! | Encode → WebP | `webp` crate (libwebp: lossy/lossless, method 0-6) |
//! | Encode → JPEG | `jpeg-encoder` (progressive scans, APP1 segments) |
//! | EXIF in WebP | `webpx::embed_exif` (libwebp mux, `EXIF` chunk) |
//!
//! The AVIF encoder has no metadata hook, so EXIF is dropped for AVIF outputs
//! with a warning.

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::format::{CodecProbe, EncoderRoute, OutputFormat};
use super::params::{EncodeParams, Target};
use super::transform;
use crate::config::ConvertConfig;
use image::codecs::avif::AvifEncoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::path::Path;

/// Backend over the `image`, `webp` and `jpeg-encoder` crates.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, e: image::ImageError) -> BackendError {
    BackendError::Decode(format!("{}: {}", path.display(), e))
}

/// JPEG with optional progressive scans and an APP1 EXIF segment.
/// Alpha is composited onto white first; JPEG cannot store it.
fn encode_jpeg(
    image: &DynamicImage,
    params: &EncodeParams,
    exif: Option<&[u8]>,
) -> Result<Vec<u8>, BackendError> {
    let rgb = if image.color().has_alpha() {
        transform::flatten_alpha(image).into_rgb8()
    } else {
        image.to_rgb8()
    };
    let (Ok(width), Ok(height)) = (u16::try_from(rgb.width()), u16::try_from(rgb.height())) else {
        return Err(BackendError::Unsupported(format!(
            "JPEG edge limit is 65535 px, image is {}x{}",
            rgb.width(),
            rgb.height()
        )));
    };

    let mut buf = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut buf, params.quality.value() as u8);
    encoder.set_progressive(params.progressive);
    encoder.set_optimized_huffman_tables(true);
    if let Some(exif) = exif {
        let mut segment = Vec::with_capacity(exif.len() + 6);
        segment.extend_from_slice(b"Exif\0\0");
        segment.extend_from_slice(exif);
        encoder
            .add_app_segment(1, &segment)
            .map_err(|e| BackendError::Encode(format!("JPEG EXIF segment: {e}")))?;
    }
    encoder
        .encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        .map_err(|e| BackendError::Encode(format!("JPEG: {e}")))?;
    Ok(buf)
}

/// WebP through libwebp's advanced API, so lossless and method apply.
fn encode_webp(
    image: &DynamicImage,
    params: &EncodeParams,
    exif: Option<&[u8]>,
) -> Result<Vec<u8>, BackendError> {
    let (width, height) = (image.width(), image.height());
    let has_alpha = image.color().has_alpha();

    let mut config = webp::WebPConfig::new()
        .map_err(|()| BackendError::Encode("WebP config initialization failed".into()))?;
    config.lossless = i32::from(params.lossless);
    config.quality = params.quality.value() as f32;
    config.method = i32::from(params.method);

    let encoded = if has_alpha {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_advanced(&config)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_advanced(&config)
    };
    let bytes = encoded
        .map_err(|e| BackendError::Encode(format!("WebP: {e:?}")))?
        .to_vec();

    match exif {
        Some(exif) => webpx::embed_exif(&bytes, exif)
            .map_err(|e| BackendError::Encode(format!("WebP EXIF chunk: {e:?}"))),
        None => Ok(bytes),
    }
}

fn encode_avif(image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
    // The encoder takes 8-bit RGB(A); 16-bit and gray sources are converted.
    let image = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };
    let mut buf = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(
        &mut buf,
        params.avif_speed,
        params.quality.value() as u8,
    );
    image
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("AVIF: {e}")))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<SourceImage, BackendError> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let mut decoder = reader.into_decoder().map_err(|e| decode_error(path, e))?;
        let exif = decoder.exif_metadata().unwrap_or_else(|e| {
            tracing::debug!(path = %path.display(), error = %e, "unreadable source EXIF");
            None
        });
        let image = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;
        Ok(SourceImage { image, exif })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        params: &EncodeParams,
        exif: Option<&[u8]>,
    ) -> Result<Vec<u8>, BackendError> {
        match params.format {
            OutputFormat::Jpeg => encode_jpeg(image, params, exif),
            OutputFormat::Webp => encode_webp(image, params, exif),
            OutputFormat::Avif => {
                if exif.is_some() {
                    tracing::warn!("AVIF encoder cannot embed EXIF, writing image without it");
                }
                encode_avif(image, params)
            }
        }
    }
}

impl CodecProbe for RustBackend {
    fn try_encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        route: EncoderRoute,
        path: &Path,
    ) -> Result<(), BackendError> {
        match route {
            EncoderRoute::Registry => {
                let registry_format = match format {
                    OutputFormat::Avif => ImageFormat::Avif,
                    OutputFormat::Webp => ImageFormat::WebP,
                    OutputFormat::Jpeg => ImageFormat::Jpeg,
                };
                if !registry_format.writing_enabled() {
                    return Err(BackendError::Unsupported(format!(
                        "{format} writing is not compiled in"
                    )));
                }
                image
                    .save_with_format(path, registry_format)
                    .map_err(|e| BackendError::Encode(e.to_string()))
            }
            EncoderRoute::Direct => {
                let params =
                    EncodeParams::for_target(&ConvertConfig::default(), Target::primary(format));
                let bytes = self.encode(image, &params, None)?;
                std::fs::write(path, bytes)?;
                Ok(())
            }
        }
    }
}
