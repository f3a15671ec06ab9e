//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between conversion logic and real
//! codecs: decode a file into pixels plus its raw EXIF, and encode pixels
//! into an in-memory file. Writing to disk stays with the caller so output
//! files can be written atomically.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording `MockBackend` from this module.

use super::params::EncodeParams;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// A decoded source file. Lives only for one conversion.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    /// Raw EXIF (TIFF structure) read from the source container, if any.
    pub exif: Option<Vec<u8>>,
}

/// Trait for image codec backends.
///
/// `Sync` so one backend can be shared by every rayon worker.
pub trait ImageBackend: Sync {
    /// Decode an image file, keeping its EXIF blob.
    fn decode(&self, path: &Path) -> Result<SourceImage, BackendError>;

    /// Encode into the bytes of a complete image file, embedding `exif`
    /// where the container supports it.
    fn encode(
        &self,
        image: &DynamicImage,
        params: &EncodeParams,
        exif: Option<&[u8]>,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::format::OutputFormat;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::sync::Mutex;

    /// Mock backend that records operations instead of running codecs.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Decoding synthesizes an image of `dimensions`; a path whose file name
    /// contains "corrupt" fails to decode. Encoding returns `encoded_len`
    /// zero bytes, or fails for formats listed in `failing_formats`.
    pub struct MockBackend {
        pub dimensions: (u32, u32),
        pub alpha: bool,
        pub exif: Option<Vec<u8>>,
        pub encoded_len: usize,
        pub failing_formats: Vec<OutputFormat>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Encode {
            format: OutputFormat,
            width: u32,
            height: u32,
            has_alpha: bool,
            quality: u32,
            exif: Option<Vec<u8>>,
        },
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self {
                dimensions: (400, 300),
                alpha: false,
                exif: None,
                encoded_len: 100,
                failing_formats: Vec::new(),
                operations: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                dimensions: (width, height),
                ..Self::default()
            }
        }

        pub fn failing(formats: &[OutputFormat]) -> Self {
            Self {
                failing_formats: formats.to_vec(),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encodes(&self) -> Vec<RecordedOp> {
            self.get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::Encode { .. }))
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, path: &Path) -> Result<SourceImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(path.to_string_lossy().to_string()));

            let name = path.file_name().unwrap_or_default().to_string_lossy();
            if name.contains("corrupt") {
                return Err(BackendError::Decode(format!("{name}: not an image")));
            }

            let (w, h) = self.dimensions;
            let image = if self.alpha {
                DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0])))
            } else {
                DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([90, 120, 150])))
            };
            Ok(SourceImage {
                image,
                exif: self.exif.clone(),
            })
        }

        fn encode(
            &self,
            image: &DynamicImage,
            params: &EncodeParams,
            exif: Option<&[u8]>,
        ) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format: params.format,
                width: image.width(),
                height: image.height(),
                has_alpha: image.color().has_alpha(),
                quality: params.quality.value(),
                exif: exif.map(<[u8]>::to_vec),
            });

            if self.failing_formats.contains(&params.format) {
                return Err(BackendError::Encode(format!(
                    "{} encoder unavailable",
                    params.format
                )));
            }
            Ok(vec![0; self.encoded_len])
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_dimensions(800, 600);
        let source = backend.decode(Path::new("/test/image.jpg")).unwrap();
        assert_eq!((source.image.width(), source.image.height()), (800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Decode(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_corrupt_name_fails_decode() {
        let backend = MockBackend::new();
        let result = backend.decode(Path::new("/test/corrupt.jpg"));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 6));
        let params = EncodeParams::for_target(
            &crate::config::ConvertConfig::default(),
            crate::imaging::Target::primary(OutputFormat::Jpeg),
        );

        let bytes = backend.encode(&image, &params, Some(b"II*\0")).unwrap();
        assert_eq!(bytes.len(), 100);

        let ops = backend.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                format: OutputFormat::Jpeg,
                width: 8,
                height: 6,
                quality: 85,
                exif: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn mock_failing_format_errors() {
        let backend = MockBackend::failing(&[OutputFormat::Webp]);
        let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let params = EncodeParams::for_target(
            &crate::config::ConvertConfig::default(),
            crate::imaging::Target::webp_companion(),
        );
        assert!(backend.encode(&image, &params, None).is_err());
    }
}
