//! Image processing: codec selection, pixel normalization, metadata, encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Codec probe** | real 10×10 encodes, AVIF → WebP → JPEG |
//! | **Resize** | `image` Lanczos3, bounded by `max_width` × `max_height` |
//! | **Alpha flatten** | composite over white |
//! | **EXIF** | custom TIFF IFD writer |
//! | **Encode** | `image` (AVIF), `webp`, `jpeg-encoder` |
//!
//! The module is split into:
//! - **Format**: [`OutputFormat`] and the capability probe
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing encodes
//! - **Transform**: Pure in-memory pixel operations
//! - **EXIF**: Metadata record builder and container embedding
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod exif;
pub mod format;
mod params;
pub mod rust_backend;
pub mod transform;

pub use backend::{BackendError, ImageBackend, SourceImage};
pub use calculations::{fit_within, thumbnail_dimensions};
pub use exif::ExifError;
pub use format::{CodecProbe, EncoderRoute, OutputFormat, detect, detect_output_format};
pub use params::{EncodeParams, Quality, Target, TargetRole};
pub use rust_backend::RustBackend;
