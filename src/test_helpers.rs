//! Shared test utilities for the webshrink test suite.
//!
//! Builds small synthetic source files on disk so tests exercise the real
//! decoders without checked-in fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let src = tmp.path().join("photo.jpg");
//! create_test_jpeg(&src, 400, 300);
//! ```

use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Synthetic sources
// =========================================================================

/// Write a gradient JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write an RGBA PNG filled with one color.
pub fn create_test_png(path: &Path, width: u32, height: u32, pixel: [u8; 4]) {
    RgbaImage::from_pixel(width, height, Rgba(pixel))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// Write a fully transparent PNG.
pub fn create_transparent_png(path: &Path, width: u32, height: u32) {
    create_test_png(path, width, height, [0, 0, 0, 0]);
}

/// Write a file with an image extension but garbage content.
pub fn create_corrupt_file(path: &Path) {
    std::fs::write(path, b"definitely not an image").unwrap();
}

/// Create `rel` under `root` (with parent dirs) as a JPEG and return its path.
pub fn jpeg_at(root: &Path, rel: &str, width: u32, height: u32) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    create_test_jpeg(&path, width, height);
    path
}

// =========================================================================
// Assertions
// =========================================================================

/// Decode `path` and return its dimensions.
pub fn dimensions_of(path: &Path) -> (u32, u32) {
    image::image_dimensions(path)
        .unwrap_or_else(|e| panic!("{} is not a readable image: {e}", path.display()))
}

/// True if `needle` occurs anywhere in `haystack`.
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
