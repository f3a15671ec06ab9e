//! In-memory pixel normalization.
//!
//! Everything here is pure: images in, images out, no I/O and no metadata.
//! [`normalize`] is what every converted output goes through; [`thumbnail`]
//! is the extra step for thumbnail renditions.

use super::calculations::{fit_within, thumbnail_dimensions};
use super::params::Target;
use crate::config::ConvertConfig;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

/// Prepare a decoded image for encoding as `target`.
///
/// 1. Alpha is composited onto white when the target does not keep it
///    (see [`Target::keeps_alpha`]).
/// 2. When `optimize_for_web` is on, images larger than `max_width` ×
///    `max_height` are downscaled with Lanczos3. Smaller images are untouched.
pub fn normalize(img: DynamicImage, config: &ConvertConfig, target: Target) -> DynamicImage {
    let img = if img.color().has_alpha() && !target.keeps_alpha(config) {
        flatten_alpha(&img)
    } else {
        img
    };

    if !config.optimize_for_web {
        return img;
    }
    match fit_within(
        (img.width(), img.height()),
        (config.max_width, config.max_height),
    ) {
        Some((w, h)) => img.resize_exact(w, h, FilterType::Lanczos3),
        None => img,
    }
}

/// Composite over opaque white, using alpha as the mask. Always returns RGB8.
pub fn flatten_alpha(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let over_white = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    });
    DynamicImage::ImageRgb8(flat)
}

/// Downscale into a `size` × `size` box, keeping aspect. Never upscales.
pub fn thumbnail(img: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = thumbnail_dimensions((img.width(), img.height()), size);
    if (w, h) == (img.width(), img.height()) {
        return img.clone();
    }
    img.resize_exact(w, h, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::format::OutputFormat;
    use image::{ColorType, Rgba, RgbaImage};

    fn transparent(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0])))
    }

    fn opaque(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 20, 30])))
    }

    #[test]
    fn flatten_transparent_becomes_white() {
        let flat = flatten_alpha(&transparent(4, 4));
        assert_eq!(flat.color(), ColorType::Rgb8);
        assert_eq!(flat.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn flatten_opaque_keeps_color() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 255])));
        assert_eq!(flatten_alpha(&img).to_rgb8().get_pixel(1, 1).0, [200, 100, 50]);
    }

    #[test]
    fn flatten_half_alpha_blends() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let [r, g, b] = flatten_alpha(&img).to_rgb8().get_pixel(0, 0).0;
        assert_eq!((r, g, b), (127, 127, 127));
    }

    #[test]
    fn jpeg_primary_drops_alpha() {
        let config = ConvertConfig::default();
        let out = normalize(
            transparent(8, 8),
            &config,
            Target::primary(OutputFormat::Jpeg),
        );
        assert!(!out.color().has_alpha());
    }

    #[test]
    fn avif_primary_keeps_alpha() {
        let config = ConvertConfig::default();
        let out = normalize(
            transparent(8, 8),
            &config,
            Target::primary(OutputFormat::Avif),
        );
        assert!(out.color().has_alpha());
    }

    #[test]
    fn preserve_transparency_off_flattens_primary() {
        let config = ConvertConfig {
            preserve_transparency: false,
            ..ConvertConfig::default()
        };
        let out = normalize(
            transparent(8, 8),
            &config,
            Target::primary(OutputFormat::Webp),
        );
        assert!(!out.color().has_alpha());
    }

    #[test]
    fn webp_companion_always_keeps_alpha() {
        let config = ConvertConfig {
            preserve_transparency: false,
            ..ConvertConfig::default()
        };
        let out = normalize(transparent(8, 8), &config, Target::webp_companion());
        assert!(out.color().has_alpha());
    }

    #[test]
    fn resize_large_image_into_bounds() {
        let config = ConvertConfig {
            max_width: 40,
            max_height: 30,
            ..ConvertConfig::default()
        };
        let out = normalize(opaque(400, 300), &config, Target::primary(OutputFormat::Jpeg));
        assert_eq!((out.width(), out.height()), (40, 30));
    }

    #[test]
    fn small_image_untouched() {
        let config = ConvertConfig::default();
        let out = normalize(opaque(64, 48), &config, Target::primary(OutputFormat::Jpeg));
        assert_eq!((out.width(), out.height()), (64, 48));
    }

    #[test]
    fn optimize_off_skips_resize() {
        let config = ConvertConfig {
            max_width: 10,
            max_height: 10,
            optimize_for_web: false,
            ..ConvertConfig::default()
        };
        let out = normalize(opaque(64, 48), &config, Target::primary(OutputFormat::Jpeg));
        assert_eq!((out.width(), out.height()), (64, 48));
    }

    #[test]
    fn thumbnail_fits_box() {
        let thumb = thumbnail(&opaque(400, 300), 100);
        assert_eq!((thumb.width(), thumb.height()), (100, 75));
    }

    #[test]
    fn thumbnail_small_source_unchanged() {
        let thumb = thumbnail(&opaque(50, 20), 100);
        assert_eq!((thumb.width(), thumb.height()), (50, 20));
    }
}
