//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions that fit `source` inside `max`, or `None` if it already fits.
///
/// The scale factor is `min(max_w / w, max_h / h)`, applied to both edges so
/// the aspect ratio is kept. Results are truncated and never below 1 px.
/// Images are never upscaled.
///
/// # Examples
/// ```
/// # use webshrink::imaging::fit_within;
/// // 4000x3000 into 1920x1080 → height-bound, ratio 0.36
/// assert_eq!(fit_within((4000, 3000), (1920, 1080)), Some((1440, 1080)));
///
/// // Already small enough
/// assert_eq!(fit_within((800, 600), (1920, 1080)), None);
/// ```
pub fn fit_within(source: (u32, u32), max: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    let (max_w, max_h) = max;

    if src_w <= max_w && src_h <= max_h {
        return None;
    }

    // Exact integer math: the bounding edge must come out as exactly max.
    let (w, h) = (src_w as u64, src_h as u64);
    let (mw, mh) = (max_w as u64, max_h as u64);
    let (new_w, new_h) = if mw * h <= mh * w {
        (mw, h * mw / w)
    } else {
        (w * mh / h, mh)
    };
    Some((new_w.max(1) as u32, new_h.max(1) as u32))
}

/// Dimensions of a thumbnail bounded by a `size` × `size` box.
///
/// Like [`fit_within`] but always returns a size; the source size when it
/// already fits.
pub fn thumbnail_dimensions(source: (u32, u32), size: u32) -> (u32, u32) {
    fit_within(source, (size, size)).unwrap_or(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fit_within
    // =========================================================================

    #[test]
    fn within_bounds_is_noop() {
        assert_eq!(fit_within((1920, 1080), (1920, 1080)), None);
        assert_eq!(fit_within((10, 10), (1920, 1080)), None);
    }

    #[test]
    fn landscape_bound_by_height() {
        assert_eq!(fit_within((4000, 3000), (1920, 1080)), Some((1440, 1080)));
    }

    #[test]
    fn wide_panorama_bound_by_width() {
        assert_eq!(fit_within((8000, 1000), (1920, 1080)), Some((1920, 240)));
    }

    #[test]
    fn portrait_bound_by_height() {
        assert_eq!(fit_within((3000, 4000), (1920, 1080)), Some((810, 1080)));
    }

    #[test]
    fn one_edge_over_still_resizes() {
        assert_eq!(fit_within((2000, 500), (1920, 1080)), Some((1920, 480)));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within((100_000, 10), (1920, 1080)), Some((1920, 1)));
    }

    #[test]
    fn results_stay_inside_bounds_and_keep_aspect() {
        let cases = [
            (4000, 3000),
            (3001, 2999),
            (1921, 1081),
            (5000, 5000),
            (1234, 5678),
            (7777, 333),
        ];
        for source in cases {
            let (w, h) = fit_within(source, (1920, 1080)).unwrap();
            assert!(w <= 1920 && h <= 1080, "{source:?} → {w}x{h}");
            let src_aspect = source.0 as f64 / source.1 as f64;
            let out_aspect = w as f64 / h as f64;
            // Truncation can shift the aspect by at most one pixel per edge.
            let tolerance = src_aspect / h as f64 + 1.0 / h as f64;
            assert!(
                (src_aspect - out_aspect).abs() <= tolerance,
                "{source:?} → {w}x{h}"
            );
        }
    }

    // =========================================================================
    // thumbnail_dimensions
    // =========================================================================

    #[test]
    fn thumbnail_landscape() {
        assert_eq!(thumbnail_dimensions((1000, 750), 150), (150, 112));
    }

    #[test]
    fn thumbnail_portrait() {
        assert_eq!(thumbnail_dimensions((600, 1200), 300), (150, 300));
    }

    #[test]
    fn thumbnail_never_upscales() {
        assert_eq!(thumbnail_dimensions((100, 80), 600), (100, 80));
    }
}
