//! Parameter types for image operations.
//!
//! These structs describe *what* to encode, not *how*. The
//! [`convert`](crate::convert) engine derives them from the run config and a
//! [`Target`]; the [`backend`](super::backend) turns them into bytes. Keeping
//! them plain data lets tests assert on exactly what a backend was asked to do.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100). Clamped on construction.
//! - [`TargetRole`] / [`Target`]: which output of a file is being produced.
//! - [`EncodeParams`]: everything an encoder needs besides pixels and metadata.

use super::format::OutputFormat;
use crate::config::ConvertConfig;
use serde::Serialize;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Lower the quality to at most `cap`.
    pub fn capped(self, cap: u32) -> Self {
        Self::new(self.0.min(cap))
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Why an output is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    /// The run's selected format, written under the output directory.
    Primary,
    /// The extra WebP rendition, written under the WebP directory.
    WebpCompanion,
}

/// One output of a source file: a format plus the role it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub format: OutputFormat,
    pub role: TargetRole,
}

impl Target {
    pub fn primary(format: OutputFormat) -> Self {
        Self {
            format,
            role: TargetRole::Primary,
        }
    }

    /// The companion is always WebP, whatever the primary format is.
    pub fn webp_companion() -> Self {
        Self {
            format: OutputFormat::Webp,
            role: TargetRole::WebpCompanion,
        }
    }

    /// Whether an alpha channel survives normalization for this target.
    pub fn keeps_alpha(&self, config: &ConvertConfig) -> bool {
        match self.role {
            TargetRole::WebpCompanion => true,
            TargetRole::Primary => self.format.supports_alpha() && config.preserve_transparency,
        }
    }
}

/// Encoder settings for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub quality: Quality,
    /// Progressive scans (JPEG only).
    pub progressive: bool,
    /// Lossless mode (WebP only).
    pub lossless: bool,
    /// Compression effort 0-6 (WebP only).
    pub method: u8,
    /// Encoder speed 1-10 (AVIF only).
    pub avif_speed: u8,
}

impl EncodeParams {
    /// Pick the settings that apply to `target`.
    ///
    /// A primary WebP (no AVIF encoder available) uses `quality`, `lossless`
    /// and `method`; the companion uses the `webp_*` keys.
    pub fn for_target(config: &ConvertConfig, target: Target) -> Self {
        let (quality, lossless, method) = match target.role {
            TargetRole::Primary => (config.quality, config.lossless, config.method),
            TargetRole::WebpCompanion => (
                config.webp_quality,
                config.webp_lossless,
                config.webp_method,
            ),
        };
        Self {
            format: target.format,
            quality: Quality::new(quality),
            progressive: config.progressive,
            lossless,
            method: method.min(6),
            avif_speed: config.avif_speed.clamp(1, 10),
        }
    }

    /// Same settings with quality capped, as used for thumbnails.
    pub fn with_quality_cap(self, cap: u32) -> Self {
        Self {
            quality: self.quality.capped(cap),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_cap_only_lowers() {
        assert_eq!(Quality::new(85).capped(80).value(), 80);
        assert_eq!(Quality::new(60).capped(80).value(), 60);
    }

    #[test]
    fn companion_is_always_webp() {
        assert_eq!(Target::webp_companion().format, OutputFormat::Webp);
        assert_eq!(Target::webp_companion().role, TargetRole::WebpCompanion);
    }

    #[test]
    fn keeps_alpha_by_role_and_format() {
        let config = ConvertConfig::default();
        assert!(Target::primary(OutputFormat::Avif).keeps_alpha(&config));
        assert!(Target::primary(OutputFormat::Webp).keeps_alpha(&config));
        assert!(!Target::primary(OutputFormat::Jpeg).keeps_alpha(&config));
        assert!(Target::webp_companion().keeps_alpha(&config));
    }

    #[test]
    fn preserve_transparency_off_drops_primary_alpha_only() {
        let config = ConvertConfig {
            preserve_transparency: false,
            ..ConvertConfig::default()
        };
        assert!(!Target::primary(OutputFormat::Avif).keeps_alpha(&config));
        assert!(Target::webp_companion().keeps_alpha(&config));
    }

    #[test]
    fn primary_params_use_primary_keys() {
        let config = ConvertConfig {
            quality: 70,
            webp_quality: 50,
            lossless: true,
            method: 4,
            webp_method: 2,
            ..ConvertConfig::default()
        };
        let params = EncodeParams::for_target(&config, Target::primary(OutputFormat::Webp));
        assert_eq!(params.quality.value(), 70);
        assert!(params.lossless);
        assert_eq!(params.method, 4);
    }

    #[test]
    fn companion_params_use_webp_keys() {
        let config = ConvertConfig {
            quality: 70,
            webp_quality: 50,
            webp_lossless: true,
            webp_method: 2,
            ..ConvertConfig::default()
        };
        let params = EncodeParams::for_target(&config, Target::webp_companion());
        assert_eq!(params.format, OutputFormat::Webp);
        assert_eq!(params.quality.value(), 50);
        assert!(params.lossless);
        assert_eq!(params.method, 2);
    }

    #[test]
    fn thumbnail_cap_keeps_other_settings() {
        let config = ConvertConfig::default();
        let params = EncodeParams::for_target(&config, Target::primary(OutputFormat::Jpeg));
        let capped = params.with_quality_cap(80);
        assert_eq!(capped.quality.value(), 80);
        assert_eq!(capped.progressive, params.progressive);
        assert_eq!(capped.format, OutputFormat::Jpeg);
    }
}
