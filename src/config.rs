//! Conversion configuration.
//!
//! Handles loading, validating, merging, and saving the JSON config file.
//! A config file is an overlay: it only needs the keys it wants to change,
//! everything else comes from the stock defaults.
//!
//! ## Configuration Options
//!
//! ```json
//! {
//!   "quality": 85,
//!   "webp_quality": 85,
//!   "max_width": 1920,
//!   "max_height": 1080,
//!   "remove_exif": true,
//!   "optimize_for_web": true,
//!   "thumbnail_sizes": [150, 300, 600],
//!   "create_thumbnails": false,
//!   "preserve_transparency": true,
//!   "seo_friendly_names": true,
//!   "seo_prefix": true,
//!   "progressive": true,
//!   "lossless": false,
//!   "method": 6,
//!   "create_webp": true,
//!   "webp_lossless": false,
//!   "webp_method": 6,
//!   "avif_speed": 8,
//!   "max_processes": null,
//!   "custom_exif": { "Artist": "", "Copyright": "", "Website": "" }
//! }
//! ```
//!
//! `lossless` / `method` apply when WebP is the primary format (no AVIF
//! encoder available); `webp_lossless` / `webp_method` / `webp_quality`
//! apply to the WebP companion written next to the primary output.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Resolved configuration for one conversion run.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Primary-format quality (1 = worst, 100 = best).
    pub quality: u32,
    /// WebP companion quality.
    pub webp_quality: u32,
    pub max_width: u32,
    pub max_height: u32,
    /// Discard metadata carried by the source image.
    pub remove_exif: bool,
    /// Downscale images larger than `max_width` × `max_height`.
    pub optimize_for_web: bool,
    /// Bounding-box edge lengths for thumbnails, in output order.
    pub thumbnail_sizes: Vec<u32>,
    pub create_thumbnails: bool,
    /// Keep the alpha channel when the primary format can store it.
    pub preserve_transparency: bool,
    /// Transliterate and slugify output filenames.
    pub seo_friendly_names: bool,
    /// Prefix sanitized names with `img-` unless they already carry a known prefix.
    pub seo_prefix: bool,
    /// Write progressive JPEG scans (baseline format only).
    pub progressive: bool,
    /// Lossless WebP when WebP is the primary format.
    pub lossless: bool,
    /// WebP compression effort (0-6) when WebP is the primary format.
    pub method: u8,
    /// Also write a WebP rendition (requires a WebP output directory).
    pub create_webp: bool,
    pub webp_lossless: bool,
    /// WebP companion compression effort (0-6).
    pub webp_method: u8,
    /// AVIF encoder speed (1 = slowest/smallest, 10 = fastest).
    pub avif_speed: u8,
    /// Maximum number of parallel workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Metadata written into every output image.
    pub custom_exif: CustomExif,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            webp_quality: 85,
            max_width: 1920,
            max_height: 1080,
            remove_exif: true,
            optimize_for_web: true,
            thumbnail_sizes: vec![150, 300, 600],
            create_thumbnails: false,
            preserve_transparency: true,
            seo_friendly_names: true,
            seo_prefix: true,
            progressive: true,
            lossless: false,
            method: 6,
            create_webp: true,
            webp_lossless: false,
            webp_method: 6,
            avif_speed: 8,
            max_processes: None,
            custom_exif: CustomExif::default(),
        }
    }
}

impl ConvertConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if !(1..=100).contains(&self.webp_quality) {
            return Err(ConfigError::Validation("webp_quality must be 1-100".into()));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConfigError::Validation(
                "max_width and max_height must be positive".into(),
            ));
        }
        if self.method > 6 {
            return Err(ConfigError::Validation("method must be 0-6".into()));
        }
        if self.webp_method > 6 {
            return Err(ConfigError::Validation("webp_method must be 0-6".into()));
        }
        if !(1..=10).contains(&self.avif_speed) {
            return Err(ConfigError::Validation("avif_speed must be 1-10".into()));
        }
        if self.thumbnail_sizes.contains(&0) {
            return Err(ConfigError::Validation(
                "thumbnail_sizes values must be positive".into(),
            ));
        }
        if self.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "max_processes must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

/// Custom metadata fields, keyed by their EXIF names in the JSON file.
///
/// `Website` has no EXIF tag of its own; it is folded into the comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustomExif {
    #[serde(rename = "Artist")]
    pub artist: String,
    #[serde(rename = "Copyright")]
    pub copyright: String,
    #[serde(rename = "Software")]
    pub software: String,
    #[serde(rename = "Make")]
    pub make: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "ImageDescription")]
    pub image_description: String,
    #[serde(rename = "XPComment")]
    pub xp_comment: String,
    #[serde(rename = "XPKeywords")]
    pub xp_keywords: String,
    #[serde(rename = "XPSubject")]
    pub xp_subject: String,
    #[serde(rename = "Website")]
    pub website: String,
}

impl CustomExif {
    /// True when at least one field carries a value.
    pub fn any_set(&self) -> bool {
        self.entries().iter().any(|(_, v)| !v.is_empty())
    }

    /// All fields with their JSON names, in declaration order.
    pub fn entries(&self) -> [(&'static str, &str); 10] {
        [
            ("Artist", self.artist.as_str()),
            ("Copyright", self.copyright.as_str()),
            ("Software", self.software.as_str()),
            ("Make", self.make.as_str()),
            ("Model", self.model.as_str()),
            ("ImageDescription", self.image_description.as_str()),
            ("XPComment", self.xp_comment.as_str()),
            ("XPKeywords", self.xp_keywords.as_str()),
            ("XPSubject", self.xp_subject.as_str()),
            ("Website", self.website.as_str()),
        ]
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ConvertConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and saving
// =============================================================================

/// Returns the stock default config as a JSON object.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> serde_json::Value {
    // A plain struct of scalars, strings and vectors always serializes.
    serde_json::to_value(ConvertConfig::default()).unwrap_or_default()
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Objects are merged key-by-key (overlay keys override base keys).
/// - Non-object values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_json(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    match (base, overlay) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_json(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: serde_json::Value,
    overlay: Option<serde_json::Value>,
) -> Result<ConvertConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_json(base, ov),
        None => base,
    };
    let config: ConvertConfig = serde_json::from_value(merged)?;
    config.validate()?;
    Ok(config)
}

/// Read a config file as a raw JSON overlay, without validation.
pub fn read_overlay(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a JSON config file and overlay it on the stock defaults.
///
/// Rejects unknown keys and validates the result.
pub fn load_config(path: &Path) -> Result<ConvertConfig, ConfigError> {
    resolve_config(stock_defaults_value(), Some(read_overlay(path)?))
}

/// Write the full config as pretty-printed UTF-8 JSON.
pub fn save_config(config: &ConvertConfig, path: &Path) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;
    Ok(())
}

/// The stock config document, used by the `gen-config` command.
pub fn stock_config_json() -> String {
    serde_json::to_string_pretty(&ConvertConfig::default()).unwrap_or_default()
}
