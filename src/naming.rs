//! SEO-friendly output filenames.
//!
//! Every generated file (primary output, WebP companion, thumbnails) is named
//! from the *sanitized stem* of its source file. Sanitizing is a pure,
//! deterministic function of the stem and the naming options:
//!
//! - `"My Holiday Photo"` → `"img-my-holiday-photo"`
//! - `"عکس ۱"` → `"img-aks-1"`
//! - `"photo-Beach__2024"` → `"photo-beach__2024"` (known prefix kept)
//!
//! ## Transliteration
//!
//! Persian/Arabic letters and Arabic-Indic digits are mapped to Latin through
//! [`TRANSLITERATION`], a constant table. Extending the alphabet means adding
//! rows to the table, nothing else.
//!
//! ## Empty Results
//!
//! A stem made only of characters that are neither kept nor mapped (e.g.
//! `"!!!"` or `"★"`) would sanitize to nothing. Such stems get a placeholder
//! `untitled-<hash>` where `<hash>` is the first 8 hex digits of the SHA-256
//! of the original stem, so distinct sources keep distinct names across runs.

use sha2::{Digest, Sha256};

/// Fixed source-letter → Latin mapping, applied after lower-casing.
pub const TRANSLITERATION: &[(char, &str)] = &[
    ('ا', "a"),
    ('ب', "b"),
    ('پ', "p"),
    ('ت', "t"),
    ('ث', "s"),
    ('ج', "j"),
    ('چ', "ch"),
    ('ح', "h"),
    ('خ', "kh"),
    ('د', "d"),
    ('ذ', "z"),
    ('ر', "r"),
    ('ز', "z"),
    ('ژ', "zh"),
    ('س', "s"),
    ('ش', "sh"),
    ('ص', "s"),
    ('ض', "z"),
    ('ط', "t"),
    ('ظ', "z"),
    ('ع', "a"),
    ('غ', "gh"),
    ('ف', "f"),
    ('ق', "gh"),
    ('ک', "k"),
    ('گ', "g"),
    ('ل', "l"),
    ('م', "m"),
    ('ن', "n"),
    ('و', "v"),
    ('ه', "h"),
    ('ی', "i"),
    ('ئ', "i"),
    ('ء', "a"),
    ('آ', "a"),
    ('ة', "h"),
    ('ى', "i"),
    ('ي', "i"),
    ('ك', "k"),
    ('ؤ', "o"),
    ('إ', "a"),
    ('أ', "a"),
    ('٠', "0"),
    ('١', "1"),
    ('٢', "2"),
    ('٣', "3"),
    ('٤', "4"),
    ('٥', "5"),
    ('٦', "6"),
    ('٧', "7"),
    ('٨', "8"),
    ('٩', "9"),
    ('۰', "0"),
    ('۱', "1"),
    ('۲', "2"),
    ('۳', "3"),
    ('۴', "4"),
    ('۵', "5"),
    ('۶', "6"),
    ('۷', "7"),
    ('۸', "8"),
    ('۹', "9"),
];

/// Prefixes that already mark a name as an image; anything else gets [`DEFAULT_PREFIX`].
pub const ACCEPTED_PREFIXES: &[&str] = &["img-", "photo-", "image-"];

pub const DEFAULT_PREFIX: &str = "img-";

const PLACEHOLDER_STEM: &str = "untitled";

/// How output stems are derived from source stems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingOptions {
    /// Transliterate and slugify. When false the stem is used as-is.
    pub enabled: bool,
    /// Add [`DEFAULT_PREFIX`] unless an accepted prefix is present.
    pub prefix: bool,
}

impl NamingOptions {
    pub fn from_config(config: &crate::config::ConvertConfig) -> Self {
        Self {
            enabled: config.seo_friendly_names,
            prefix: config.seo_prefix,
        }
    }
}

fn transliterate(c: char) -> Option<&'static str> {
    TRANSLITERATION
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
}

fn is_kept(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Turn a file stem into a web-safe name.
///
/// See the [module docs](self) for the rules. Idempotent when enabled:
/// `sanitize(&sanitize(x, o), o) == sanitize(x, o)`.
pub fn sanitize(stem: &str, options: NamingOptions) -> String {
    if !options.enabled {
        return stem.to_string();
    }

    let mut slug = String::with_capacity(stem.len());
    for c in stem.to_lowercase().chars() {
        let piece = match transliterate(c) {
            Some(latin) => latin,
            None if is_kept(c) => {
                push_collapsing(&mut slug, c);
                continue;
            }
            None => "-",
        };
        for p in piece.chars() {
            push_collapsing(&mut slug, p);
        }
    }

    let mut name = slug.trim_matches('-').to_string();
    if name.is_empty() {
        name = placeholder(stem);
    }

    if options.prefix && !ACCEPTED_PREFIXES.iter().any(|p| name.starts_with(p)) {
        name = format!("{DEFAULT_PREFIX}{name}");
    }
    name
}

/// Append `c`, dropping a hyphen that would follow another hyphen.
fn push_collapsing(out: &mut String, c: char) {
    if c == '-' && out.ends_with('-') {
        return;
    }
    out.push(c);
}

fn placeholder(original: &str) -> String {
    let digest = Sha256::digest(original.as_bytes());
    let hex: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("{PLACEHOLDER_STEM}-{hex}")
}
