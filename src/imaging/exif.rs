//! EXIF record builder.
//!
//! Writes the configured custom fields into a TIFF-structured EXIF blob,
//! carrying over the first IFD of an existing blob when there is one.
//!
//! ## Tags
//!
//! | Field | Tag | Encoding |
//! |---|---|---|
//! | ImageDescription | 270 | ASCII |
//! | Make | 271 | ASCII |
//! | Model | 272 | ASCII |
//! | Software | 305 | ASCII |
//! | DateTime | 306 | ASCII, local time of writing |
//! | Artist | 315 | ASCII |
//! | Copyright | 33432 | ASCII |
//! | XPComment | 40092 | BYTE, UTF-16LE |
//! | XPKeywords | 40094 | BYTE, UTF-16LE |
//! | XPSubject | 40095 | BYTE, UTF-16LE |
//!
//! `Website` has no tag; it is appended to the XP comment.
//!
//! ## Carried-over entries
//!
//! Only IFD0 is read. Entries that hold file offsets (sub-IFD pointers,
//! strip/tile and thumbnail offsets) are dropped: the values they point at are
//! not copied, so the offsets would dangle. Big-endian input is rewritten
//! little-endian.
//!
//! ## Containers
//!
//! The blob is container-neutral. The backend wraps it in a JPEG APP1
//! segment or hands it to the WebP muxer as an `EXIF` chunk.

use crate::config::CustomExif;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExifError {
    #[error("Malformed EXIF data: {0}")]
    Malformed(String),
    #[error("EXIF data too large: {0} bytes")]
    TooLarge(usize),
}

/// Custom field name → EXIF tag. `Website` is handled separately.
pub const EXIF_TAGS: &[(&str, u16)] = &[
    ("Artist", 315),
    ("Copyright", 33432),
    ("Software", 305),
    ("Make", 271),
    ("Model", 272),
    ("ImageDescription", 270),
    ("XPComment", TAG_XP_COMMENT),
    ("XPKeywords", 40094),
    ("XPSubject", 40095),
];

pub const TAG_DATE_TIME: u16 = 306;
pub const TAG_XP_COMMENT: u16 = 40092;

const XP_TAGS: &[u16] = &[40091, TAG_XP_COMMENT, 40093, 40094, 40095];

/// Entries whose values are offsets into the original file.
const OFFSET_TAGS: &[u16] = &[
    0x0111, // StripOffsets
    0x0117, // StripByteCounts
    0x0144, // TileOffsets
    0x0145, // TileByteCounts
    0x014A, // SubIFDs
    0x0201, // JPEGInterchangeFormat
    0x0202, // JPEGInterchangeFormatLength
    0x8769, // ExifIFD
    0x8825, // GPSInfo
    0xA005, // InteroperabilityIFD
];

/// Largest TIFF payload that fits one JPEG APP1 segment next to `Exif\0\0`.
pub const MAX_EXIF_LEN: usize = 65_527;

const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    typ: u16,
    count: u32,
    /// Value bytes, little-endian.
    data: Vec<u8>,
}

impl Entry {
    fn ascii(value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        Self {
            typ: TYPE_ASCII,
            count: data.len() as u32,
            data,
        }
    }

    fn utf16(value: &str) -> Self {
        let mut data: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
        data.extend_from_slice(&[0, 0]);
        Self {
            typ: TYPE_BYTE,
            count: data.len() as u32,
            data,
        }
    }

    fn as_utf16(&self) -> String {
        let units: Vec<u16> = self
            .data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
            .trim_end_matches('\0')
            .to_string()
    }
}

/// Build the EXIF blob for one output.
///
/// Returns `existing` unchanged when no custom field is set.
pub fn inject(existing: Option<&[u8]>, custom: &CustomExif) -> Result<Option<Vec<u8>>, ExifError> {
    if !custom.any_set() {
        return Ok(existing.map(<[u8]>::to_vec));
    }
    let now = chrono::Local::now().format("%Y:%m:%d %H:%M:%S").to_string();
    build(existing, custom, &now).map(Some)
}

/// [`inject`] that never fails: errors are logged and `existing` is kept.
pub fn apply(existing: Option<&[u8]>, custom: &CustomExif) -> Option<Vec<u8>> {
    match inject(existing, custom) {
        Ok(blob) => blob,
        Err(e) => {
            tracing::warn!(error = %e, "could not write custom EXIF, keeping source metadata");
            existing.map(<[u8]>::to_vec)
        }
    }
}

fn build(
    existing: Option<&[u8]>,
    custom: &CustomExif,
    timestamp: &str,
) -> Result<Vec<u8>, ExifError> {
    let mut entries = match existing {
        Some(blob) => parse_ifd0(blob)?,
        None => BTreeMap::new(),
    };

    let existing_comment = entries.get(&TAG_XP_COMMENT).map(Entry::as_utf16);

    for ((name, value), (tag_name, tag)) in custom.entries().iter().zip(EXIF_TAGS) {
        debug_assert_eq!(name, tag_name);
        if value.is_empty() {
            continue;
        }
        let entry = if XP_TAGS.contains(tag) {
            Entry::utf16(value)
        } else {
            Entry::ascii(value)
        };
        entries.insert(*tag, entry);
    }

    if !custom.website.is_empty() {
        let comment = Some(custom.xp_comment.clone())
            .filter(|c| !c.is_empty())
            .or(existing_comment)
            .filter(|c| !c.is_empty());
        let comment = match comment {
            Some(c) => format!("{c} | Website: {}", custom.website),
            None => format!("Website: {}", custom.website),
        };
        entries.insert(TAG_XP_COMMENT, Entry::utf16(&comment));
    }

    entries.insert(TAG_DATE_TIME, Entry::ascii(timestamp));
    serialize(&entries)
}

// ---------------------------------------------------------------------------
// TIFF reading
// ---------------------------------------------------------------------------

/// Bytes per value for a TIFF field type, `None` for unknown types.
fn type_size(typ: u16) -> Option<usize> {
    match typ {
        1 | 2 | 6 | 7 => Some(1), // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => Some(2),         // SHORT, SSHORT
        4 | 9 | 11 => Some(4),    // LONG, SLONG, FLOAT
        5 | 10 | 12 => Some(8),   // RATIONAL, SRATIONAL, DOUBLE
        _ => None,
    }
}

/// Width of the integers that make up a value; rationals are two LONGs.
fn word_size(typ: u16) -> usize {
    match typ {
        3 | 8 => 2,
        4 | 9 | 11 | 5 | 10 => 4,
        12 => 8,
        _ => 1,
    }
}

fn parse_ifd0(blob: &[u8]) -> Result<BTreeMap<u16, Entry>, ExifError> {
    let data = blob.strip_prefix(b"Exif\0\0").unwrap_or(blob);
    let truncated = || ExifError::Malformed("IFD0 runs past the end of the data".into());

    let big_endian = match data.get(0..2) {
        Some(b"MM") => true,
        Some(b"II") => false,
        _ => return Err(ExifError::Malformed("missing TIFF byte-order mark".into())),
    };

    let read_u16 = |offset: usize| -> Option<u16> {
        let b = data.get(offset..offset.checked_add(2)?)?;
        Some(if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    };

    let read_u32 = |offset: usize| -> Option<u32> {
        let b = data.get(offset..offset.checked_add(4)?)?;
        Some(if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    };

    if read_u16(2) != Some(42) {
        return Err(ExifError::Malformed("bad TIFF magic".into()));
    }

    let ifd = read_u32(4).ok_or_else(truncated)? as usize;
    let count = read_u16(ifd).ok_or_else(truncated)? as usize;
    let mut entries = BTreeMap::new();

    for i in 0..count {
        let at = ifd + 2 + i * 12;
        let tag = read_u16(at).ok_or_else(truncated)?;
        let typ = read_u16(at + 2).ok_or_else(truncated)?;
        let n = read_u32(at + 4).ok_or_else(truncated)?;

        let Some(size) = type_size(typ) else {
            continue;
        };
        if OFFSET_TAGS.contains(&tag) {
            continue;
        }

        let byte_len = (n as usize).checked_mul(size).ok_or_else(truncated)?;
        let start = if byte_len <= 4 {
            at + 8
        } else {
            read_u32(at + 8).ok_or_else(truncated)? as usize
        };
        let end = start.checked_add(byte_len).ok_or_else(truncated)?;
        let raw = data.get(start..end).ok_or_else(truncated)?;

        let mut value = raw.to_vec();
        if big_endian {
            let word = word_size(typ);
            if word > 1 {
                value.chunks_exact_mut(word).for_each(<[u8]>::reverse);
            }
        }
        entries.insert(
            tag,
            Entry {
                typ,
                count: n,
                data: value,
            },
        );
    }

    Ok(entries)
}

// ---------------------------------------------------------------------------
// TIFF writing
// ---------------------------------------------------------------------------

/// Little-endian TIFF with a single IFD at offset 8. Large values follow the
/// IFD, each starting on an even offset.
fn serialize(entries: &BTreeMap<u16, Entry>) -> Result<Vec<u8>, ExifError> {
    let n = u16::try_from(entries.len()).map_err(|_| ExifError::TooLarge(entries.len()))?;
    let ifd_len = 2 + entries.len() * 12 + 4;

    let mut out = Vec::with_capacity(8 + ifd_len);
    out.extend_from_slice(b"II*\0");
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&n.to_le_bytes());

    let mut values = Vec::new();
    let values_start = 8 + ifd_len;

    for (tag, entry) in entries {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&entry.typ.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            out.extend_from_slice(&inline);
        } else {
            let offset = values_start + values.len();
            let offset = u32::try_from(offset).map_err(|_| ExifError::TooLarge(offset))?;
            out.extend_from_slice(&offset.to_le_bytes());
            values.extend_from_slice(&entry.data);
            if values.len() % 2 == 1 {
                values.push(0);
            }
        }
    }

    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&values);

    if out.len() > MAX_EXIF_LEN {
        return Err(ExifError::TooLarge(out.len()));
    }
    Ok(out)
}
