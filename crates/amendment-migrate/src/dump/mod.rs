//! Reading and parsing legacy SQL Server dump files.
//!
//! Pipeline, leaves first:
//!
//! - [`normalize`]: raw literal token to [`FieldValue`](crate::core::FieldValue)
//! - [`tokenize`]: one VALUES tuple to raw tokens
//! - [`extract`]: dump text to INSERT statements and their rows
//!
//! [`read_dump`] loads the file itself. SSMS "Generate Scripts" output is
//! UTF-16, so that is the assumed encoding.

pub mod extract;
pub mod normalize;
pub mod tokenize;

use std::path::Path;

use tracing::debug;

use crate::error::{MigrateError, Result};

pub use extract::{extract_statements, scan_table_names, RawRow, RawStatement, StatementExtractor};
pub use normalize::{normalize, normalize_date, normalize_flag, parse_date};
pub use tokenize::tokenize;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Read a dump file and decode it to text.
///
/// Fails only when the file cannot be read; undecodable content is replaced.
pub fn read_dump<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MigrateError::DumpNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let text = decode_dump(&bytes);
    debug!("Decoded {} bytes from {:?} into {} chars", bytes.len(), path, text.chars().count());
    Ok(text)
}

/// Decode dump bytes.
///
/// - `FF FE` BOM: UTF-16 little-endian
/// - `FE FF` BOM: UTF-16 big-endian
/// - `EF BB BF` BOM: UTF-8
/// - no BOM: UTF-16 little-endian
///
/// Invalid sequences become U+FFFD. A dangling odd byte is dropped.
pub fn decode_dump(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    let rest = bytes.strip_prefix(UTF16_LE_BOM).unwrap_or(bytes);
    decode_utf16(rest, u16::from_le_bytes)
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
