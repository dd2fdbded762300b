//! Single-entry zip archive support.
//!
//! Every GeoJSON object in the bucket is stored as a zip container holding
//! exactly one text entry. This module converts between container bytes and
//! the entry text, entirely in memory.

use std::io::{Cursor, Read, Write};

use bytes::Bytes;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::AggregatorError;

/// Open archive bytes and return the text content of the first entry.
///
/// Archives written by this system contain a single entry. Should a container
/// hold more than one entry, the entry at index 0 is read and the rest are
/// ignored; backup archives reuse this codec, so the entry selection must stay
/// stable.
///
/// Fails if the container is empty, corrupt or the entry is not UTF-8 text.
///
/// # Arguments
///
/// * `data`: Compressed container bytes
pub fn unwrap_single_entry(data: &Bytes) -> Result<String, AggregatorError> {
    let mut archive = ZipArchive::new(Cursor::new(data.as_ref()))?;
    if archive.len() == 0 {
        return Err(AggregatorError::ArchiveEmpty);
    }
    let mut entry = archive.by_index(0)?;
    let mut text = String::with_capacity(entry.size() as usize);
    entry.read_to_string(&mut text)?;
    Ok(text)
}

/// Build an in-memory zip container holding a single named text entry.
///
/// # Arguments
///
/// * `text`: Entry content, encoded as UTF-8
/// * `entry_name`: Name of the single entry inside the container
pub fn wrap_single_entry(text: &str, entry_name: &str) -> Result<Bytes, AggregatorError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        writer.start_file(entry_name, FileOptions::default())?;
        writer.write_all(text.as_bytes())?;
        writer.finish()?;
    }
    Ok(cursor.into_inner().into())
}
