//! Loose object storage: one zlib-compressed file per object under
//! `objects/`, keyed by the first two hex digits of the id.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use flate2::read::ZlibDecoder;

use crate::error::{AnalyzerError, Result};
use crate::odb::{ObjectId, ObjectKind};

/// Reads and inflates a loose object, returning `None` when no loose file
/// exists for the id (the caller then falls back to packed storage).
pub(crate) fn read_loose(objects_dir: &Path, id: &ObjectId) -> Result<Option<(ObjectKind, Vec<u8>)>> {
    let hex = id.to_hex();
    let path = objects_dir.join(&hex[..2]).join(&hex[2..]);

    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut raw = Vec::new();
    ZlibDecoder::new(file)
        .read_to_end(&mut raw)
        .map_err(|e| AnalyzerError::corrupt(format!("inflating loose object {id}: {e}")))?;

    let (kind, content) = parse_envelope(id, &raw)?;
    Ok(Some((kind, content)))
}

/// Splits the decompressed envelope `"<type> <size>\0<content>"`.
fn parse_envelope(id: &ObjectId, raw: &[u8]) -> Result<(ObjectKind, Vec<u8>)> {
    let nul = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| AnalyzerError::corrupt(format!("loose object {id}: missing header terminator")))?;

    let header = std::str::from_utf8(&raw[..nul])
        .map_err(|_| AnalyzerError::corrupt(format!("loose object {id}: non-ascii header")))?;

    let (tag, size) = header
        .split_once(' ')
        .ok_or_else(|| AnalyzerError::corrupt(format!("loose object {id}: bad header {header:?}")))?;

    let kind = ObjectKind::from_tag(tag)
        .ok_or_else(|| AnalyzerError::corrupt(format!("loose object {id}: unknown type {tag:?}")))?;

    let size: usize = size
        .parse()
        .map_err(|_| AnalyzerError::corrupt(format!("loose object {id}: bad size {size:?}")))?;

    let content = &raw[nul + 1..];
    if content.len() != size {
        return Err(AnalyzerError::corrupt(format!(
            "loose object {id}: size {size} does not match content length {}",
            content.len()
        )));
    }

    Ok((kind, content.to_vec()))
}
