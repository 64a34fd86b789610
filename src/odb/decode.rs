//! Parsers turning raw object bytes into typed records.
//!
//! Commit and tree encodings are line/entry oriented text-with-binary
//! formats; anything that parses as an envelope but violates the expected
//! structure surfaces as `MalformedObject`.

use chrono::{DateTime, FixedOffset};

use crate::error::{AnalyzerError, Result};
use crate::models::{Commit, EntryKind, Signature, Tree, TreeEntry};
use crate::odb::ObjectId;

/// Parses a raw commit object.
///
/// Parent lines are kept in encoding order; that order is what gives the
/// first parent its priority in merge diffs.
pub(crate) fn decode_commit(id: ObjectId, data: &[u8]) -> Result<Commit> {
    let boundary = find_blank_line(data);
    let (header, message) = match boundary {
        Some(i) => (&data[..i], &data[i + 2..]),
        None => (data, &data[data.len()..]),
    };

    let header = std::str::from_utf8(header)
        .map_err(|_| AnalyzerError::malformed("commit", format!("{id}: non-utf8 header")))?;

    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut committer = None;

    for line in header.lines() {
        // Continuation lines (multi-line headers such as gpgsig) are opaque.
        if line.starts_with(' ') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("tree ") {
            tree = Some(ObjectId::from_hex(rest).map_err(|_| {
                AnalyzerError::malformed("commit", format!("{id}: bad tree id {rest:?}"))
            })?);
        } else if let Some(rest) = line.strip_prefix("parent ") {
            parents.push(ObjectId::from_hex(rest).map_err(|_| {
                AnalyzerError::malformed("commit", format!("{id}: bad parent id {rest:?}"))
            })?);
        } else if let Some(rest) = line.strip_prefix("author ") {
            author = Some(parse_signature(id, rest)?);
        } else if let Some(rest) = line.strip_prefix("committer ") {
            committer = Some(parse_signature(id, rest)?);
        }
        // Unknown headers (encoding, mergetag, ...) are ignored.
    }

    let tree =
        tree.ok_or_else(|| AnalyzerError::malformed("commit", format!("{id}: missing tree line")))?;
    let author = author
        .ok_or_else(|| AnalyzerError::malformed("commit", format!("{id}: missing author line")))?;
    let committer = committer.ok_or_else(|| {
        AnalyzerError::malformed("commit", format!("{id}: missing committer line"))
    })?;

    Ok(Commit {
        id,
        parents,
        tree,
        author,
        committer,
        message: String::from_utf8_lossy(message).into_owned(),
    })
}

fn find_blank_line(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\n\n")
}

/// Parses `"Name <email> <epoch-seconds> <±hhmm>"`.
fn parse_signature(id: ObjectId, text: &str) -> Result<Signature> {
    let malformed = || AnalyzerError::malformed("commit", format!("{id}: bad signature {text:?}"));

    let open = text.rfind(" <").ok_or_else(malformed)?;
    let close = text.rfind('>').ok_or_else(malformed)?;
    if close < open {
        return Err(malformed());
    }

    let name = text[..open].to_string();
    let email = text[open + 2..close].to_string();

    let mut tail = text[close + 1..].split_whitespace();
    let seconds: i64 = tail.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let tz = tail.next().ok_or_else(malformed)?;
    let when = build_timestamp(seconds, tz).ok_or_else(malformed)?;

    Ok(Signature { name, email, when })
}

fn build_timestamp(seconds: i64, tz: &str) -> Option<DateTime<FixedOffset>> {
    let (sign, digits) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some(DateTime::from_timestamp(seconds, 0)?.with_timezone(&offset))
}

/// Parses a raw tree object: repeated `"<mode> <name>\0<20-byte id>"`.
pub(crate) fn decode_tree(id: ObjectId, data: &[u8]) -> Result<Tree> {
    let mut entries: Vec<TreeEntry> = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let space = data[pos..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| AnalyzerError::malformed("tree", format!("{id}: truncated mode")))?;
        let mode_text = std::str::from_utf8(&data[pos..pos + space])
            .map_err(|_| AnalyzerError::malformed("tree", format!("{id}: non-ascii mode")))?;
        let mode = u32::from_str_radix(mode_text, 8)
            .map_err(|_| AnalyzerError::malformed("tree", format!("{id}: bad mode {mode_text:?}")))?;
        pos += space + 1;

        let nul = data[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| AnalyzerError::malformed("tree", format!("{id}: truncated name")))?;
        let name = String::from_utf8_lossy(&data[pos..pos + nul]).into_owned();
        if name.is_empty() {
            return Err(AnalyzerError::malformed("tree", format!("{id}: empty entry name")));
        }
        pos += nul + 1;

        let raw = data
            .get(pos..pos + ObjectId::LEN)
            .ok_or_else(|| AnalyzerError::malformed("tree", format!("{id}: truncated entry id")))?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(raw);
        pos += ObjectId::LEN;

        let kind = classify_mode(mode).ok_or_else(|| {
            AnalyzerError::malformed("tree", format!("{id}: invalid entry mode {mode:o}"))
        })?;

        if entries.iter().any(|e| e.name == name) {
            return Err(AnalyzerError::malformed(
                "tree",
                format!("{id}: duplicate entry name {name:?}"),
            ));
        }

        entries.push(TreeEntry {
            name,
            kind,
            id: ObjectId::from_bytes(bytes),
            mode,
        });
    }

    Ok(Tree { entries })
}

/// Mode classification: `40000` is a subtree; regular files, executables,
/// symlinks, and submodule references are all file-like here (the latter
/// two are opaque and never dereferenced).
fn classify_mode(mode: u32) -> Option<EntryKind> {
    match mode >> 12 {
        0o04 => Some(EntryKind::Subtree),
        0o10 | 0o12 | 0o16 => Some(EntryKind::File),
        _ => None,
    }
}
