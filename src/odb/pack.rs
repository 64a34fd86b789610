//! Packed object storage: `.idx` index files mapping ids to offsets into a
//! companion `.pack` data file whose entries are either full zlib-compressed
//! objects or deltas against a base object.
//!
//! Only version-2 indexes and version-2/3 pack headers are supported; older
//! single-generation encodings are the only packing variant this analyzer
//! consumes. Delta chains are resolved by the store, not here, because a
//! ref-delta base may live outside this pack.

use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

use crate::error::{AnalyzerError, Result};
use crate::odb::{ObjectId, ObjectKind};

const IDX_MAGIC: u32 = 0xff74_4f63; // "\xfftOc"
const PACK_MAGIC: &[u8; 4] = b"PACK";

/// One entry as stored in the pack, before delta resolution.
pub(crate) enum PackEntry {
    Full { kind: ObjectKind, data: Vec<u8> },
    /// Delta whose base sits `base_offset` bytes from the start of the
    /// same pack.
    OfsDelta { base_offset: u64, delta: Vec<u8> },
    /// Delta whose base is named by id and may live anywhere in the store.
    RefDelta { base: ObjectId, delta: Vec<u8> },
}

/// A pack index plus its data file, both held in memory for the session.
#[derive(Debug)]
pub(crate) struct PackFile {
    /// Ids sorted ascending, parallel to `offsets`.
    ids: Vec<ObjectId>,
    offsets: Vec<u64>,
    data: Vec<u8>,
}

impl PackFile {
    /// Opens the `.idx` at `idx_path` and its sibling `.pack`.
    pub(crate) fn open(idx_path: &Path) -> Result<Self> {
        let idx = std::fs::read(idx_path)?;
        let (ids, offsets) = parse_index(&idx)
            .map_err(|e| AnalyzerError::corrupt(format!("{}: {e}", idx_path.display())))?;

        let pack_path = idx_path.with_extension("pack");
        let data = std::fs::read(&pack_path)?;
        if data.len() < 12 || &data[..4] != PACK_MAGIC {
            return Err(AnalyzerError::corrupt(format!(
                "{}: bad pack header",
                pack_path.display()
            )));
        }

        tracing::debug!(
            pack = %pack_path.display(),
            objects = ids.len(),
            "loaded pack index"
        );

        Ok(PackFile { ids, offsets, data })
    }

    pub(crate) fn object_count(&self) -> usize {
        self.ids.len()
    }

    /// Binary search for the id; returns its byte offset into the pack.
    pub(crate) fn lookup(&self, id: &ObjectId) -> Option<u64> {
        self.ids.binary_search(id).ok().map(|i| self.offsets[i])
    }

    /// Reads the raw entry starting at `offset` without resolving deltas.
    pub(crate) fn read_entry_at(&self, offset: u64) -> Result<PackEntry> {
        let mut pos = offset as usize;
        if pos >= self.data.len() {
            return Err(AnalyzerError::corrupt(format!(
                "pack offset {offset} out of bounds"
            )));
        }

        let (type_code, size, header_len) = parse_entry_header(&self.data[pos..])
            .ok_or_else(|| AnalyzerError::corrupt(format!("truncated entry header at {offset}")))?;
        pos += header_len;

        match type_code {
            1..=4 => {
                let kind = ObjectKind::from_type_code(type_code).ok_or_else(|| {
                    AnalyzerError::corrupt(format!("bad object type {type_code} at {offset}"))
                })?;
                let data = self.inflate_at(pos, size)?;
                Ok(PackEntry::Full { kind, data })
            }
            6 => {
                let (distance, len) = parse_ofs_distance(&self.data[pos..]).ok_or_else(|| {
                    AnalyzerError::corrupt(format!("truncated delta offset at {offset}"))
                })?;
                pos += len;
                if distance == 0 || distance > offset {
                    return Err(AnalyzerError::corrupt(format!(
                        "delta base offset out of range at {offset}"
                    )));
                }
                let delta = self.inflate_at(pos, size)?;
                Ok(PackEntry::OfsDelta {
                    base_offset: offset - distance,
                    delta,
                })
            }
            7 => {
                if pos + ObjectId::LEN > self.data.len() {
                    return Err(AnalyzerError::corrupt(format!(
                        "truncated delta base id at {offset}"
                    )));
                }
                let mut raw = [0u8; 20];
                raw.copy_from_slice(&self.data[pos..pos + ObjectId::LEN]);
                pos += ObjectId::LEN;
                let delta = self.inflate_at(pos, size)?;
                Ok(PackEntry::RefDelta {
                    base: ObjectId::from_bytes(raw),
                    delta,
                })
            }
            other => Err(AnalyzerError::corrupt(format!(
                "unsupported pack entry type {other} at {offset}"
            ))),
        }
    }

    /// Inflates exactly `size` bytes of zlib stream starting at `pos`.
    fn inflate_at(&self, pos: usize, size: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; size];
        let mut decoder = ZlibDecoder::new(&self.data[pos.min(self.data.len())..]);
        decoder
            .read_exact(&mut out)
            .map_err(|e| AnalyzerError::corrupt(format!("inflating pack entry at {pos}: {e}")))?;
        Ok(out)
    }
}

/// Parses a version-2 pack index into parallel (id, offset) vectors.
fn parse_index(idx: &[u8]) -> std::result::Result<(Vec<ObjectId>, Vec<u64>), String> {
    let mut cur = Cursor::new(idx);

    let magic = cur.read_u32::<BigEndian>().map_err(|_| "truncated index")?;
    if magic != IDX_MAGIC {
        return Err("bad index magic".into());
    }
    let version = cur.read_u32::<BigEndian>().map_err(|_| "truncated index")?;
    if version != 2 {
        return Err(format!("unsupported index version {version}"));
    }

    // 256-entry fanout; the last slot is the total object count.
    let mut fanout = [0u32; 256];
    for slot in fanout.iter_mut() {
        *slot = cur.read_u32::<BigEndian>().map_err(|_| "truncated fanout")?;
    }
    let count = fanout[255] as usize;

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let mut raw = [0u8; 20];
        cur.read_exact(&mut raw).map_err(|_| "truncated id table")?;
        ids.push(ObjectId::from_bytes(raw));
    }

    // CRC table, unused by a read path that trusts the mapping.
    let crc_len = count as u64 * 4;
    cur.set_position(cur.position() + crc_len);

    let mut small_offsets = Vec::with_capacity(count);
    for _ in 0..count {
        small_offsets.push(cur.read_u32::<BigEndian>().map_err(|_| "truncated offsets")?);
    }

    // Offsets with the high bit set index into a trailing 64-bit table.
    let mut large_offsets = Vec::new();
    let large_count = small_offsets.iter().filter(|o| *o & 0x8000_0000 != 0).count();
    for _ in 0..large_count {
        large_offsets.push(
            cur.read_u64::<BigEndian>()
                .map_err(|_| "truncated large offsets")?,
        );
    }

    let mut offsets = Vec::with_capacity(count);
    for raw in small_offsets {
        if raw & 0x8000_0000 == 0 {
            offsets.push(raw as u64);
        } else {
            let slot = (raw & 0x7fff_ffff) as usize;
            let off = large_offsets
                .get(slot)
                .copied()
                .ok_or("large offset slot out of range")?;
            offsets.push(off);
        }
    }

    Ok((ids, offsets))
}

/// Entry header: low nibble plus 7-bit continuation groups give the
/// inflated size, bits 4-6 of the first byte give the type.
fn parse_entry_header(data: &[u8]) -> Option<(u8, usize, usize)> {
    let first = *data.first()?;
    let type_code = (first >> 4) & 0x7;
    let mut size = (first & 0x0f) as usize;
    let mut shift = 4u32;
    let mut len = 1;
    let mut byte = first;
    while byte & 0x80 != 0 {
        if shift >= usize::BITS {
            return None;
        }
        byte = *data.get(len)?;
        size |= ((byte & 0x7f) as usize) << shift;
        shift += 7;
        len += 1;
    }
    Some((type_code, size, len))
}

/// The negative-distance encoding preceding an ofs-delta body.
fn parse_ofs_distance(data: &[u8]) -> Option<(u64, usize)> {
    let mut byte = *data.first()?;
    let mut distance = (byte & 0x7f) as u64;
    let mut len = 1;
    while byte & 0x80 != 0 {
        byte = *data.get(len)?;
        distance = distance
            .checked_add(1)?
            .checked_mul(1 << 7)?
            | (byte & 0x7f) as u64;
        len += 1;
    }
    Some((distance, len))
}

/// Applies one delta layer to a fully materialized base.
pub(crate) fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut pos = 0;
    let base_size = read_size_varint(delta, &mut pos)
        .ok_or_else(|| AnalyzerError::corrupt("truncated delta header".to_string()))?;
    let result_size = read_size_varint(delta, &mut pos)
        .ok_or_else(|| AnalyzerError::corrupt("truncated delta header".to_string()))?;

    if base_size != base.len() {
        return Err(AnalyzerError::corrupt(format!(
            "delta base size {base_size} does not match base length {}",
            base.len()
        )));
    }

    let mut out = Vec::with_capacity(result_size);
    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;
        if cmd & 0x80 != 0 {
            // Copy from base: offset/size bytes selected by the low bits.
            let mut offset = 0usize;
            for bit in 0..4 {
                if cmd & (1 << bit) != 0 {
                    let b = *delta
                        .get(pos)
                        .ok_or_else(|| AnalyzerError::corrupt("truncated copy op".to_string()))?;
                    offset |= (b as usize) << (8 * bit);
                    pos += 1;
                }
            }
            let mut size = 0usize;
            for bit in 0..3 {
                if cmd & (1 << (bit + 4)) != 0 {
                    let b = *delta
                        .get(pos)
                        .ok_or_else(|| AnalyzerError::corrupt("truncated copy op".to_string()))?;
                    size |= (b as usize) << (8 * bit);
                    pos += 1;
                }
            }
            if size == 0 {
                size = 0x10000;
            }
            let end = offset
                .checked_add(size)
                .filter(|&e| e <= base.len())
                .ok_or_else(|| AnalyzerError::corrupt("copy op outside base".to_string()))?;
            out.extend_from_slice(&base[offset..end]);
        } else if cmd != 0 {
            // Literal insert of `cmd` bytes.
            let size = cmd as usize;
            let chunk = delta
                .get(pos..pos + size)
                .ok_or_else(|| AnalyzerError::corrupt("truncated insert op".to_string()))?;
            out.extend_from_slice(chunk);
            pos += size;
        } else {
            return Err(AnalyzerError::corrupt("zero delta opcode".to_string()));
        }
    }

    if out.len() != result_size {
        return Err(AnalyzerError::corrupt(format!(
            "delta produced {} bytes, expected {result_size}",
            out.len()
        )));
    }
    Ok(out)
}

/// Little-endian 7-bit varint used by the delta size header.
fn read_size_varint(data: &[u8], pos: &mut usize) -> Option<usize> {
    let mut value = 0usize;
    let mut shift = 0u32;
    loop {
        if shift >= usize::BITS {
            return None;
        }
        let byte = *data.get(*pos)?;
        *pos += 1;
        value |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_header_small() {
        // type 3 (blob), size 5, single byte
        let (code, size, len) = parse_entry_header(&[0x35]).unwrap();
        assert_eq!((code, size, len), (3, 5, 1));
    }

    #[test]
    fn entry_header_continued() {
        // size = 0x0f | (0x12 << 4) = 0x12f, type commit
        let (code, size, len) = parse_entry_header(&[0x9f, 0x12]).unwrap();
        assert_eq!((code, size, len), (1, 0x12f, 2));
    }

    #[test]
    fn ofs_distance_multi_byte() {
        // single byte: distance = low 7 bits
        assert_eq!(parse_ofs_distance(&[0x05]).unwrap(), (5, 1));
        // two bytes: ((0x01 + 1) << 7) | 0x02 = 258
        assert_eq!(parse_ofs_distance(&[0x81, 0x02]).unwrap(), (258, 2));
    }

    #[test]
    fn delta_copy_and_insert() {
        let base = b"hello world";
        // header: base size 11, result size 9
        // copy offset 0 size 5 ("hello"), insert " rust" minus one... use: copy 5 + insert 4
        let delta = [
            11, 9, // sizes
            0x91, 0x00, 0x05, // copy: offset byte present, size byte present
            4, b'r', b'u', b's', b't', // insert 4 literal bytes
        ];
        let out = apply_delta(base, &delta).unwrap();
        assert_eq!(out, b"hellorust");
    }

    #[test]
    fn delta_base_size_mismatch() {
        let err = apply_delta(b"abc", &[9, 0]).unwrap_err();
        assert!(matches!(err, AnalyzerError::CorruptObject(_)));
    }

    #[test]
    fn delta_zero_opcode_is_corrupt() {
        let err = apply_delta(b"abc", &[3, 1, 0]).unwrap_err();
        assert!(matches!(err, AnalyzerError::CorruptObject(_)));
    }

    #[test]
    fn overlong_entry_header_is_rejected() {
        // A continuation run past the width of usize must not wrap.
        assert_eq!(parse_entry_header(&[0xff; 32]), None);
    }

    #[test]
    fn overlong_ofs_distance_is_rejected() {
        assert_eq!(parse_ofs_distance(&[0xff; 32]), None);
    }

    #[test]
    fn overlong_delta_size_is_corrupt() {
        let mut delta = vec![0xff; 32];
        delta.push(0x00);
        let err = apply_delta(b"abc", &delta).unwrap_err();
        assert!(matches!(err, AnalyzerError::CorruptObject(_)));
    }
}
