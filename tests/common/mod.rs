//! Synthetic on-disk repository fixtures.
//!
//! The store trusts the id-to-bytes mapping supplied by the format, so
//! fixtures may fabricate ids from a counter instead of hashing content;
//! what matters is that every id is unique within a fixture.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tempfile::TempDir;

use repo_analyzer::ObjectId;

pub struct TestRepo {
    dir: TempDir,
    next_id: u32,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("objects/pack")).unwrap();
        fs::create_dir_all(dir.path().join("refs/heads")).unwrap();
        TestRepo { dir, next_id: 0 }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.dir.path().join("objects")
    }

    pub fn fresh_id(&mut self) -> ObjectId {
        self.next_id += 1;
        let mut bytes = [0u8; 20];
        bytes[16..].copy_from_slice(&self.next_id.to_be_bytes());
        ObjectId::from_bytes(bytes)
    }

    /// Writes a loose object with the standard envelope.
    pub fn write_loose(&self, id: ObjectId, kind: &str, content: &[u8]) {
        let mut raw = format!("{kind} {}\0", content.len()).into_bytes();
        raw.extend_from_slice(content);

        let hex = id.to_hex();
        let dir = self.objects_dir().join(&hex[..2]);
        fs::create_dir_all(&dir).unwrap();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        fs::write(dir.join(&hex[2..]), encoder.finish().unwrap()).unwrap();
    }

    /// Writes a file that is not valid zlib where a loose object belongs.
    pub fn write_garbage_loose(&self, id: ObjectId) {
        let hex = id.to_hex();
        let dir = self.objects_dir().join(&hex[..2]);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(&hex[2..]), b"definitely not zlib").unwrap();
    }

    pub fn blob(&mut self, content: &[u8]) -> ObjectId {
        let id = self.fresh_id();
        self.write_loose(id, "blob", content);
        id
    }

    /// `entries` are (mode, name, id) triples in the order to encode.
    pub fn tree(&mut self, entries: &[(&str, &str, ObjectId)]) -> ObjectId {
        let id = self.fresh_id();
        self.write_loose(id, "tree", &tree_bytes(entries));
        id
    }

    pub fn commit(&mut self, tree: ObjectId, parents: &[ObjectId], time: i64) -> ObjectId {
        let id = self.fresh_id();
        self.write_loose(id, "commit", &commit_bytes(tree, parents, time));
        id
    }

    /// Points `HEAD` at a branch holding the given commit.
    pub fn set_head(&self, id: ObjectId) {
        fs::write(self.path().join("HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(
            self.path().join("refs/heads/main"),
            format!("{}\n", id.to_hex()),
        )
        .unwrap();
    }

    /// Records a branch only in `packed-refs`, no loose ref file.
    pub fn set_packed_ref(&self, name: &str, id: ObjectId) {
        let line = format!("# pack-refs with: peeled\n{} {name}\n", id.to_hex());
        fs::write(self.path().join("packed-refs"), line).unwrap();
    }

    /// Serializes `entries` into `objects/pack/pack-test.{pack,idx}`.
    pub fn write_pack(&self, entries: &[(ObjectId, PackObject)]) {
        let mut pack = Vec::new();
        pack.extend_from_slice(b"PACK");
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&(entries.len() as u32).to_be_bytes());

        let mut offsets = Vec::new();
        for (_, object) in entries {
            let offset = pack.len() as u64;
            offsets.push(offset);
            match object {
                PackObject::Full { type_code, data } => {
                    pack.extend_from_slice(&entry_header(*type_code, data.len()));
                    pack.extend_from_slice(&deflate(data));
                }
                PackObject::RefDelta { base, delta } => {
                    pack.extend_from_slice(&entry_header(7, delta.len()));
                    pack.extend_from_slice(base.as_bytes());
                    pack.extend_from_slice(&deflate(delta));
                }
                PackObject::OfsDelta { base_index, delta } => {
                    pack.extend_from_slice(&entry_header(6, delta.len()));
                    pack.extend_from_slice(&ofs_distance(offset - offsets[*base_index]));
                    pack.extend_from_slice(&deflate(delta));
                }
            }
        }
        // Trailing checksum, unverified by the reader.
        pack.extend_from_slice(&[0u8; 20]);

        let mut indexed: Vec<(ObjectId, u64)> = entries
            .iter()
            .map(|(id, _)| *id)
            .zip(offsets)
            .collect();
        indexed.sort_by_key(|(id, _)| *id);

        let mut idx = Vec::new();
        idx.extend_from_slice(&0xff74_4f63u32.to_be_bytes());
        idx.extend_from_slice(&2u32.to_be_bytes());
        for first_byte in 0..=255u8 {
            let below = indexed
                .iter()
                .filter(|(id, _)| id.as_bytes()[0] <= first_byte)
                .count() as u32;
            idx.extend_from_slice(&below.to_be_bytes());
        }
        for (id, _) in &indexed {
            idx.extend_from_slice(id.as_bytes());
        }
        for _ in &indexed {
            idx.extend_from_slice(&0u32.to_be_bytes()); // crc, unused
        }
        for (_, offset) in &indexed {
            idx.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
        idx.extend_from_slice(&[0u8; 40]); // trailing checksums

        let pack_dir = self.objects_dir().join("pack");
        fs::write(pack_dir.join("pack-test.pack"), pack).unwrap();
        fs::write(pack_dir.join("pack-test.idx"), idx).unwrap();
    }
}

pub enum PackObject {
    Full { type_code: u8, data: Vec<u8> },
    RefDelta { base: ObjectId, delta: Vec<u8> },
    OfsDelta { base_index: usize, delta: Vec<u8> },
}

pub fn commit_bytes(tree: ObjectId, parents: &[ObjectId], time: i64) -> Vec<u8> {
    let mut text = format!("tree {tree}\n");
    for parent in parents {
        text.push_str(&format!("parent {parent}\n"));
    }
    text.push_str(&format!("author Test Author <author@example.com> {time} +0000\n"));
    text.push_str(&format!("committer Test Committer <committer@example.com> {time} +0000\n"));
    text.push_str("\ntest commit\n");
    text.into_bytes()
}

pub fn tree_bytes(entries: &[(&str, &str, ObjectId)]) -> Vec<u8> {
    let mut data = Vec::new();
    for (mode, name, id) in entries {
        data.extend_from_slice(mode.as_bytes());
        data.push(b' ');
        data.extend_from_slice(name.as_bytes());
        data.push(0);
        data.extend_from_slice(id.as_bytes());
    }
    data
}

/// A delta that ignores its base and inserts `content` literally.
pub fn insert_delta(base_len: usize, content: &[u8]) -> Vec<u8> {
    let mut delta = size_varint(base_len);
    delta.extend_from_slice(&size_varint(content.len()));
    for chunk in content.chunks(0x7f) {
        delta.push(chunk.len() as u8);
        delta.extend_from_slice(chunk);
    }
    delta
}

fn size_varint(mut value: usize) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn entry_header(type_code: u8, mut size: usize) -> Vec<u8> {
    let mut out = vec![(type_code << 4) | (size & 0x0f) as u8];
    size >>= 4;
    while size > 0 {
        *out.last_mut().unwrap() |= 0x80;
        out.push((size & 0x7f) as u8);
        size >>= 7;
    }
    out
}

fn ofs_distance(mut distance: u64) -> Vec<u8> {
    let mut out = vec![(distance & 0x7f) as u8];
    distance >>= 7;
    while distance > 0 {
        distance -= 1;
        out.push(0x80 | (distance & 0x7f) as u8);
        distance >>= 7;
    }
    out.reverse();
    out
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
