//! The object database: content-addressed, read-only storage resolution.
//!
//! `ObjectStore` hides whether an object is stored loose or packed and
//! memoizes decoded commits and trees for the analysis session. Content
//! addressing means cached records never need invalidation.

pub mod decode;
pub mod loose;
pub mod object_id;
pub mod pack;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{AnalyzerError, Result};
use crate::models::{Commit, Tree};
use pack::{PackEntry, PackFile};

pub use object_id::ObjectId;

/// Type tag of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    pub(crate) fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "commit" => Some(ObjectKind::Commit),
            "tree" => Some(ObjectKind::Tree),
            "blob" => Some(ObjectKind::Blob),
            "tag" => Some(ObjectKind::Tag),
            _ => None,
        }
    }

    pub(crate) fn from_type_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ObjectKind::Commit),
            2 => Some(ObjectKind::Tree),
            3 => Some(ObjectKind::Blob),
            4 => Some(ObjectKind::Tag),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
            ObjectKind::Tag => "tag",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Read-only access to one repository's `objects/` directory.
///
/// Resolution tries loose storage first, then each pack. Decoded commits
/// and trees are cached in concurrent maps keyed by id; a racing decode of
/// the same id is idempotent, so no per-key decode lock is needed beyond
/// the map's own sharding.
#[derive(Debug)]
pub struct ObjectStore {
    objects_dir: PathBuf,
    packs: Vec<PackFile>,
    commits: DashMap<ObjectId, Arc<Commit>>,
    trees: DashMap<ObjectId, Arc<Tree>>,
}

impl ObjectStore {
    /// Opens the store rooted at an `objects/` directory, loading every
    /// pack index found under `objects/pack/`.
    pub fn open(objects_dir: impl AsRef<Path>) -> Result<Self> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        if !objects_dir.is_dir() {
            return Err(AnalyzerError::RepoNotFound(
                objects_dir.display().to_string(),
            ));
        }

        let mut packs = Vec::new();
        let pack_dir = objects_dir.join("pack");
        if pack_dir.is_dir() {
            let mut idx_paths: Vec<PathBuf> = std::fs::read_dir(&pack_dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "idx"))
                .collect();
            idx_paths.sort();
            for idx_path in idx_paths {
                packs.push(PackFile::open(&idx_path)?);
            }
        }

        tracing::debug!(
            objects = %objects_dir.display(),
            packs = packs.len(),
            packed_objects = packs.iter().map(|p| p.object_count()).sum::<usize>(),
            "opened object store"
        );

        Ok(ObjectStore {
            objects_dir,
            packs,
            commits: DashMap::new(),
            trees: DashMap::new(),
        })
    }

    /// Resolves an id to its type tag and fully materialized bytes.
    pub fn resolve(&self, id: ObjectId) -> Result<(ObjectKind, Vec<u8>)> {
        if let Some(found) = loose::read_loose(&self.objects_dir, &id)? {
            return Ok(found);
        }
        for (pack_index, pack) in self.packs.iter().enumerate() {
            if let Some(offset) = pack.lookup(&id) {
                return self.resolve_packed(pack_index, offset);
            }
        }
        Err(AnalyzerError::ObjectNotFound(id))
    }

    /// Materializes a packed entry, chasing its delta chain iteratively.
    ///
    /// A visited set over (pack, offset) and over base ids rejects cyclic
    /// chains as corruption instead of looping.
    fn resolve_packed(&self, pack_index: usize, offset: u64) -> Result<(ObjectKind, Vec<u8>)> {
        let mut layers: Vec<Vec<u8>> = Vec::new();
        let mut seen_offsets: HashSet<(usize, u64)> = HashSet::new();
        let mut seen_ids: HashSet<ObjectId> = HashSet::new();
        let mut cursor = (pack_index, offset);

        let (kind, mut bytes) = loop {
            if !seen_offsets.insert(cursor) {
                return Err(AnalyzerError::corrupt("cyclic delta chain".to_string()));
            }
            match self.packs[cursor.0].read_entry_at(cursor.1)? {
                PackEntry::Full { kind, data } => break (kind, data),
                PackEntry::OfsDelta { base_offset, delta } => {
                    layers.push(delta);
                    cursor = (cursor.0, base_offset);
                }
                PackEntry::RefDelta { base, delta } => {
                    if !seen_ids.insert(base) {
                        return Err(AnalyzerError::corrupt(format!(
                            "cyclic delta chain through {base}"
                        )));
                    }
                    layers.push(delta);
                    if let Some(found) = loose::read_loose(&self.objects_dir, &base)? {
                        break found;
                    }
                    let located = self
                        .packs
                        .iter()
                        .enumerate()
                        .find_map(|(i, p)| p.lookup(&base).map(|off| (i, off)));
                    match located {
                        Some(next) => cursor = next,
                        None => {
                            return Err(AnalyzerError::corrupt(format!(
                                "delta base {base} absent from storage"
                            )));
                        }
                    }
                }
            }
        };

        // Innermost base first; apply the layers back out to the object.
        for delta in layers.into_iter().rev() {
            bytes = pack::apply_delta(&bytes, &delta)?;
        }
        Ok((kind, bytes))
    }

    /// Decoded commit, memoized for the session.
    pub fn commit(&self, id: ObjectId) -> Result<Arc<Commit>> {
        if let Some(cached) = self.commits.get(&id) {
            return Ok(Arc::clone(&cached));
        }
        let (kind, bytes) = self.resolve(id)?;
        if kind != ObjectKind::Commit {
            return Err(AnalyzerError::corrupt(format!(
                "{id} resolves to a {kind} object, expected commit"
            )));
        }
        let commit = Arc::new(decode::decode_commit(id, &bytes)?);
        self.commits.insert(id, Arc::clone(&commit));
        Ok(commit)
    }

    /// Decoded tree, memoized for the session.
    pub fn tree(&self, id: ObjectId) -> Result<Arc<Tree>> {
        if let Some(cached) = self.trees.get(&id) {
            return Ok(Arc::clone(&cached));
        }
        let (kind, bytes) = self.resolve(id)?;
        if kind != ObjectKind::Tree {
            return Err(AnalyzerError::corrupt(format!(
                "{id} resolves to a {kind} object, expected tree"
            )));
        }
        let tree = Arc::new(decode::decode_tree(id, &bytes)?);
        self.trees.insert(id, Arc::clone(&tree));
        Ok(tree)
    }

    /// Raw blob bytes. Not memoized: a blob is touched at most a handful
    /// of times per analysis and can dwarf the metadata objects.
    pub fn blob(&self, id: ObjectId) -> Result<Vec<u8>> {
        let (kind, bytes) = self.resolve(id)?;
        if kind != ObjectKind::Blob {
            return Err(AnalyzerError::corrupt(format!(
                "{id} resolves to a {kind} object, expected blob"
            )));
        }
        Ok(bytes)
    }
}
