//! The analysis facade over one repository's object database.
//!
//! `Repository` owns the `ObjectStore` for the session and exposes the
//! read-only operations downstream consumers build on: commit counts and
//! listings, file paths at a commit, per-commit change deltas with line
//! counts, and per-path history. Everything here is derived from immutable
//! content-addressed objects, so all methods take `&self`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AnalyzerError, Result};
use crate::git::{diff, history, line_diff, tree};
use crate::models::{Commit, CommitDelta};
use crate::odb::{ObjectId, ObjectStore};

#[derive(Debug)]
pub struct Repository {
    store: ObjectStore,
    git_dir: PathBuf,
}

impl Repository {
    /// Opens a repository given its directory: a bare repository, a
    /// `.git` directory, or a worktree containing one.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let git_dir = if path.join("objects").is_dir() {
            path.to_path_buf()
        } else if path.join(".git").join("objects").is_dir() {
            path.join(".git")
        } else {
            return Err(AnalyzerError::RepoNotFound(path.display().to_string()));
        };

        let store = ObjectStore::open(git_dir.join("objects"))?;
        tracing::info!(git_dir = %git_dir.display(), "opened repository");
        Ok(Repository { store, git_dir })
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// The commit id `HEAD` resolves to, chasing symbolic refs.
    pub fn head_id(&self) -> Result<ObjectId> {
        let head = std::fs::read_to_string(self.git_dir.join("HEAD"))?;
        let head = head.trim();
        match head.strip_prefix("ref: ") {
            Some(name) => self.ref_id(name.trim()),
            None => ObjectId::from_hex(head),
        }
    }

    /// Resolves a fully qualified ref name (`refs/heads/...`), falling
    /// back to `packed-refs` when no loose ref file exists.
    pub fn ref_id(&self, name: &str) -> Result<ObjectId> {
        let loose = self.git_dir.join(name);
        if loose.is_file() {
            return ObjectId::from_hex(std::fs::read_to_string(loose)?.trim());
        }

        let packed = self.git_dir.join("packed-refs");
        if packed.is_file() {
            for line in std::fs::read_to_string(packed)?.lines() {
                // Peeled tag lines and comments carry no ref name.
                if line.starts_with('#') || line.starts_with('^') {
                    continue;
                }
                if let Some((hex, ref_name)) = line.split_once(' ') {
                    if ref_name.trim() == name {
                        return ObjectId::from_hex(hex);
                    }
                }
            }
        }

        Err(AnalyzerError::PathNotFound(name.to_string()))
    }

    pub fn commit(&self, id: ObjectId) -> Result<Arc<Commit>> {
        self.store.commit(id)
    }

    /// Total number of commits reachable from `HEAD`.
    pub fn total_commits(&self) -> Result<usize> {
        history::count(&self.store, &[self.head_id()?])
    }

    /// Every commit reachable from `HEAD`, most recent committer time
    /// first, ancestors strictly after their descendants.
    pub fn commits(&self) -> Result<Vec<Arc<Commit>>> {
        history::walk(&self.store, &[self.head_id()?])
    }

    /// File paths in the tree of the given commit, or of `HEAD`.
    pub fn file_paths(&self, commit: Option<ObjectId>) -> Result<Vec<String>> {
        let commit_id = match commit {
            Some(id) => id,
            None => self.head_id()?,
        };
        let commit = self.store.commit(commit_id)?;
        tree::list_paths(&self.store, commit.tree)
    }

    /// The commit's change delta against its parent(s), with line counts.
    pub fn changes(&self, commit_id: ObjectId) -> Result<CommitDelta> {
        let commit = self.store.commit(commit_id)?;
        diff::diff_commit(&self.store, &commit)
    }

    /// Line count of every file in the commit's tree, keyed by path. An
    /// empty blob counts zero lines.
    pub fn file_line_counts(&self, commit_id: ObjectId) -> Result<HashMap<String, usize>> {
        let commit = self.store.commit(commit_id)?;
        let mut counts = HashMap::new();
        for (path, blob_id) in tree::list_files(&self.store, commit.tree)? {
            let lines = line_diff::count_lines(&self.store.blob(blob_id)?);
            counts.insert(path, lines);
        }
        Ok(counts)
    }

    /// Commits that changed the given path, in history order. A path with
    /// no history yields an empty sequence, not an error.
    pub fn commits_for_path(&self, path: &str) -> Result<Vec<Arc<Commit>>> {
        history::history_for_path(&self.store, &[self.head_id()?], path)
    }

    /// Commit history of every path, computed in a single graph walk.
    pub fn commits_by_path(&self) -> Result<HashMap<String, Vec<Arc<Commit>>>> {
        history::history_all(&self.store, &[self.head_id()?])
    }
}
