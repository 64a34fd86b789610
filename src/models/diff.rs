use serde::{Deserialize, Serialize};

/// One file's change in a commit: repository-relative `/`-separated path
/// plus line-level insertion/deletion counts. Append-only result record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub lines_added: usize,
    pub lines_deleted: usize,
}

/// The full change set of one commit against its parent(s).
///
/// The three sets are disjoint by path: a kind change (file becoming a
/// directory or vice versa) is reported as a delete plus an add, never as
/// a modification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitDelta {
    pub added: Vec<FileChange>,
    pub deleted: Vec<FileChange>,
    pub modified: Vec<FileChange>,
}

impl CommitDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len() + self.modified.len()
    }
}
