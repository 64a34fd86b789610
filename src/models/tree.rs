use serde::{Deserialize, Serialize};

use crate::odb::ObjectId;

/// Classification of a tree entry derived from its stored file mode.
///
/// Symbolic links and submodule references are opaque file-like entries;
/// their targets are never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Subtree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub id: ObjectId,
    /// Raw octal mode from the encoding (e.g. 0o100644, 0o40000).
    pub mode: u32,
}

/// A decoded tree object: one directory level, entries in encoding order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn entry(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
