use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::odb::ObjectId;

/// Author or committer identity with the time the action was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

/// A decoded commit object. Immutable once decoded; shared via `Arc` from
/// the object store's cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: ObjectId,
    /// Parent ids in encoding order: 0 = root, 1 = normal, 2+ = merge.
    /// Order matters for merge diff parent priority.
    pub parents: Vec<ObjectId>,
    pub tree: ObjectId,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Commit {
    /// Committer epoch seconds; this is what drives history ordering.
    pub fn commit_time(&self) -> i64 {
        self.committer.when.timestamp()
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}
