//! Commit graph traversal and per-path history.
//!
//! The walk pops from a max-heap keyed by (committer time, id), which
//! yields the conventional hybrid ordering: recent commits first, but an
//! ancestor never before its descendant. Memory stays bounded by the
//! frontier width of the graph, not its depth.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use crate::error::Result;
use crate::git::diff::first_parent_changes;
use crate::git::tree::entry_at_path;
use crate::models::Commit;
use crate::odb::{ObjectId, ObjectStore};

struct QueueEntry {
    time: i64,
    id: ObjectId,
    commit: Arc<Commit>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    // Ties on committer time break by id so the order is deterministic.
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Iterator over every commit reachable from the start set, most recent
/// committer timestamp first, each commit exactly once.
///
/// A parent id that does not resolve to a commit is surfaced as an error
/// mid-iteration rather than skipped; dangling parents mean corruption.
pub struct RevWalk<'a> {
    store: &'a ObjectStore,
    heap: BinaryHeap<QueueEntry>,
    queued: HashSet<ObjectId>,
}

impl<'a> RevWalk<'a> {
    pub fn new(store: &'a ObjectStore, starts: &[ObjectId]) -> Result<Self> {
        let mut walk = RevWalk {
            store,
            heap: BinaryHeap::new(),
            queued: HashSet::new(),
        };
        for &id in starts {
            walk.enqueue(id)?;
        }
        Ok(walk)
    }

    fn enqueue(&mut self, id: ObjectId) -> Result<()> {
        if !self.queued.insert(id) {
            return Ok(());
        }
        let commit = self.store.commit(id)?;
        self.heap.push(QueueEntry {
            time: commit.commit_time(),
            id,
            commit,
        });
        Ok(())
    }
}

impl Iterator for RevWalk<'_> {
    type Item = Result<Arc<Commit>>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.heap.pop()?;
        for &parent in &entry.commit.parents {
            if let Err(e) = self.enqueue(parent) {
                return Some(Err(e));
            }
        }
        Some(Ok(entry.commit))
    }
}

/// Ordered sequence of every commit reachable from the start set.
pub(crate) fn walk(store: &ObjectStore, starts: &[ObjectId]) -> Result<Vec<Arc<Commit>>> {
    RevWalk::new(store, starts)?.collect()
}

/// Cardinality of the reachable set; the ordering is irrelevant here, the
/// visited set alone decides the count.
pub(crate) fn count(store: &ObjectStore, starts: &[ObjectId]) -> Result<usize> {
    let mut total = 0;
    for commit in RevWalk::new(store, starts)? {
        commit?;
        total += 1;
    }
    Ok(total)
}

/// Commits that changed `path`, in walk order.
///
/// A commit touches the path when the entry id at that path differs
/// between its tree and its first parent's tree; resolution descends only
/// the path's own components, so unrelated subtrees are never decoded.
pub(crate) fn history_for_path(
    store: &ObjectStore,
    starts: &[ObjectId],
    path: &str,
) -> Result<Vec<Arc<Commit>>> {
    let mut commits = Vec::new();
    for commit in RevWalk::new(store, starts)? {
        let commit = commit?;
        if touches_path(store, &commit, path)? {
            commits.push(commit);
        }
    }
    Ok(commits)
}

fn touches_path(store: &ObjectStore, commit: &Commit, path: &str) -> Result<bool> {
    let current = entry_at_path(store, commit.tree, path)?;
    let previous = match commit.parents.first() {
        Some(&parent_id) => {
            let parent = store.commit(parent_id)?;
            entry_at_path(store, parent.tree, path)?
        }
        None => None,
    };
    Ok(match (previous, current) {
        (None, None) => false,
        (Some(a), Some(b)) => a.id != b.id || a.kind != b.kind,
        _ => true,
    })
}

/// Per-path commit history for every path, computed in one graph walk.
///
/// Each commit's changed-path set is enumerated once (against its first
/// parent, with unchanged-subtree pruning) and the commit is appended to
/// every touched path's sequence, so "history of everything" costs no more
/// than one full-history diff pass.
pub(crate) fn history_all(
    store: &ObjectStore,
    starts: &[ObjectId],
) -> Result<HashMap<String, Vec<Arc<Commit>>>> {
    let mut by_path: HashMap<String, Vec<Arc<Commit>>> = HashMap::new();
    let mut walked = 0usize;

    for commit in RevWalk::new(store, starts)? {
        let commit = commit?;
        walked += 1;
        for change in first_parent_changes(store, &commit)? {
            by_path
                .entry(change.path)
                .or_default()
                .push(Arc::clone(&commit));
        }
    }

    tracing::debug!(commits = walked, paths = by_path.len(), "indexed path history");
    Ok(by_path)
}
