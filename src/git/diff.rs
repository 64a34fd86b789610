//! Recursive tree comparison producing per-commit change deltas.
//!
//! The differ walks two trees level by level with an explicit stack and
//! prunes any subtree whose id matches on both sides. Content addressing
//! makes that an O(1) equality proof, which is what keeps whole-history
//! analysis tractable.
//!
//! Merge commits use combined-diff semantics: a path is reported only if
//! its merge result differs from that path's content in every parent.
//! Line counts for merge paths are computed against the first parent.

use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::git::line_diff::{count_lines, diff_lines};
use crate::git::tree::join_path;
use crate::models::{Commit, CommitDelta, EntryKind, FileChange, Tree};
use crate::odb::{ObjectId, ObjectStore};

/// One changed path with the blob id on each side; `old` absent means an
/// addition, `new` absent a deletion, both present a modification.
#[derive(Debug, Clone)]
pub(crate) struct PathChange {
    pub path: String,
    pub old: Option<ObjectId>,
    pub new: Option<ObjectId>,
}

/// Full change set of a commit against its parent(s), with line counts.
pub(crate) fn diff_commit(store: &ObjectStore, commit: &Commit) -> Result<CommitDelta> {
    let mut changes = commit_changes(store, commit)?;
    changes.sort_by(|a, b| a.path.cmp(&b.path));

    let mut delta = CommitDelta::default();
    for change in changes {
        match (change.old, change.new) {
            (None, Some(new_id)) => {
                let lines = count_lines(&store.blob(new_id)?);
                delta.added.push(FileChange {
                    path: change.path,
                    lines_added: lines,
                    lines_deleted: 0,
                });
            }
            (Some(old_id), None) => {
                let lines = count_lines(&store.blob(old_id)?);
                delta.deleted.push(FileChange {
                    path: change.path,
                    lines_added: 0,
                    lines_deleted: lines,
                });
            }
            (Some(old_id), Some(new_id)) => {
                let (lines_added, lines_deleted) =
                    diff_lines(&store.blob(old_id)?, &store.blob(new_id)?);
                delta.modified.push(FileChange {
                    path: change.path,
                    lines_added,
                    lines_deleted,
                });
            }
            (None, None) => unreachable!("change without either side"),
        }
    }
    Ok(delta)
}

/// Changed paths of a commit under its parent-count semantics, without
/// touching blob contents.
pub(crate) fn commit_changes(store: &ObjectStore, commit: &Commit) -> Result<Vec<PathChange>> {
    match commit.parents.len() {
        0 => changed_paths(store, None, Some(commit.tree)),
        1 => {
            let parent = store.commit(commit.parents[0])?;
            changed_paths(store, Some(parent.tree), Some(commit.tree))
        }
        _ => combined_changes(store, commit),
    }
}

/// Changed paths of a commit against its first parent only, regardless of
/// merge status. This is the rule path history is built on.
pub(crate) fn first_parent_changes(store: &ObjectStore, commit: &Commit) -> Result<Vec<PathChange>> {
    let parent_tree = match commit.parents.first() {
        Some(&parent_id) => Some(store.commit(parent_id)?.tree),
        None => None,
    };
    changed_paths(store, parent_tree, Some(commit.tree))
}

/// Combined diff for a merge: intersect the per-parent change sets so only
/// paths differing from every parent survive; the reported blob ids come
/// from the first-parent comparison.
fn combined_changes(store: &ObjectStore, commit: &Commit) -> Result<Vec<PathChange>> {
    let mut surviving: Option<HashMap<String, PathChange>> = None;

    for &parent_id in &commit.parents {
        let parent = store.commit(parent_id)?;
        let against_parent = changed_paths(store, Some(parent.tree), Some(commit.tree))?;

        surviving = Some(match surviving {
            None => against_parent
                .into_iter()
                .map(|c| (c.path.clone(), c))
                .collect(),
            Some(mut kept) => {
                let changed_here: BTreeSet<String> =
                    against_parent.into_iter().map(|c| c.path).collect();
                kept.retain(|path, _| changed_here.contains(path));
                kept
            }
        });

        if surviving.as_ref().is_some_and(|s| s.is_empty()) {
            break;
        }
    }

    Ok(surviving.map(|s| s.into_values().collect()).unwrap_or_default())
}

/// Iterative two-tree comparison; `None` on a side stands for an empty
/// tree, which turns the walk into a pure enumeration of the other side.
fn changed_paths(
    store: &ObjectStore,
    old_tree: Option<ObjectId>,
    new_tree: Option<ObjectId>,
) -> Result<Vec<PathChange>> {
    let mut changes = Vec::new();
    let mut stack = vec![(String::new(), old_tree, new_tree)];

    while let Some((prefix, old_id, new_id)) = stack.pop() {
        if old_id == new_id {
            continue;
        }
        let old = match old_id {
            Some(id) => Some(store.tree(id)?),
            None => None,
        };
        let new = match new_id {
            Some(id) => Some(store.tree(id)?),
            None => None,
        };

        let names: BTreeSet<&str> = entry_names(old.as_deref())
            .chain(entry_names(new.as_deref()))
            .collect();

        for name in names {
            let path = join_path(&prefix, name);
            let old_entry = old.as_deref().and_then(|t| t.entry(name));
            let new_entry = new.as_deref().and_then(|t| t.entry(name));

            match (old_entry, new_entry) {
                (None, Some(added)) => match added.kind {
                    EntryKind::File => changes.push(PathChange {
                        path,
                        old: None,
                        new: Some(added.id),
                    }),
                    EntryKind::Subtree => stack.push((path, None, Some(added.id))),
                },
                (Some(removed), None) => match removed.kind {
                    EntryKind::File => changes.push(PathChange {
                        path,
                        old: Some(removed.id),
                        new: None,
                    }),
                    EntryKind::Subtree => stack.push((path, Some(removed.id), None)),
                },
                (Some(before), Some(after)) => {
                    if before.id == after.id && before.kind == after.kind {
                        continue;
                    }
                    match (before.kind, after.kind) {
                        (EntryKind::Subtree, EntryKind::Subtree) => {
                            stack.push((path, Some(before.id), Some(after.id)));
                        }
                        (EntryKind::File, EntryKind::File) => changes.push(PathChange {
                            path,
                            old: Some(before.id),
                            new: Some(after.id),
                        }),
                        // Kind change: the old entry dies, the new one is born.
                        (EntryKind::File, EntryKind::Subtree) => {
                            changes.push(PathChange {
                                path: path.clone(),
                                old: Some(before.id),
                                new: None,
                            });
                            stack.push((path, None, Some(after.id)));
                        }
                        (EntryKind::Subtree, EntryKind::File) => {
                            stack.push((path.clone(), Some(before.id), None));
                            changes.push(PathChange {
                                path,
                                old: None,
                                new: Some(after.id),
                            });
                        }
                    }
                }
                (None, None) => unreachable!("name came from one of the trees"),
            }
        }
    }

    Ok(changes)
}

fn entry_names(tree: Option<&Tree>) -> impl Iterator<Item = &str> {
    tree.into_iter()
        .flat_map(|t| t.entries.iter().map(|e| e.name.as_str()))
}
