//! Tree traversal: flattening a tree into the file paths it contains.
//!
//! Traversal uses an explicit work stack rather than language recursion so
//! adversarially deep nesting cannot overflow the call stack.

use crate::error::Result;
use crate::models::{EntryKind, TreeEntry};
use crate::odb::{ObjectId, ObjectStore};

/// Joins with the canonical `/` separator.
pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Every file path reachable from `tree_id`, in a deterministic pre-order.
///
/// Subtree entries are expanded but never emitted themselves, so the
/// result holds one path per file entry and no duplicates.
pub(crate) fn list_paths(store: &ObjectStore, tree_id: ObjectId) -> Result<Vec<String>> {
    Ok(list_files(store, tree_id)?
        .into_iter()
        .map(|(path, _)| path)
        .collect())
}

/// Like `list_paths`, but keeps each file's blob id alongside its path.
pub(crate) fn list_files(
    store: &ObjectStore,
    tree_id: ObjectId,
) -> Result<Vec<(String, ObjectId)>> {
    let mut files = Vec::new();
    let mut stack = vec![(String::new(), tree_id)];

    while let Some((prefix, id)) = stack.pop() {
        let tree = store.tree(id)?;
        let mut subtrees = Vec::new();
        for entry in &tree.entries {
            let path = join_path(&prefix, &entry.name);
            match entry.kind {
                EntryKind::File => files.push((path, entry.id)),
                EntryKind::Subtree => subtrees.push((path, entry.id)),
            }
        }
        // Reversed so the leftmost subtree is visited next.
        while let Some(frame) = subtrees.pop() {
            stack.push(frame);
        }
    }

    Ok(files)
}

/// Resolves the entry at a `/`-separated path inside `tree_id`, or `None`
/// if any component is absent or a file is used as a directory.
pub(crate) fn entry_at_path(
    store: &ObjectStore,
    tree_id: ObjectId,
    path: &str,
) -> Result<Option<TreeEntry>> {
    let mut current = tree_id;
    let mut components = path.split('/').filter(|c| !c.is_empty()).peekable();

    while let Some(component) = components.next() {
        let tree = store.tree(current)?;
        let Some(entry) = tree.entry(component) else {
            return Ok(None);
        };
        if components.peek().is_none() {
            return Ok(Some(entry.clone()));
        }
        match entry.kind {
            EntryKind::Subtree => current = entry.id,
            EntryKind::File => return Ok(None),
        }
    }

    Ok(None)
}
