//! Decoded object records and analysis results.
//!
//! These structs are the immutable outputs of the object decoder and the
//! analysis layer, serializable for downstream consumers.
//! - `commit`: Commit, Signature
//! - `tree`: Tree, TreeEntry, EntryKind
//! - `diff`: FileChange, CommitDelta

pub mod commit;
pub mod diff;
pub mod tree;

pub use commit::*;
pub use diff::*;
pub use tree::*;
