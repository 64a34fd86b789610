//! Read-only analyzer for a git repository's object database.
//!
//! Given the on-disk location of a repository, this crate reconstructs
//! commit history, file trees, and per-commit content differences by
//! parsing the object database directly, loose objects and packed
//! containers with delta compression alike, without shelling out to git
//! or binding a C library.
//!
//! The entry point is [`Repository`]:
//!
//! ```no_run
//! use repo_analyzer::Repository;
//!
//! fn main() -> repo_analyzer::Result<()> {
//!     let repo = Repository::open("path/to/repo")?;
//!     println!("{} commits", repo.total_commits()?);
//!     for commit in repo.commits()? {
//!         println!("{} {}", commit.id, commit.summary());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Module overview:
//! - [`odb`]: object store: loose/packed resolution, delta chains,
//!   typed decoding with session-lifetime caches
//! - [`git`]: analysis layer: graph walking, tree walking and diffing,
//!   line-level diff counts, path history
//! - [`models`]: immutable decoded records and result types
//! - [`error`]: error taxonomy and the crate `Result` alias

pub mod error;
pub mod git;
pub mod models;
pub mod odb;

pub use error::{AnalyzerError, Result};
pub use git::{Repository, RevWalk};
pub use models::{Commit, CommitDelta, EntryKind, FileChange, Signature, Tree, TreeEntry};
pub use odb::{ObjectId, ObjectKind, ObjectStore};
