//! Error types for object-database analysis.
//!
//! Defines the `AnalyzerError` enum for all failure conditions and the
//! crate-wide `Result` alias.
//!
//! Taxonomy:
//! - `ObjectNotFound`: identifier absent from both loose and packed storage
//! - `CorruptObject`: decompression, envelope, or delta-chain failure
//! - `MalformedObject`: envelope parses but the typed structure is invalid
//! - `PathNotFound`: requested commit or path does not exist in history
//! - `RepoNotFound`: the given location holds no object database

use thiserror::Error;

use crate::odb::ObjectId;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Corrupt object: {0}")]
    CorruptObject(String),

    #[error("Malformed {kind} object: {reason}")]
    MalformedObject { kind: &'static str, reason: String },

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    pub(crate) fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        AnalyzerError::MalformedObject {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        AnalyzerError::CorruptObject(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
