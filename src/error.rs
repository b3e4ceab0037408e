//! Unified error types for fieldstore.
//!
//! This module provides the canonical error type for all archive
//! operations. Every failure surfaces to the caller as one of these
//! variants; nothing is retried internally and no global error state
//! exists.

use std::path::PathBuf;
use thiserror::Error;

/// All fieldstore errors.
///
/// On any failure the archive remains in its previous logically
/// consistent state: the in-memory field table is updated only after the
/// corresponding disk write succeeded, and a failed write never flushes
/// the manifest.
#[derive(Debug, Error)]
pub enum Error {
    /// Archive directory does not exist (Read-mode open)
    #[error("no such directory: '{0}'")]
    NoSuchDirectory(PathBuf),

    /// Archive directory exists but contains entries (Write-mode open)
    #[error("directory '{0}' is not empty")]
    DirectoryNotEmpty(PathBuf),

    /// Archive metadata file missing (Read-mode open)
    #[error("archive metadata not found in directory '{0}'")]
    MetadataNotFound(PathBuf),

    /// Underlying filesystem error (directory creation, inspection)
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    /// Manifest document is syntactically or structurally invalid
    #[error("invalid archive metadata: {0}")]
    Format(String),

    /// Manifest version tag differs from the library or format version
    #[error("{tag} of archive metadata ({actual}) does not match the version of the library ({expected})")]
    VersionMismatch {
        /// Which version tag disagreed
        tag: &'static str,
        /// Version recorded in the manifest
        actual: i64,
        /// Version compiled into the library
        expected: u32,
    },

    /// Operation not legal in the archive's open mode
    #[error("archive is opened in {mode} mode, cannot {operation}")]
    WrongMode {
        /// Current open mode
        mode: crate::archive::OpenMode,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Field name not registered in the archive
    #[error("no field '{0}' registered in archive")]
    UnknownField(String),

    /// Snapshot id out of range for the field
    #[error("invalid id '{id}' of field '{name}'")]
    InvalidId {
        /// Field name
        name: String,
        /// Offending snapshot id
        id: u64,
    },

    /// Contiguous buffer allocation failed
    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    /// Data-file open/seek/read/write failure
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Data file involved
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Bytes on disk do not match the recorded digest
    #[error("checksum mismatch for field '{name}' at id '{id}'")]
    ChecksumMismatch {
        /// Field name
        name: String,
        /// Snapshot id whose bytes are corrupt
        id: u64,
    },

    /// Overwrite with a byte length different from the existing snapshot
    #[error(
        "size mismatch overwriting field '{name}' at id '{id}': \
         existing snapshot is {existing} bytes, new data is {new} bytes"
    )]
    SizeMismatch {
        /// Field name
        name: String,
        /// Snapshot id being overwritten
        id: u64,
        /// Byte length of the snapshot already on disk
        existing: u64,
        /// Byte length of the incoming data
        new: u64,
    },
}

/// Result type for fieldstore operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error indicates on-disk corruption.
    ///
    /// Corruption errors mean the directory's contents disagree with the
    /// manifest; re-running the operation cannot succeed.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::ChecksumMismatch { .. } | Error::Format(_))
    }

    /// Check if this error came from the caller's arguments rather than
    /// the archive state (bad id, unknown field, wrong mode).
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::WrongMode { .. } | Error::UnknownField(_) | Error::InvalidId { .. }
        )
    }
}
