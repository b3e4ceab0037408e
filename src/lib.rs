//! # Fieldstore
//!
//! Content-addressed binary archive for simulation field snapshots.
//!
//! A producer writes snapshots of named multi-dimensional fields to a
//! directory at successive savepoints; a consumer reads them back
//! bit-identically. Every snapshot is SHA-256 checksummed and the
//! directory carries a version-tagged JSON manifest, so a reader detects
//! any silent corruption and refuses archives from an incompatible
//! library release.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fieldstore::prelude::*;
//!
//! // Produce an archive
//! let mut archive = BinaryArchive::open("./fields", OpenMode::Write)?;
//! let mut u = vec![0u8; 16];
//! archive.write(&ContiguousView::new(&mut u, 8), &FieldId::new("u", 0))?;
//! archive.close()?;
//!
//! // Consume it
//! let archive = BinaryArchive::open("./fields", OpenMode::Read)?;
//! let mut out = vec![0u8; 16];
//! archive.read(&mut ContiguousView::new(&mut out, 8), &FieldId::new("u", 0))?;
//! ```
//!
//! ## On-disk layout
//!
//! ```text
//! <directory>/
//!   ArchiveMetaData.json   # versions + field table (offsets, checksums)
//!   <fieldA>.dat           # concatenated snapshot bytes of fieldA
//!   <fieldB>.dat
//! ```
//!
//! Data files carry no framing; the manifest's offsets are the only
//! index. The engine is single-owner per directory and all I/O is
//! synchronous — callers needing concurrency serialize externally.

#![warn(missing_docs)]

pub mod archive;
pub mod digest;
pub mod error;
pub mod field_table;
pub mod manifest;
pub mod storage;
pub mod version;

pub mod prelude;

// Re-export main entry points
pub use archive::{BinaryArchive, OpenMode};
pub use error::{Error, Result};

// Re-export index and view types
pub use field_table::{FieldId, FieldOffsetTable, FieldTable, FileOffset};
pub use storage::{ContiguousView, StorageView, StridedView};
