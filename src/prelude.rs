//! Convenient imports for fieldstore.
//!
//! Re-exports the types needed for the common produce/consume flow:
//!
//! ```ignore
//! use fieldstore::prelude::*;
//!
//! let mut archive = BinaryArchive::open("./fields", OpenMode::Write)?;
//! ```

// Engine
pub use crate::archive::{BinaryArchive, OpenMode};

// Error handling
pub use crate::error::{Error, Result};

// Index types
pub use crate::field_table::{FieldId, FileOffset};

// Storage views
pub use crate::storage::{ContiguousView, StorageView, StridedView};
