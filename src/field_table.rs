//! In-memory field/offset index.
//!
//! The field table maps each field name to the ordered sequence of
//! snapshots written for that field. Each entry records where the
//! snapshot's bytes live in the field's data file and the SHA-256 digest
//! of exactly those bytes. The table is purely in-memory; the archive
//! engine keeps it in sync with the data files and the manifest.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Identifies one snapshot of one field.
///
/// `name` selects the field; `id` selects the snapshot within that
/// field's sequence, in the order the snapshots were produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldId {
    /// Field name
    pub name: String,
    /// Snapshot index within the field's sequence
    pub id: u64,
}

impl FieldId {
    /// Create a new field/snapshot identifier.
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self { name: name.into(), id }
    }
}

/// Location and digest of one snapshot inside a field's data file.
///
/// Invariant: `offset` points to the first byte of a byte-run in
/// `<name>.dat` and `checksum` is the lowercase-hex SHA-256 of exactly
/// that byte-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOffset {
    /// Byte position of the snapshot in the field's data file
    pub offset: u64,
    /// Lowercase-hex SHA-256 digest of the snapshot's bytes
    pub checksum: String,
}

impl FileOffset {
    /// Create a new offset entry.
    pub fn new(offset: u64, checksum: impl Into<String>) -> Self {
        Self { offset, checksum: checksum.into() }
    }
}

/// Ordered snapshot entries of a single field, indexed by snapshot id.
///
/// Entries at indices `0..len` are all valid; `id == len` is the only
/// position at which a new entry may be appended.
pub type FieldOffsetTable = Vec<FileOffset>;

/// Mapping from field name to its snapshot entries.
///
/// Backed by a `BTreeMap` so iteration (and therefore manifest encoding)
/// is deterministic regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTable {
    fields: BTreeMap<String, FieldOffsetTable>,
}

impl FieldTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the offset table of a field.
    pub fn lookup(&self, name: &str) -> Option<&FieldOffsetTable> {
        self.fields.get(name)
    }

    /// Append a new snapshot entry for `name`, creating the field if it
    /// is unknown. Returns the id of the new entry (`= len` before the
    /// append).
    pub fn append(&mut self, name: &str, entry: FileOffset) -> u64 {
        let table = self.fields.entry(name.to_string()).or_default();
        table.push(entry);
        (table.len() - 1) as u64
    }

    /// Replace the entry of an existing snapshot.
    ///
    /// Fails with [`Error::InvalidId`] if the field is unknown or `id`
    /// is out of range.
    pub fn replace(&mut self, name: &str, id: u64, entry: FileOffset) -> Result<()> {
        let slot = self
            .fields
            .get_mut(name)
            .and_then(|table| table.get_mut(id as usize))
            .ok_or_else(|| Error::InvalidId { name: name.to_string(), id })?;
        *slot = entry;
        Ok(())
    }

    /// Number of fields in the table.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// True if no field has been recorded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldOffsetTable)> {
        self.fields.iter().map(|(name, table)| (name.as_str(), table))
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(offset: u64) -> FileOffset {
        FileOffset::new(offset, format!("{:064x}", offset))
    }

    #[test]
    fn test_append_returns_sequential_ids() {
        let mut table = FieldTable::new();
        assert_eq!(table.append("u", entry(0)), 0);
        assert_eq!(table.append("u", entry(16)), 1);
        assert_eq!(table.append("v", entry(0)), 0);
        assert_eq!(table.lookup("u").unwrap().len(), 2);
        assert_eq!(table.lookup("v").unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_unknown_field() {
        let table = FieldTable::new();
        assert!(table.lookup("missing").is_none());
    }

    #[test]
    fn test_replace_keeps_length() {
        let mut table = FieldTable::new();
        table.append("u", entry(0));
        table.append("u", entry(16));

        table.replace("u", 0, FileOffset::new(0, "f".repeat(64))).unwrap();

        let entries = table.lookup("u").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].checksum, "f".repeat(64));
        assert_eq!(entries[1], entry(16));
    }

    #[test]
    fn test_replace_out_of_range() {
        let mut table = FieldTable::new();
        table.append("u", entry(0));

        let err = table.replace("u", 1, entry(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidId { id: 1, .. }));

        let err = table.replace("unknown", 0, entry(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidId { id: 0, .. }));
    }

    #[test]
    fn test_iteration_is_name_ordered() {
        let mut table = FieldTable::new();
        table.append("zeta", entry(0));
        table.append("alpha", entry(0));
        table.append("mid", entry(0));

        let names: Vec<&str> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
