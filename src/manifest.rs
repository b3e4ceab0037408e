//! Manifest codec.
//!
//! The manifest is the single JSON document in an archive directory that
//! names the library version, the archive format version, and the field
//! table. The in-memory table is authoritative; the engine rewrites the
//! whole document on flush. Decoding validates both version tags before
//! the table is accepted.
//!
//! Document schema:
//!
//! ```json
//! {
//!     "serialbox_version": 10,
//!     "binary_archive_version": 0,
//!     "fields_table": {
//!         "u": [[0, "<sha256 hex>"], [16, "<sha256 hex>"]]
//!     }
//! }
//! ```

use crate::error::{Error, Result};
use crate::field_table::{FieldOffsetTable, FieldTable, FileOffset};
use crate::version::{version_tag, ARCHIVE_FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name of the manifest inside an archive directory.
pub const ARCHIVE_METADATA_FILENAME: &str = "ArchiveMetaData.json";

/// Wire shape of the manifest document.
///
/// Versions are decoded as `i64` so an out-of-range tag is still
/// reportable; the table maps field names to `[offset, checksum]` pairs
/// in snapshot-id order.
#[derive(Debug, Serialize, Deserialize)]
struct ManifestDoc {
    serialbox_version: i64,
    binary_archive_version: i64,
    fields_table: BTreeMap<String, Vec<(u64, String)>>,
}

/// Encode the field table into the pretty-printed manifest document.
///
/// Output is deterministic: field names in sorted order, entries in id
/// order, 4-space indentation, trailing newline.
pub fn encode(table: &FieldTable) -> Result<String> {
    let doc = ManifestDoc {
        serialbox_version: i64::from(version_tag()),
        binary_archive_version: i64::from(ARCHIVE_FORMAT_VERSION),
        fields_table: table
            .iter()
            .map(|(name, entries)| {
                let pairs = entries
                    .iter()
                    .map(|entry| (entry.offset, entry.checksum.clone()))
                    .collect();
                (name.to_string(), pairs)
            })
            .collect(),
    };

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    doc.serialize(&mut serializer)
        .map_err(|e| Error::Format(e.to_string()))?;
    out.push(b'\n');

    // The document is built from UTF-8 strings only.
    String::from_utf8(out).map_err(|e| Error::Format(e.to_string()))
}

/// Decode a manifest document and validate its version tags.
///
/// Fails with [`Error::Format`] if the document is not valid JSON, a
/// required key is missing, or a value has the wrong shape, and with
/// [`Error::VersionMismatch`] if either version tag disagrees with the
/// running library.
pub fn decode(text: &str) -> Result<FieldTable> {
    let doc: ManifestDoc =
        serde_json::from_str(text).map_err(|e| Error::Format(e.to_string()))?;

    if doc.serialbox_version != i64::from(version_tag()) {
        return Err(Error::VersionMismatch {
            tag: "serialbox_version",
            actual: doc.serialbox_version,
            expected: version_tag(),
        });
    }
    if doc.binary_archive_version != i64::from(ARCHIVE_FORMAT_VERSION) {
        return Err(Error::VersionMismatch {
            tag: "binary_archive_version",
            actual: doc.binary_archive_version,
            expected: ARCHIVE_FORMAT_VERSION,
        });
    }

    let mut table = FieldTable::new();
    for (name, pairs) in doc.fields_table {
        let entries: FieldOffsetTable = pairs
            .into_iter()
            .map(|(offset, checksum)| FileOffset::new(offset, checksum))
            .collect();
        for entry in entries {
            table.append(&name, entry);
        }
    }
    Ok(table)
}
