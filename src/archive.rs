//! The binary archive engine.
//!
//! An archive is a single directory holding one manifest
//! (`ArchiveMetaData.json`) and one raw data file per field
//! (`<name>.dat`, the concatenated bytes of every snapshot of that
//! field, in the order produced). The engine is the open/read/write
//! state machine tying the data files, the in-memory field table, and
//! the manifest together.
//!
//! The engine is single-owner and fully synchronous. No file handle
//! survives an operation: every read, write, and manifest flush opens
//! its own handle and releases it on every exit path.

use crate::digest::sha256_hex;
use crate::error::{Error, Result};
use crate::field_table::{FieldId, FieldTable, FileOffset};
use crate::manifest::{self, ARCHIVE_METADATA_FILENAME};
use crate::storage::{pack, unpack, StorageView};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Access mode of an open archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read existing snapshots; the directory and manifest must exist.
    Read,
    /// Produce a fresh archive; the directory must be empty (or absent,
    /// in which case it is created).
    Write,
    /// Extend an existing archive; the directory is created if absent.
    Append,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpenMode::Read => "Read",
            OpenMode::Write => "Write",
            OpenMode::Append => "Append",
        };
        f.write_str(name)
    }
}

/// Where a snapshot's bytes go within the field's data file.
enum Placement {
    /// First snapshot of an unknown field: create the file, write at 0.
    NewField,
    /// `id == len`: append at end of file.
    Append,
    /// `id < len`: overwrite in place at the recorded offset.
    /// `next_offset` is the successor entry's offset, if any; it bounds
    /// the existing byte-run.
    Overwrite { offset: u64, next_offset: Option<u64> },
}

/// A directory-scoped, content-addressed store for field snapshots.
///
/// Created by [`BinaryArchive::open`]; mutated only by
/// [`write`](BinaryArchive::write); the manifest is flushed after every
/// successful write and again on [`close`](BinaryArchive::close) or
/// drop if dirty.
///
/// # Example
///
/// ```ignore
/// use fieldstore::prelude::*;
///
/// let mut archive = BinaryArchive::open("./fields", OpenMode::Write)?;
/// let mut data = vec![0u8; 16];
/// let view = ContiguousView::new(&mut data, 8);
/// archive.write(&view, &FieldId::new("u", 0))?;
/// archive.close()?;
/// ```
#[derive(Debug)]
pub struct BinaryArchive {
    mode: OpenMode,
    directory: PathBuf,
    field_table: FieldTable,
    manifest_dirty: bool,
}

impl BinaryArchive {
    /// Open an archive directory.
    ///
    /// Mode preconditions:
    ///
    /// | mode   | directory                                   | manifest          |
    /// |--------|---------------------------------------------|-------------------|
    /// | Read   | must exist                                  | must exist        |
    /// | Write  | absent (created) or empty                   | ignored           |
    /// | Append | created if absent                           | loaded if present |
    pub fn open(directory: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let is_dir = directory.is_dir();

        match mode {
            OpenMode::Read => {
                if !is_dir {
                    return Err(Error::NoSuchDirectory(directory));
                }
            }
            OpenMode::Write => {
                if is_dir && fs::read_dir(&directory)?.next().is_some() {
                    return Err(Error::DirectoryNotEmpty(directory));
                }
                // Like Append, Write creates a missing directory.
                if !is_dir {
                    fs::create_dir_all(&directory)?;
                }
            }
            OpenMode::Append => {
                if !is_dir {
                    fs::create_dir_all(&directory)?;
                }
            }
        }

        let field_table = Self::load_field_table(&directory, mode)?;
        debug!(
            "opened archive '{}' in {} mode ({} fields)",
            directory.display(),
            mode,
            field_table.num_fields()
        );

        Ok(Self { mode, directory, field_table, manifest_dirty: false })
    }

    /// Load the field table from the on-disk manifest, per mode.
    ///
    /// Write mode owns a fresh archive and never loads; Append tolerates
    /// a missing manifest; Read requires one.
    fn load_field_table(directory: &Path, mode: OpenMode) -> Result<FieldTable> {
        if mode == OpenMode::Write {
            return Ok(FieldTable::new());
        }

        let path = directory.join(ARCHIVE_METADATA_FILENAME);
        if !path.is_file() {
            if mode == OpenMode::Append {
                return Ok(FieldTable::new());
            }
            return Err(Error::MetadataNotFound(directory.to_path_buf()));
        }

        let text = fs::read_to_string(&path)?;
        manifest::decode(&text)
    }

    /// Write one snapshot of a field.
    ///
    /// Legal in Write and Append mode. `id.id` must be the next free
    /// snapshot id of the field (append), or an existing id (in-place
    /// overwrite, which requires the same byte length and replaces only
    /// that snapshot's bytes and checksum). The manifest is flushed
    /// before this returns, so a subsequent Read-mode open observes the
    /// new snapshot.
    ///
    /// The field table is only updated after the bytes hit the data
    /// file; on any failure the archive state is unchanged.
    pub fn write(&mut self, view: &dyn StorageView, id: &FieldId) -> Result<()> {
        if self.mode == OpenMode::Read {
            return Err(Error::WrongMode { mode: self.mode, operation: "write" });
        }

        // Pack the (possibly strided) field into contiguous memory and
        // fingerprint it.
        let mut buffer = alloc_buffer(view.size_in_bytes())?;
        pack(view, &mut buffer);
        let checksum = sha256_hex(&buffer);

        let placement = self.placement_of(id)?;
        let path = self.data_file(&id.name);
        let io_err = |source: std::io::Error| Error::Io { path: path.clone(), source };

        match placement {
            Placement::NewField => {
                let mut file = File::create(&path).map_err(io_err)?;
                file.write_all(&buffer).map_err(io_err)?;
                self.field_table.append(&id.name, FileOffset::new(0, checksum));
            }
            Placement::Append => {
                let mut file =
                    OpenOptions::new().append(true).open(&path).map_err(io_err)?;
                let offset = file.metadata().map_err(io_err)?.len();
                file.write_all(&buffer).map_err(io_err)?;
                self.field_table.append(&id.name, FileOffset::new(offset, checksum));
            }
            Placement::Overwrite { offset, next_offset } => {
                let mut file =
                    OpenOptions::new().write(true).open(&path).map_err(io_err)?;
                let file_len = file.metadata().map_err(io_err)?.len();
                let existing = next_offset.unwrap_or(file_len).saturating_sub(offset);
                if existing != buffer.len() as u64 {
                    return Err(Error::SizeMismatch {
                        name: id.name.clone(),
                        id: id.id,
                        existing,
                        new: buffer.len() as u64,
                    });
                }
                file.seek(SeekFrom::Start(offset)).map_err(io_err)?;
                file.write_all(&buffer).map_err(io_err)?;
                self.field_table.replace(&id.name, id.id, FileOffset::new(offset, checksum))?;
            }
        }

        debug!(
            "wrote field '{}' id {} ({} bytes) to '{}'",
            id.name,
            id.id,
            buffer.len(),
            path.display()
        );

        self.manifest_dirty = true;
        self.flush_manifest()
    }

    /// Read one snapshot of a field into the view.
    ///
    /// Legal in Read mode only. The snapshot's bytes are re-hashed and
    /// compared against the recorded checksum before they are copied
    /// into the view, so any silent corruption of the data file is
    /// detected.
    pub fn read(&self, view: &mut dyn StorageView, id: &FieldId) -> Result<()> {
        if self.mode != OpenMode::Read {
            return Err(Error::WrongMode { mode: self.mode, operation: "read" });
        }

        let entries = self
            .field_table
            .lookup(&id.name)
            .ok_or_else(|| Error::UnknownField(id.name.clone()))?;
        let entry = entries
            .get(id.id as usize)
            .ok_or_else(|| Error::InvalidId { name: id.name.clone(), id: id.id })?;

        let mut buffer = alloc_buffer(view.size_in_bytes())?;

        let path = self.data_file(&id.name);
        let io_err = |source: std::io::Error| Error::Io { path: path.clone(), source };

        let mut file = File::open(&path).map_err(io_err)?;
        file.seek(SeekFrom::Start(entry.offset)).map_err(io_err)?;
        file.read_exact(&mut buffer).map_err(io_err)?;

        let checksum = sha256_hex(&buffer);
        if checksum != entry.checksum {
            return Err(Error::ChecksumMismatch { name: id.name.clone(), id: id.id });
        }

        unpack(view, &buffer);
        debug!(
            "read field '{}' id {} ({} bytes) from '{}'",
            id.name,
            id.id,
            buffer.len(),
            path.display()
        );
        Ok(())
    }

    /// Rewrite the manifest if the in-memory table has unflushed changes.
    ///
    /// The whole document is rewritten via truncate-and-write; the
    /// in-memory copy is authoritative since the archive assumes a
    /// single writer per directory.
    pub fn flush_manifest(&mut self) -> Result<()> {
        if !self.manifest_dirty {
            return Ok(());
        }
        let text = manifest::encode(&self.field_table)?;
        fs::write(self.directory.join(ARCHIVE_METADATA_FILENAME), text)?;
        self.manifest_dirty = false;
        Ok(())
    }

    /// Close the archive, flushing the manifest if dirty.
    ///
    /// Dropping the archive flushes too, but `close` surfaces the
    /// flush error instead of logging it.
    pub fn close(mut self) -> Result<()> {
        self.flush_manifest()
    }

    /// The archive's open mode.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// The archive's directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The in-memory field/offset index.
    pub fn field_table(&self) -> &FieldTable {
        &self.field_table
    }

    /// Decide where a snapshot's bytes go, validating the id.
    fn placement_of(&self, id: &FieldId) -> Result<Placement> {
        let entries = match self.field_table.lookup(&id.name) {
            None => return Ok(Placement::NewField),
            Some(entries) => entries,
        };

        let len = entries.len() as u64;
        if id.id == len {
            Ok(Placement::Append)
        } else if id.id < len {
            let offset = entries[id.id as usize].offset;
            let next_offset = entries.get(id.id as usize + 1).map(|e| e.offset);
            Ok(Placement::Overwrite { offset, next_offset })
        } else {
            Err(Error::InvalidId { name: id.name.clone(), id: id.id })
        }
    }

    fn data_file(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.dat", name))
    }
}

/// Allocate a zeroed contiguous buffer, failing instead of aborting when
/// the allocation cannot be satisfied.
fn alloc_buffer(n: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(n).map_err(|_| Error::OutOfMemory(n))?;
    buffer.resize(n, 0);
    Ok(buffer)
}

impl fmt::Display for BinaryArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BinaryArchive [")?;
        writeln!(f, "  directory = {}", self.directory.display())?;
        writeln!(f, "  mode = {}", self.mode)?;
        writeln!(f, "  fields_table = [")?;
        for (name, entries) in self.field_table.iter() {
            writeln!(f, "    {} = {{", name)?;
            for entry in entries {
                writeln!(f, "      [ {}, {} ]", entry.offset, entry.checksum)?;
            }
            writeln!(f, "    }}")?;
        }
        writeln!(f, "  ]")?;
        write!(f, "]")
    }
}

impl Drop for BinaryArchive {
    fn drop(&mut self) {
        if let Err(e) = self.flush_manifest() {
            warn!(
                "failed to flush manifest for archive '{}': {}",
                self.directory.display(),
                e
            );
        }
    }
}
