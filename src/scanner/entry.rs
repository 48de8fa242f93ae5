//! Typed file metadata and the top-level directory listing.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TidyError};

/// Metadata the rule engine classifies on. Never touches the filesystem
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path inside the target directory.
    pub path: PathBuf,
    /// Display form of the file name, lossily decoded. Destinations are
    /// built from [`FileEntry::file_name`] instead.
    pub name: String,
    /// Lowercased last dot segment, if any.
    pub extension: Option<String>,
    /// Length in bytes at scan time.
    pub size_bytes: u64,
    /// Last modification time; the Unix epoch when the platform has none.
    pub modified: DateTime<Utc>,
}

impl FileEntry {
    /// Entry for `path` with the given size and modification time.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64, modified: DateTime<Utc>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        Self {
            path,
            name,
            extension,
            size_bytes,
            modified,
        }
    }

    /// The file name exactly as stored on disk.
    #[must_use]
    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_default()
    }
}

/// List regular, non-hidden files directly inside `target`, sorted by name.
///
/// Directories (including previously created category folders) and symlinks
/// are skipped, so files that were already organized are not seen again.
pub fn scan_directory(target: &Path) -> Result<Vec<FileEntry>> {
    scan_directory_with(target, |_, _| {})
}

/// [`scan_directory`], reporting each entry that could not be read.
///
/// `on_unreadable` receives the entry's path (or `target` when the entry
/// itself could not be listed) and the error.
pub fn scan_directory_with(
    target: &Path,
    mut on_unreadable: impl FnMut(&Path, &io::Error),
) -> Result<Vec<FileEntry>> {
    let reader = fs::read_dir(target).map_err(|err| TidyError::io(target, err))?;
    let mut entries = Vec::new();
    for item in reader {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                on_unreadable(target, &err);
                continue;
            }
        };
        let path = item.path();
        let file_type = match item.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                on_unreadable(&path, &err);
                continue;
            }
        };
        if !file_type.is_file() || item.file_name().as_encoded_bytes().starts_with(b".") {
            continue;
        }
        let meta = match item.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                on_unreadable(&path, &err);
                continue;
            }
        };
        let modified = meta
            .modified()
            .map_or(DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::from);
        entries.push(FileEntry::new(path, meta.len(), modified));
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.file_name().cmp(b.file_name())));
    Ok(entries)
}
