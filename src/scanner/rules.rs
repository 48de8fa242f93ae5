//! Declarative classification table and pure per-entry rules.

#![allow(missing_docs)]

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::scanner::entry::FileEntry;

/// Closed set of destination categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Documents,
    Archives,
    Software,
    Images,
    Scripts,
    Other,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Documents,
        Self::Archives,
        Self::Software,
        Self::Images,
        Self::Scripts,
        Self::Other,
    ];

    /// Folder name used under the target when organizing.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Archives => "archives",
            Self::Software => "software",
            Self::Images => "images",
            Self::Scripts => "scripts",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Extension table, matched case-insensitively.
pub const CATEGORY_TABLE: &[(Category, &[&str])] = &[
    (
        Category::Documents,
        &["pdf", "doc", "docx", "txt", "odt", "rtf", "csv"],
    ),
    (Category::Archives, &["zip", "tar", "gz", "bz2", "xz", "rar"]),
    (
        Category::Software,
        &["deb", "rpm", "appimage", "exe", "msi", "dmg"],
    ),
    (
        Category::Images,
        &["jpg", "jpeg", "png", "gif", "svg", "bmp"],
    ),
    (
        Category::Scripts,
        &["sh", "bash", "py", "pl", "rb", "js", "md"],
    ),
];

/// Interrupted or temporary downloads.
pub const JUNK_EXTENSIONS: &[&str] = &["part", "crdownload", "tmp", "partial"];

/// Archives strictly older than this are stale.
pub const STALE_AFTER_DAYS: i64 = 30;

#[must_use]
pub fn category_for_extension(extension: Option<&str>) -> Category {
    let Some(ext) = extension else {
        return Category::Other;
    };
    let ext = ext.to_ascii_lowercase();
    CATEGORY_TABLE
        .iter()
        .find(|(_, exts)| exts.contains(&ext.as_str()))
        .map_or(Category::Other, |(category, _)| *category)
}

#[must_use]
pub fn is_junk(entry: &FileEntry) -> bool {
    entry.name.ends_with('~')
        || entry
            .extension
            .as_deref()
            .is_some_and(|ext| JUNK_EXTENSIONS.contains(&ext))
}

/// Older than [`STALE_AFTER_DAYS`] relative to `now` (the run start).
#[must_use]
pub fn is_stale(entry: &FileEntry, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(entry.modified) > Duration::days(STALE_AFTER_DAYS)
}

/// Outcome of the per-entry rules, before duplicate grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub junk: bool,
    /// Archive-category entry eligible for the stale-archive action.
    pub stale_archive: bool,
}

#[must_use]
pub fn classify(entry: &FileEntry, now: DateTime<Utc>) -> Classification {
    let category = category_for_extension(entry.extension.as_deref());
    let junk = is_junk(entry);
    Classification {
        category: if junk { Category::Other } else { category },
        junk,
        stale_archive: !junk && category == Category::Archives && is_stale(entry, now),
    }
}
