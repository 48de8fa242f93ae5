//! Duplicate families: recurring script names that are versions of the same
//! logical script. The newest member is kept, the rest are deduplicated.

use std::collections::BTreeMap;

use regex::Regex;

use crate::core::config::DedupConfig;
use crate::core::errors::{Result, TidyError};
use crate::scanner::entry::FileEntry;

/// Script stems recognized out of the box.
pub const BUILTIN_FAMILIES: &[&str] = &["setup", "install", "tidytux", "cleanup", "backup", "update"];

/// `2`, `_v2`, `-v1.3`, `.old`, `_new`, `-bak`, `_copy`, ` (1)`.
const VERSION_MARKER: &str =
    r"[ _.\-]?(?:v?\d+(?:\.\d+)*|old|new|orig|bak|backup|copy|final|latest)|\s?\(\d+\)";

/// A named file-name pattern.
#[derive(Debug, Clone)]
pub struct DedupFamily {
    /// Family label shown in reports.
    pub name: String,
    pattern: Regex,
}

impl DedupFamily {
    /// Compile a configured pattern.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|err| TidyError::InvalidConfig {
            details: format!("dedup family `{name}`: {err}"),
        })?;
        Ok(Self { name, pattern })
    }

    /// `stem.sh`, `stem2.sh`, `stem_v1.sh`, `stem-old.py`, `stem (1).sh`, ...
    ///
    /// Only version and copy markers may follow the stem, so
    /// `install_docker.sh` and `install_nginx.sh` are different scripts.
    pub fn for_script_stem(stem: &str) -> Result<Self> {
        let pattern = format!(
            r"(?i)^{}(?:{VERSION_MARKER})*\.(?:sh|bash|py)$",
            regex::escape(stem)
        );
        Self::new(stem, &pattern)
    }

    /// Whether `file_name` belongs to this family.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }
}

/// Ordered family list; the first matching family claims a file.
#[derive(Debug, Clone)]
pub struct FamilySet {
    families: Vec<DedupFamily>,
}

impl FamilySet {
    /// Families in match order.
    #[must_use]
    pub fn new(families: Vec<DedupFamily>) -> Self {
        Self { families }
    }

    /// The [`BUILTIN_FAMILIES`] script stems.
    pub fn builtin() -> Result<Self> {
        BUILTIN_FAMILIES
            .iter()
            .map(|stem| DedupFamily::for_script_stem(stem))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// Built-in families followed by configured ones.
    pub fn from_config(config: &DedupConfig) -> Result<Self> {
        let mut set = Self::builtin()?;
        for family in &config.families {
            set.families
                .push(DedupFamily::new(family.name.clone(), &family.pattern)?);
        }
        Ok(set)
    }

    /// Name of the first family matching `file_name`.
    #[must_use]
    pub fn family_of(&self, file_name: &str) -> Option<&str> {
        self.families
            .iter()
            .find(|family| family.matches(file_name))
            .map(|family| family.name.as_str())
    }
}

/// One duplicate group with at least two members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup<'a> {
    /// Family that claimed every member.
    pub family: String,
    /// Member that stays in place.
    pub keeper: &'a FileEntry,
    /// Every other member, in name order.
    pub redundant: Vec<&'a FileEntry>,
}

/// Newest modification time wins; equal times keep the lexicographically
/// greatest file name.
#[must_use]
pub fn pick_keeper<'a>(members: &[&'a FileEntry]) -> Option<&'a FileEntry> {
    members
        .iter()
        .copied()
        .max_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
}

/// Group entries by (family, extension) and pick each group's keeper.
#[must_use]
pub fn group_duplicates<'a>(entries: &'a [FileEntry], families: &FamilySet) -> Vec<DuplicateGroup<'a>> {
    let mut buckets: BTreeMap<(String, Option<String>), Vec<&'a FileEntry>> = BTreeMap::new();
    for entry in entries {
        if let Some(family) = families.family_of(&entry.name) {
            buckets
                .entry((family.to_string(), entry.extension.clone()))
                .or_default()
                .push(entry);
        }
    }

    let mut groups = Vec::new();
    for ((family, _), members) in buckets {
        if members.len() < 2 {
            continue;
        }
        let Some(keeper) = pick_keeper(&members) else {
            continue;
        };
        let mut redundant: Vec<&FileEntry> = members
            .into_iter()
            .filter(|member| member.path != keeper.path)
            .collect();
        redundant.sort_by(|a, b| a.name.cmp(&b.name));
        groups.push(DuplicateGroup {
            family,
            keeper,
            redundant,
        });
    }
    groups
}
