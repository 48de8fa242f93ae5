//! Turns scanned entries into an ordered list of candidate actions.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::context::{RunContext, RunMode};
use crate::scanner::dedup::{FamilySet, group_duplicates};
use crate::scanner::entry::FileEntry;
use crate::scanner::rules::{Category, classify};

/// What the executor will do with the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Organize into `<target>/<category>/`.
    Move,
    /// Remove a junk file.
    Delete,
    /// Retire a stale archive into the backup directory.
    Archive,
    /// Retire a redundant duplicate-family member into the backup directory.
    Dedup,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Archive => "archive",
            Self::Dedup => "dedup",
        })
    }
}

/// A proposed, not yet executed operation. Consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateAction {
    pub kind: ActionKind,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub size_bytes: u64,
    pub category: Category,
    /// Duplicate family for `Dedup` actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl CandidateAction {
    /// Whether completing the action frees its size at the live location.
    #[must_use]
    pub const fn reclaims_space(&self) -> bool {
        !matches!(self.kind, ActionKind::Move)
    }

    /// One-line description shown in prompts and reports.
    #[must_use]
    pub fn describe(&self) -> String {
        let name = self
            .source
            .file_name()
            .map_or_else(|| self.source.display().to_string(), |n| n.to_string_lossy().into_owned());
        match self.kind {
            ActionKind::Move => format!("move {name} to {}/", self.category),
            ActionKind::Delete => format!("delete temporary file {name}"),
            ActionKind::Archive => format!("archive stale {name} into backups"),
            ActionKind::Dedup => format!(
                "retire older duplicate {name}{}",
                self.family
                    .as_deref()
                    .map(|f| format!(" ({f} family)"))
                    .unwrap_or_default()
            ),
        }
    }
}

/// Ordered actions plus the duplicate keepers that were left in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<CandidateAction>,
    pub kept: Vec<PathBuf>,
}

impl Plan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Pure classification over scanned metadata.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    families: FamilySet,
}

impl RuleEngine {
    #[must_use]
    pub fn new(families: FamilySet) -> Self {
        Self { families }
    }

    /// Build the plan for one run. Entries are visited in name order.
    ///
    /// Precedence per entry: junk delete, duplicate retire, stale archive,
    /// organize. Emergency runs only propose space-reclaiming actions.
    #[must_use]
    pub fn plan(&self, entries: &[FileEntry], ctx: &RunContext) -> Plan {
        let now = ctx.started_at.with_timezone(&Utc);
        let backup_dir = ctx.backup_dir();

        let mut ordered: Vec<&FileEntry> = entries.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.file_name().cmp(b.file_name())));

        let mut redundant: HashSet<&Path> = HashSet::new();
        let mut family_of: Vec<(&Path, String)> = Vec::new();
        let mut kept = Vec::new();
        for group in group_duplicates(entries, &self.families) {
            kept.push(group.keeper.path.clone());
            for member in group.redundant {
                redundant.insert(member.path.as_path());
                family_of.push((member.path.as_path(), group.family.clone()));
            }
        }

        let mut actions = Vec::new();
        for entry in ordered {
            let class = classify(entry, now);
            let retire_to = Some(backup_dir.join(entry.file_name()));
            let action = if class.junk {
                Some((ActionKind::Delete, retire_to))
            } else if redundant.contains(entry.path.as_path()) {
                Some((ActionKind::Dedup, retire_to))
            } else if class.stale_archive {
                Some((ActionKind::Archive, retire_to))
            } else if ctx.mode == RunMode::Emergency {
                None
            } else {
                Some((
                    ActionKind::Move,
                    Some(ctx.target.join(class.category.dir_name()).join(entry.file_name())),
                ))
            };
            if let Some((kind, destination)) = action {
                let family = (kind == ActionKind::Dedup)
                    .then(|| {
                        family_of
                            .iter()
                            .find(|(path, _)| *path == entry.path.as_path())
                            .map(|(_, family)| family.clone())
                    })
                    .flatten();
                actions.push(CandidateAction {
                    kind,
                    source: entry.path.clone(),
                    destination,
                    size_bytes: entry.size_bytes,
                    category: class.category,
                    family,
                });
            }
        }

        Plan { actions, kept }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::RunOptions;
    use crate::monitor::space::Band;
    use chrono::{DateTime, Duration, Local, TimeZone};

    const MIB: u64 = 1024 * 1024;

    fn start() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 5, 1, 12, 0, 0)
            .single()
            .expect("unambiguous")
    }

    fn ctx(band: Band) -> RunContext {
        RunContext::new(RunOptions::default(), band, "/dl", "/cfg/backups", start())
    }

    fn entry(name: &str, size: u64, age_days: i64) -> FileEntry {
        FileEntry::new(
            format!("/dl/{name}"),
            size,
            start().with_timezone(&Utc) - Duration::days(age_days),
        )
    }

    fn engine() -> RuleEngine {
        RuleEngine::new(FamilySet::builtin().expect("builtin"))
    }

    #[test]
    fn emergency_plan_only_reclaims_space() {
        let entries = vec![
            entry("old-backup.tar.gz", 50 * MIB, 45),
            entry("setup_v1.sh", 10 * MIB, 3),
            entry("setup_v2.sh", 10 * MIB, 1),
            entry("paper.pdf", MIB, 1),
        ];
        let plan = engine().plan(&entries, &ctx(Band::Critical));
        let kinds: Vec<(ActionKind, &str)> = plan
            .actions
            .iter()
            .map(|a| (a.kind, a.source.file_name().and_then(|n| n.to_str()).unwrap_or("")))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ActionKind::Archive, "old-backup.tar.gz"),
                (ActionKind::Dedup, "setup_v1.sh"),
            ]
        );
        assert_eq!(plan.kept, vec![PathBuf::from("/dl/setup_v2.sh")]);
        assert_eq!(plan.actions[1].family.as_deref(), Some("setup"));
        assert_eq!(
            plan.actions[1].destination,
            Some(PathBuf::from("/cfg/backups/20260501_120000/setup_v1.sh"))
        );
    }

    #[test]
    fn normal_plan_organizes_everything_else() {
        let entries = vec![
            entry("paper.pdf", MIB, 1),
            entry("fresh.zip", MIB, 2),
            entry("movie.mkv", MIB, 2),
            entry("iso.part", MIB, 0),
        ];
        let plan = engine().plan(&entries, &ctx(Band::Normal));
        let summary: Vec<(ActionKind, Category)> =
            plan.actions.iter().map(|a| (a.kind, a.category)).collect();
        assert_eq!(
            summary,
            vec![
                (ActionKind::Move, Category::Archives),
                (ActionKind::Delete, Category::Other),
                (ActionKind::Move, Category::Other),
                (ActionKind::Move, Category::Documents),
            ]
        );
        assert_eq!(
            plan.actions[3].destination,
            Some(PathBuf::from("/dl/documents/paper.pdf"))
        );
        assert!(!plan.actions[0].reclaims_space());
        assert!(plan.actions[1].reclaims_space());
    }

    #[test]
    fn distinct_scripts_with_a_family_prefix_are_organized() {
        let entries = vec![
            entry("install_docker.sh", MIB, 3),
            entry("install_nginx.sh", MIB, 1),
        ];
        let plan = engine().plan(&entries, &ctx(Band::Normal));
        assert!(plan.kept.is_empty());
        let moves: Vec<(ActionKind, Option<PathBuf>)> = plan
            .actions
            .iter()
            .map(|a| (a.kind, a.destination.clone()))
            .collect();
        assert_eq!(
            moves,
            vec![
                (ActionKind::Move, Some(PathBuf::from("/dl/scripts/install_docker.sh"))),
                (ActionKind::Move, Some(PathBuf::from("/dl/scripts/install_nginx.sh"))),
            ]
        );

        let emergency = engine().plan(&entries, &ctx(Band::Critical));
        assert!(emergency.actions.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn destinations_keep_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"caf\xe9.pdf");
        let entries = vec![FileEntry::new(
            Path::new("/dl").join(raw),
            MIB,
            start().with_timezone(&Utc),
        )];
        let plan = engine().plan(&entries, &ctx(Band::Normal));
        assert_eq!(
            plan.actions[0].destination,
            Some(Path::new("/dl/documents").join(raw))
        );
    }

    #[test]
    fn descriptions_name_the_file() {
        let plan = engine().plan(&[entry("old.rar", 5, 60)], &ctx(Band::Normal));
        assert_eq!(plan.actions[0].describe(), "archive stale old.rar into backups");
    }
}
