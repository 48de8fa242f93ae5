//! Per-run context: mode, approval policy, timestamps and backup location.
//!
//! Built once from the run options and the Space Inspector's reading. The
//! mode is never re-evaluated during a run.

#![allow(missing_docs)]

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::gate::confirm::ConfirmPolicy;
use crate::monitor::space::Band;

/// Timestamp format used for run ids, backup directory and log names.
pub const RUN_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Operating mode for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Normal,
    Warning,
    Emergency,
}

impl RunMode {
    #[must_use]
    pub const fn from_band(band: Band) -> Self {
        match band {
            Band::Critical => Self::Emergency,
            Band::Warning => Self::Warning,
            Band::Normal => Self::Normal,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Emergency => "emergency",
        })
    }
}

/// Caller-selected switches (mirrors the CLI flags).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub yes: bool,
    pub emergency: bool,
    pub report_only: bool,
    pub quiet: bool,
    pub verbose: bool,
}

/// Immutable facts about the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub mode: RunMode,
    pub band: Band,
    /// Prompts may be shown for actions the policy does not auto-approve.
    pub interactive: bool,
    /// Every action is approved without prompting.
    pub auto_approve: bool,
    pub report_only: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub started_at: DateTime<Local>,
    pub target: PathBuf,
    /// `<config-root>/backups`; the run's own directory lives below it.
    pub backup_root: PathBuf,
}

impl RunContext {
    #[must_use]
    pub fn new(
        options: RunOptions,
        band: Band,
        target: impl Into<PathBuf>,
        backup_root: impl Into<PathBuf>,
        started_at: DateTime<Local>,
    ) -> Self {
        let mode = if options.emergency {
            RunMode::Emergency
        } else {
            RunMode::from_band(band)
        };
        let auto_approve = options.yes || options.quiet;
        Self {
            mode,
            band,
            interactive: !auto_approve,
            auto_approve,
            report_only: options.report_only,
            verbose: options.verbose && !options.quiet,
            quiet: options.quiet,
            started_at,
            target: target.into(),
            backup_root: backup_root.into(),
        }
    }

    /// Run identifier derived from the start timestamp.
    #[must_use]
    pub fn run_id(&self) -> String {
        self.started_at.format(RUN_ID_FORMAT).to_string()
    }

    /// `<backup-root>/<run-id>`.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.backup_root.join(self.run_id())
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Approval policy selected once for the whole run.
    #[must_use]
    pub const fn confirm_policy(&self) -> ConfirmPolicy {
        if self.auto_approve {
            ConfirmPolicy::AutoYes
        } else if matches!(self.mode, RunMode::Emergency) {
            ConfirmPolicy::EmergencyAutoYes
        } else {
            ConfirmPolicy::PromptWithTimeout
        }
    }
}
