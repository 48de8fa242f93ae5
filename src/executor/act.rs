//! Backup-then-act execution of candidate actions and system tasks.
//!
//! Per action, in order: make sure the run's backup directory exists, take a
//! verified copy of the source, and only then delete or move the live file.
//! Failures abort the single action and are returned as a skip reason; only
//! a backup directory that cannot be created ends the run.

#![allow(missing_docs)]

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::context::RunContext;
use crate::core::errors::{Result, TidyError};
use crate::executor::backup::{BackupRecord, backup_file, ensure_backup_dir, unique_path};
use crate::executor::runner::CommandRunner;
use crate::executor::tasks::SystemTask;
use crate::scanner::planner::{ActionKind, CandidateAction};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why an action or task did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "details", rename_all = "snake_case")]
pub enum SkipReason {
    Denied,
    TimedOut,
    TargetUnavailable(String),
    CopyVerification(String),
    Failed(String),
}

impl SkipReason {
    /// Short label used to group skips in reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Denied => "denied",
            Self::TimedOut => "timed out",
            Self::TargetUnavailable(_) => "target unavailable",
            Self::CopyVerification(_) => "copy verification failed",
            Self::Failed(_) => "failed",
        }
    }

    /// Convert a per-action error into a skip.
    #[must_use]
    pub fn from_error(err: &TidyError) -> Self {
        match err {
            TidyError::TargetUnavailable { details, .. } => Self::TargetUnavailable(details.clone()),
            TidyError::CopyVerification { details, .. } => Self::CopyVerification(details.clone()),
            TidyError::TimeoutDenied { .. } => Self::TimedOut,
            other => Self::Failed(other.to_string()),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied | Self::TimedOut => f.write_str(self.label()),
            Self::TargetUnavailable(details)
            | Self::CopyVerification(details)
            | Self::Failed(details) => write!(f, "{}: {details}", self.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// `bytes_affected` is what left the live tree (0 for moves).
    Completed { bytes_affected: u64 },
    Skipped { reason: SkipReason },
}

/// Outcome of one candidate action. Owns the action it consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action: CandidateAction,
    pub outcome: ActionOutcome,
    /// Where the file ended up, when it moved.
    pub final_path: Option<PathBuf>,
    pub backup: Option<BackupRecord>,
}

impl ExecutionResult {
    #[must_use]
    pub fn skipped(action: CandidateAction, reason: SkipReason) -> Self {
        Self {
            action,
            outcome: ActionOutcome::Skipped { reason },
            final_path: None,
            backup: None,
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Completed { .. })
    }

    #[must_use]
    pub const fn bytes_affected(&self) -> u64 {
        match self.outcome {
            ActionOutcome::Completed { bytes_affected } => bytes_affected,
            ActionOutcome::Skipped { .. } => 0,
        }
    }

    #[must_use]
    pub const fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.outcome {
            ActionOutcome::Completed { .. } => None,
            ActionOutcome::Skipped { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    Skipped { reason: SkipReason },
}

/// Outcome of one delegated system task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: SystemTask,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    #[must_use]
    pub fn skipped(task: SystemTask, reason: SkipReason) -> Self {
        Self {
            task,
            outcome: TaskOutcome::Skipped { reason },
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs approved actions strictly one at a time.
pub struct Executor<'a> {
    ctx: &'a RunContext,
    runner: &'a dyn CommandRunner,
    backup_dir: Option<PathBuf>,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub fn new(ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> Self {
        Self {
            ctx,
            runner,
            backup_dir: None,
        }
    }

    /// The run's backup directory, created on first use.
    fn backup_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.backup_dir {
            return Ok(dir.clone());
        }
        let dir = self.ctx.backup_dir();
        ensure_backup_dir(&dir)?;
        self.backup_dir = Some(dir.clone());
        Ok(dir)
    }

    /// Execute one action.
    ///
    /// Returns `Err` only when the backup directory cannot be created; every
    /// other failure comes back as a skipped [`ExecutionResult`].
    pub fn execute(&mut self, action: CandidateAction) -> Result<ExecutionResult> {
        match fs::symlink_metadata(&action.source) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Ok(ExecutionResult::skipped(
                    action,
                    SkipReason::TargetUnavailable("no longer a regular file".to_string()),
                ));
            }
            Err(err) => {
                return Ok(ExecutionResult::skipped(
                    action,
                    SkipReason::TargetUnavailable(err.to_string()),
                ));
            }
        }

        let backup_dir = self.backup_dir()?;

        let record = match backup_file(&action.source, &backup_dir, self.ctx.started_at) {
            Ok(record) => record,
            Err(err) => {
                let reason = SkipReason::from_error(&err);
                return Ok(ExecutionResult::skipped(action, reason));
            }
        };

        let step = match action.kind {
            ActionKind::Move => self.relocate(&action).map(|dest| (dest, 0)),
            ActionKind::Delete | ActionKind::Archive | ActionKind::Dedup => {
                remove_live(&action.source).map(|()| (record.backup_path.clone(), record.size_bytes))
            }
        };

        Ok(match step {
            Ok((final_path, bytes_affected)) => ExecutionResult {
                action,
                outcome: ActionOutcome::Completed { bytes_affected },
                final_path: Some(final_path),
                backup: Some(record),
            },
            Err(reason) => ExecutionResult {
                action,
                outcome: ActionOutcome::Skipped { reason },
                final_path: None,
                backup: Some(record),
            },
        })
    }

    fn relocate(&self, action: &CandidateAction) -> std::result::Result<PathBuf, SkipReason> {
        let fallback = self
            .ctx
            .target
            .join(action.category.dir_name())
            .join(action.source.file_name().unwrap_or_default());
        let planned = action.destination.clone().unwrap_or(fallback);
        let dir = planned.parent().unwrap_or(self.ctx.target.as_path()).to_path_buf();
        let name = planned
            .file_name()
            .or_else(|| action.source.file_name())
            .unwrap_or_default();

        fs::create_dir_all(&dir)
            .map_err(|err| SkipReason::Failed(format!("cannot create {}: {err}", dir.display())))?;
        let dest = unique_path(&dir, name).map_err(|err| SkipReason::Failed(err.to_string()))?;

        match fs::rename(&action.source, &dest) {
            Ok(()) => Ok(dest),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(SkipReason::TargetUnavailable(err.to_string()))
            }
            // Different filesystem.
            Err(_) => copy_then_remove(&action.source, &dest).map(|()| dest),
        }
    }

    /// Run a delegated task through the injected runner.
    pub fn run_task(&self, task: SystemTask) -> TaskResult {
        match self.runner.run(&task.program, &task.args) {
            Ok(output) if output.success() => TaskResult {
                task,
                outcome: TaskOutcome::Completed,
            },
            Ok(output) => {
                let code = output
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                let detail = output.stderr.lines().last().unwrap_or("").trim().to_string();
                let reason = if detail.is_empty() {
                    format!("exit status {code}")
                } else {
                    format!("exit status {code}: {detail}")
                };
                TaskResult::skipped(task, SkipReason::Failed(reason))
            }
            Err(err) => TaskResult::skipped(task, SkipReason::from_error(&err)),
        }
    }
}

/// Copy `source` to `dest`, then remove `source`. On failure the copy is
/// removed again, so the file exists in exactly one place.
fn copy_then_remove(source: &Path, dest: &Path) -> std::result::Result<(), SkipReason> {
    if let Err(err) = fs::copy(source, dest) {
        let _ = fs::remove_file(dest);
        return Err(SkipReason::Failed(format!("move failed: {err}")));
    }
    remove_live(source).inspect_err(|_| {
        let _ = fs::remove_file(dest);
    })
}

fn remove_live(path: &Path) -> std::result::Result<(), SkipReason> {
    fs::remove_file(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            SkipReason::TargetUnavailable(err.to_string())
        } else {
            SkipReason::Failed(format!("cannot remove {}: {err}", path.display()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::RunOptions;
    use crate::executor::runner::CommandOutput;
    use crate::gate::confirm::ActionTag;
    use crate::monitor::space::Band;
    use crate::scanner::rules::Category;
    use chrono::Local;
    use std::cell::RefCell;

    struct FakeRunner {
        exit_code: Option<i32>,
        calls: RefCell<Vec<String>>,
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            self.calls
                .borrow_mut()
                .push(crate::executor::runner::render_command(program, args));
            Ok(CommandOutput {
                exit_code: self.exit_code,
                stdout: String::new(),
                stderr: "E: could not get lock\n".to_string(),
            })
        }
    }

    fn fixture() -> (tempfile::TempDir, RunContext) {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("dl");
        fs::create_dir(&target).expect("mkdir");
        let ctx = RunContext::new(
            RunOptions::default(),
            Band::Normal,
            &target,
            dir.path().join("backups"),
            Local::now(),
        );
        (dir, ctx)
    }

    fn action(ctx: &RunContext, kind: ActionKind, name: &str, category: Category) -> CandidateAction {
        let destination = match kind {
            ActionKind::Move => ctx.target.join(category.dir_name()).join(name),
            _ => ctx.backup_dir().join(name),
        };
        CandidateAction {
            kind,
            source: ctx.target.join(name),
            destination: Some(destination),
            size_bytes: 0,
            category,
            family: None,
        }
    }

    #[test]
    fn dedup_backs_up_then_removes() {
        let (_dir, ctx) = fixture();
        fs::write(ctx.target.join("setup_v1.sh"), b"#!/bin/sh\necho v1\n").expect("write");
        let runner = FakeRunner {
            exit_code: Some(0),
            calls: RefCell::default(),
        };
        let mut exec = Executor::new(&ctx, &runner);

        let result = exec
            .execute(action(&ctx, ActionKind::Dedup, "setup_v1.sh", Category::Scripts))
            .expect("backup dir");
        assert!(result.success());
        assert_eq!(result.bytes_affected(), 18);
        let backup = result.backup.expect("backup record");
        assert_eq!(backup.backup_path, ctx.backup_dir().join("setup_v1.sh"));
        assert_eq!(fs::metadata(&backup.backup_path).expect("meta").len(), 18);
        assert!(!ctx.target.join("setup_v1.sh").exists());
    }

    #[test]
    fn move_organizes_with_backup_and_no_reclaimed_bytes() {
        let (_dir, ctx) = fixture();
        fs::write(ctx.target.join("paper.pdf"), b"%PDF").expect("write");
        fs::create_dir(ctx.target.join("documents")).expect("mkdir");
        fs::write(ctx.target.join("documents").join("paper.pdf"), b"older").expect("write");
        let runner = FakeRunner {
            exit_code: Some(0),
            calls: RefCell::default(),
        };
        let mut exec = Executor::new(&ctx, &runner);

        let result = exec
            .execute(action(&ctx, ActionKind::Move, "paper.pdf", Category::Documents))
            .expect("backup dir");
        assert!(result.success());
        assert_eq!(result.bytes_affected(), 0);
        assert_eq!(
            result.final_path,
            Some(ctx.target.join("documents").join("paper_1.pdf"))
        );
        assert_eq!(
            fs::read(ctx.target.join("documents").join("paper.pdf")).expect("read"),
            b"older"
        );
        assert!(ctx.backup_dir().join("paper.pdf").exists());
    }

    #[test]
    fn vanished_source_is_skipped_without_backup_dir() {
        let (_dir, ctx) = fixture();
        let runner = FakeRunner {
            exit_code: Some(0),
            calls: RefCell::default(),
        };
        let mut exec = Executor::new(&ctx, &runner);
        let result = exec
            .execute(action(&ctx, ActionKind::Delete, "gone.part", Category::Other))
            .expect("no fatal error");
        assert!(matches!(
            result.skip_reason(),
            Some(SkipReason::TargetUnavailable(_))
        ));
        assert!(!ctx.backup_dir().exists());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_name_survives_the_move() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        use crate::scanner::dedup::FamilySet;
        use crate::scanner::entry::scan_directory;
        use crate::scanner::planner::RuleEngine;

        let (_dir, ctx) = fixture();
        let raw = OsStr::from_bytes(b"caf\xe9.pdf");
        fs::write(ctx.target.join(raw), b"%PDF").expect("write");
        let entries = scan_directory(&ctx.target).expect("scan");
        let plan = RuleEngine::new(FamilySet::builtin().expect("builtin")).plan(&entries, &ctx);
        let runner = FakeRunner {
            exit_code: Some(0),
            calls: RefCell::default(),
        };
        let mut exec = Executor::new(&ctx, &runner);

        let mut actions = plan.actions.into_iter();
        let result = exec.execute(actions.next().expect("one move")).expect("backup dir");
        assert!(result.success());
        let moved = ctx.target.join("documents").join(raw);
        assert_eq!(result.final_path, Some(moved.clone()));
        assert_eq!(fs::read(&moved).expect("read"), b"%PDF");
        assert!(ctx.backup_dir().join(raw).exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unverifiable_copy_skips_and_leaves_source() {
        // procfs reports length 0 but yields content, so the copy never verifies.
        let (_dir, ctx) = fixture();
        let runner = FakeRunner {
            exit_code: Some(0),
            calls: RefCell::default(),
        };
        let mut exec = Executor::new(&ctx, &runner);
        let source = Path::new("/proc/self/status");
        let result = exec
            .execute(CandidateAction {
                kind: ActionKind::Delete,
                source: source.to_path_buf(),
                destination: None,
                size_bytes: 0,
                category: Category::Other,
                family: None,
            })
            .expect("not fatal");

        let reason = result.skip_reason().expect("skipped");
        assert!(matches!(reason, SkipReason::CopyVerification(_)), "{reason:?}");
        assert_eq!(reason.label(), "copy verification failed");
        assert!(result.backup.is_none());
        assert!(source.exists());
        assert!(!ctx.backup_dir().join("status").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_cross_device_move_leaves_no_second_copy() {
        // Readable, but procfs entries cannot be unlinked.
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("status");
        let reason = copy_then_remove(Path::new("/proc/self/status"), &dest).expect_err("unlink fails");
        assert!(matches!(reason, SkipReason::Failed(_)), "{reason:?}");
        assert!(!dest.exists());
    }

    #[test]
    fn cross_device_fallback_moves_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("a.zip");
        let dest = dir.path().join("b.zip");
        fs::write(&source, b"zip").expect("write");
        copy_then_remove(&source, &dest).expect("moved");
        assert!(!source.exists());
        assert_eq!(fs::read(&dest).expect("read"), b"zip");
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_backup_root_ends_the_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.part"), b"x").expect("write");
        let ctx = RunContext::new(
            RunOptions::default(),
            Band::Normal,
            dir.path(),
            "/proc/tidytux-no-such-dir/backups",
            Local::now(),
        );
        let runner = FakeRunner {
            exit_code: Some(0),
            calls: RefCell::default(),
        };
        let mut exec = Executor::new(&ctx, &runner);
        let err = exec
            .execute(action(&ctx, ActionKind::Delete, "a.part", Category::Other))
            .expect_err("backup root must fail");
        assert_eq!(err.code(), "TT-2002");
        assert!(dir.path().join("a.part").exists(), "no partial delete");
    }

    #[test]
    fn tasks_delegate_to_runner_and_report_failures() {
        let (_dir, ctx) = fixture();
        let runner = FakeRunner {
            exit_code: Some(100),
            calls: RefCell::default(),
        };
        let exec = Executor::new(&ctx, &runner);
        let task = SystemTask {
            name: "clean package cache".to_string(),
            tag: ActionTag::Cleanup,
            program: "apt-get".to_string(),
            args: vec!["clean".to_string()],
        };
        let result = exec.run_task(task);
        assert_eq!(runner.calls.borrow().as_slice(), ["apt-get clean"]);
        assert_eq!(
            result.outcome,
            TaskOutcome::Skipped {
                reason: SkipReason::Failed("exit status 100: E: could not get lock".to_string())
            }
        );
    }
}
