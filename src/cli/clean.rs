//! Cleanup orchestration for `tidytux`.
//!
//! Inspect the target volume, fix the run mode, plan candidate actions,
//! pass each through the confirmation gate, execute approved ones with
//! backup-then-act, and render the report. Actions run strictly one at a
//! time in plan order.

#![allow(missing_docs)]

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::core::config::SystemConfig;
use crate::core::context::{RunContext, RunMode, RunOptions};
use crate::core::errors::{Result, TidyError};
use crate::executor::act::{ExecutionResult, Executor, SkipReason, TaskOutcome, TaskResult};
use crate::executor::runner::CommandRunner;
use crate::executor::tasks::system_tasks;
use crate::gate::confirm::{ActionTag, Confirmation, ConfirmationGate, PROMPT_TIMEOUT};
use crate::gate::prompt::PromptInput;
use crate::logger::jsonl::{JsonlLogger, LogEvent};
use crate::monitor::space::{SpaceProbe, SpaceReading, inspect};
use crate::report::render::{ReportDocument, ReportHeader, format_bytes, render};
use crate::report::tally::Tally;
use crate::scanner::dedup::FamilySet;
use crate::scanner::entry::scan_directory_with;
use crate::scanner::planner::{Plan, RuleEngine};

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Everything that parameterizes one run.
#[derive(Debug, Clone)]
pub struct CleanupRequest {
    pub options: RunOptions,
    pub target: PathBuf,
    /// `<config-root>/backups`.
    pub backup_root: PathBuf,
    pub families: FamilySet,
    pub system: SystemConfig,
    pub started_at: DateTime<Local>,
    pub prompt_timeout: Duration,
}

impl CleanupRequest {
    #[must_use]
    pub fn new(
        options: RunOptions,
        target: impl Into<PathBuf>,
        backup_root: impl Into<PathBuf>,
        families: FamilySet,
    ) -> Self {
        Self {
            options,
            target: target.into(),
            backup_root: backup_root.into(),
            families,
            system: SystemConfig::default(),
            started_at: Local::now(),
            prompt_timeout: PROMPT_TIMEOUT,
        }
    }
}

/// External capabilities the run talks to.
pub struct Collaborators<'a> {
    pub probe: &'a dyn SpaceProbe,
    pub runner: &'a dyn CommandRunner,
    pub prompt: Box<dyn PromptInput + 'a>,
    /// Where prompts and emergency notices go.
    pub prompt_out: Box<dyn Write + 'a>,
    /// Progress and per-action detail.
    pub console: Box<dyn Write + 'a>,
    pub logger: &'a mut JsonlLogger,
}

/// What a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct CleanupOutcome {
    pub context: RunContext,
    pub reading: SpaceReading,
    pub report: ReportDocument,
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Run one cleanup pass.
///
/// Fatal errors: an inspection failure (target unreadable) before anything
/// is touched, and a backup directory that cannot be created. Everything
/// else is a per-action skip that shows up in the report.
pub fn run_cleanup_sequence(request: &CleanupRequest, collab: Collaborators<'_>) -> Result<CleanupOutcome> {
    let Collaborators {
        probe,
        runner,
        prompt,
        prompt_out,
        mut console,
        logger,
    } = collab;

    // Step 1: Inspect and fix the mode for the whole run.
    let reading = inspect(probe, &request.target)?;
    let ctx = RunContext::new(
        request.options,
        reading.band,
        &request.target,
        &request.backup_root,
        request.started_at,
    );
    let policy = ctx.confirm_policy();
    logger.log(&LogEvent::RunStarted {
        run_id: ctx.run_id(),
        target: ctx.target.clone(),
        mode: ctx.mode,
        band: reading.band,
        available_bytes: reading.available_bytes,
        policy,
        report_only: ctx.report_only,
    });

    if !ctx.quiet {
        let _ = writeln!(
            console,
            "Free space on {}: {} of {} ({} band)",
            ctx.target.display(),
            format_bytes(reading.available_bytes),
            format_bytes(reading.total_bytes),
            reading.band
        );
        match ctx.mode {
            RunMode::Emergency => {
                let _ = writeln!(console, "Emergency mode: cleanup actions are approved automatically.");
            }
            RunMode::Warning => {
                let _ = writeln!(console, "Disk space is getting low; consider running with --emergency.");
            }
            RunMode::Normal => {}
        }
    }

    // Step 2: Plan.
    let mut unreadable = Vec::new();
    let entries = scan_directory_with(&ctx.target, |path, err| {
        unreadable.push((path.to_path_buf(), err.to_string()));
    })
    .map_err(|err| TidyError::Inspection {
        path: ctx.target.clone(),
        details: err.to_string(),
    })?;
    for (path, reason) in unreadable {
        if ctx.verbose {
            let _ = writeln!(console, "  unreadable {}: {reason}", path.display());
        }
        logger.log(&LogEvent::EntryUnreadable { path, reason });
    }
    let Plan { actions, kept } = RuleEngine::new(request.families.clone()).plan(&entries, &ctx);
    let tasks = system_tasks(&request.system);
    logger.log(&LogEvent::Planned {
        actions: actions.len(),
        tasks: tasks.len(),
    });

    if actions.is_empty() && tasks.is_empty() && !ctx.quiet {
        let _ = writeln!(console, "Nothing to clean.");
    }

    let mut tally = Tally::new();

    // Step 3 (report-only): list, touch nothing.
    if ctx.report_only {
        for action in actions {
            if ctx.verbose {
                let _ = writeln!(console, "  would {}", action.describe());
            }
            tally.record_planned(action);
        }
        for task in &tasks {
            if ctx.verbose {
                let _ = writeln!(console, "  would run {}", task.describe());
            }
        }
        return Ok(finish(&ctx, reading, &tally, &kept, logger));
    }

    // Step 3: Confirm and execute, one action at a time.
    let mut gate = ConfirmationGate::new(policy, prompt, prompt_out).with_timeout(request.prompt_timeout);
    let mut executor = Executor::new(&ctx, runner);

    for action in actions {
        let description = action.describe();
        let decision = gate.confirm(&description, ActionTag::Cleanup);
        logger.log(&LogEvent::Confirmation {
            action: description.clone(),
            decision,
            auto: policy.auto_approves(ActionTag::Cleanup),
        });

        let result = match decision {
            Confirmation::Approved => match executor.execute(action) {
                Ok(result) => result,
                Err(err) => {
                    logger.log(&LogEvent::RunFinished {
                        items_cleaned: tally.summary().items_cleaned,
                        space_saved_bytes: tally.summary().space_saved_bytes,
                        items_skipped: tally.summary().items_skipped,
                    });
                    return Err(err);
                }
            },
            Confirmation::Denied => ExecutionResult::skipped(action, SkipReason::Denied),
            Confirmation::TimedOutDenied => ExecutionResult::skipped(action, SkipReason::TimedOut),
        };

        log_result(logger, &result);
        if ctx.verbose {
            match result.skip_reason() {
                None => {
                    let _ = writeln!(
                        console,
                        "  ok    {} ({})",
                        description,
                        format_bytes(result.action.size_bytes)
                    );
                }
                Some(reason) => {
                    let _ = writeln!(console, "  skip  {description}: {reason}");
                }
            }
        }
        tally.record(result);
    }

    // Step 4: Delegated system tasks.
    for task in tasks {
        let description = task.describe();
        let decision = gate.confirm(&description, task.tag);
        logger.log(&LogEvent::Confirmation {
            action: description.clone(),
            decision,
            auto: policy.auto_approves(task.tag),
        });
        let result = match decision {
            Confirmation::Approved => executor.run_task(task),
            Confirmation::Denied => TaskResult::skipped(task, SkipReason::Denied),
            Confirmation::TimedOutDenied => {
                TaskResult::skipped(task, SkipReason::TimedOut)
            }
        };
        match &result.outcome {
            TaskOutcome::Completed => logger.log(&LogEvent::TaskCompleted {
                name: result.task.name.clone(),
                command: result.task.command_line(),
            }),
            TaskOutcome::Skipped { reason } => logger.log(&LogEvent::TaskSkipped {
                name: result.task.name.clone(),
                reason: reason.clone(),
            }),
        }
        if ctx.verbose {
            let _ = writeln!(console, "  task  {description}");
        }
        tally.record_task(result);
    }

    Ok(finish(&ctx, reading, &tally, &kept, logger))
}

fn log_result(logger: &mut JsonlLogger, result: &ExecutionResult) {
    match result.skip_reason() {
        None => logger.log(&LogEvent::ActionCompleted {
            kind: result.action.kind,
            source: result.action.source.clone(),
            destination: result.final_path.clone(),
            backup: result.backup.as_ref().map(|b| b.backup_path.clone()),
            bytes_affected: result.bytes_affected(),
        }),
        Some(reason) => logger.log(&LogEvent::ActionSkipped {
            kind: result.action.kind,
            source: result.action.source.clone(),
            reason: reason.clone(),
        }),
    }
}

fn finish(
    ctx: &RunContext,
    reading: SpaceReading,
    tally: &Tally,
    kept: &[PathBuf],
    logger: &mut JsonlLogger,
) -> CleanupOutcome {
    let summary = tally.summary();
    logger.log(&LogEvent::RunFinished {
        items_cleaned: summary.items_cleaned,
        space_saved_bytes: summary.space_saved_bytes,
        items_skipped: summary.items_skipped,
    });
    CleanupOutcome {
        context: ctx.clone(),
        reading,
        report: render(ReportHeader::new(ctx, &reading), tally, kept),
    }
}
