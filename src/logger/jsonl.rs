//! One JSON object per line, one file per run.
//!
//! Logging never fails a run: if the file cannot be opened or a write fails,
//! the logger falls back to stderr and keeps going.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::gate::confirm::{ConfirmPolicy, Confirmation};
use crate::monitor::space::Band;
use crate::core::context::RunMode;
use crate::executor::act::SkipReason;
use crate::scanner::planner::ActionKind;

/// Events written to the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        run_id: String,
        target: PathBuf,
        mode: RunMode,
        band: Band,
        available_bytes: u64,
        policy: ConfirmPolicy,
        report_only: bool,
    },
    /// A directory entry the scan could not read.
    EntryUnreadable {
        path: PathBuf,
        reason: String,
    },
    Planned {
        actions: usize,
        tasks: usize,
    },
    Confirmation {
        action: String,
        decision: Confirmation,
        /// Approved by policy, without a prompt.
        auto: bool,
    },
    ActionCompleted {
        kind: ActionKind,
        source: PathBuf,
        destination: Option<PathBuf>,
        backup: Option<PathBuf>,
        bytes_affected: u64,
    },
    ActionSkipped {
        kind: ActionKind,
        source: PathBuf,
        reason: SkipReason,
    },
    TaskCompleted {
        name: String,
        command: String,
    },
    TaskSkipped {
        name: String,
        reason: SkipReason,
    },
    RunFinished {
        items_cleaned: u64,
        space_saved_bytes: u64,
        items_skipped: u64,
    },
}

#[derive(Serialize)]
struct Line<'a> {
    ts: String,
    #[serde(flatten)]
    event: &'a LogEvent,
}

enum Sink {
    File(BufWriter<File>),
    Stderr,
    Disabled,
}

/// JSONL writer for one run.
pub struct JsonlLogger {
    sink: Sink,
    path: Option<PathBuf>,
}

impl JsonlLogger {
    /// Open (append) `path`, creating parent directories. Degrades to stderr.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        let opened = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(path));
        match opened {
            Ok(file) => Self {
                sink: Sink::File(BufWriter::new(file)),
                path: Some(path.to_path_buf()),
            },
            Err(err) => {
                eprintln!("[TT-3900] activity log unavailable at {}: {err}; logging to stderr", path.display());
                Self {
                    sink: Sink::Stderr,
                    path: None,
                }
            }
        }
    }

    /// Logger that drops every event.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            sink: Sink::Disabled,
            path: None,
        }
    }

    /// File being written, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn log(&mut self, event: &LogEvent) {
        let line = Line {
            ts: Local::now().to_rfc3339(),
            event,
        };
        let Ok(json) = serde_json::to_string(&line) else {
            return;
        };
        let failed = match &mut self.sink {
            Sink::File(writer) => writeln!(writer, "{json}").and_then(|()| writer.flush()).is_err(),
            Sink::Stderr => {
                let _ = writeln!(io::stderr(), "{json}");
                false
            }
            Sink::Disabled => false,
        };
        if failed {
            self.sink = Sink::Stderr;
            self.path = None;
            let _ = writeln!(io::stderr(), "{json}");
        }
    }
}
