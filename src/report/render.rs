//! Report rendering: terminal text, HTML log artifact and JSON.
//!
//! Rendering is pure; writing the artifact somewhere is the caller's job.

#![allow(missing_docs)]

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::core::context::{RunContext, RunMode};
use crate::core::errors::Result;
use crate::executor::act::{ExecutionResult, TaskOutcome};
use crate::monitor::space::{Band, SpaceReading};
use crate::report::tally::{RunSummary, Tally};
use crate::scanner::planner::{ActionKind, CandidateAction};
use crate::scanner::rules::Category;

/// Binary-unit size, e.g. `60.0 MiB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportHeader {
    pub run_id: String,
    pub started_at: DateTime<Local>,
    pub target: PathBuf,
    pub mode: RunMode,
    pub band: Band,
    pub available_bytes: u64,
    pub report_only: bool,
    pub backup_dir: Option<PathBuf>,
}

impl ReportHeader {
    #[must_use]
    pub fn new(ctx: &RunContext, reading: &SpaceReading) -> Self {
        Self {
            run_id: ctx.run_id(),
            started_at: ctx.started_at,
            target: ctx.target.clone(),
            mode: ctx.mode,
            band: reading.band,
            available_bytes: reading.available_bytes,
            report_only: ctx.report_only,
            backup_dir: (!ctx.report_only).then(|| ctx.backup_dir()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportItem {
    pub kind: ActionKind,
    pub description: String,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub size_bytes: u64,
    pub bytes_affected: u64,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_detail: Option<String>,
}

impl ReportItem {
    fn from_result(result: &ExecutionResult) -> Self {
        let mut item = Self::from_action(&result.action);
        item.bytes_affected = result.bytes_affected();
        if let Some(path) = &result.final_path {
            item.destination = Some(path.clone());
        }
        if let Some(reason) = result.skip_reason() {
            item.reason = Some(reason.label().to_string());
            item.reason_detail = Some(reason.to_string());
        }
        item
    }

    fn from_action(action: &CandidateAction) -> Self {
        Self {
            kind: action.kind,
            description: action.describe(),
            source: action.source.clone(),
            destination: action.destination.clone(),
            size_bytes: action.size_bytes,
            bytes_affected: 0,
            category: action.category,
            reason: None,
            reason_detail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTask {
    pub name: String,
    pub command: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Everything a run produced, ready for any renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    pub header: ReportHeader,
    pub summary: RunSummary,
    pub completed: Vec<ReportItem>,
    pub skipped: Vec<ReportItem>,
    pub planned: Vec<ReportItem>,
    pub kept: Vec<PathBuf>,
    pub tasks: Vec<ReportTask>,
}

/// Build the document from the tally. The summary is frozen from here on.
#[must_use]
pub fn render(header: ReportHeader, tally: &Tally, kept: &[PathBuf]) -> ReportDocument {
    ReportDocument {
        header,
        summary: tally.summary().clone(),
        completed: tally.completed().iter().map(ReportItem::from_result).collect(),
        skipped: tally.skipped().iter().map(ReportItem::from_result).collect(),
        planned: tally.planned().iter().map(ReportItem::from_action).collect(),
        kept: kept.to_vec(),
        tasks: tally
            .tasks()
            .iter()
            .map(|t| ReportTask {
                name: t.task.name.clone(),
                command: t.task.command_line(),
                completed: matches!(t.outcome, TaskOutcome::Completed),
                reason: match &t.outcome {
                    TaskOutcome::Completed => None,
                    TaskOutcome::Skipped { reason } => Some(reason.to_string()),
                },
            })
            .collect(),
    }
}

impl ReportDocument {
    /// Terminal rendering. `verbose` adds per-action detail.
    #[must_use]
    pub fn to_text(&self, verbose: bool) -> String {
        let h = &self.header;
        let s = &self.summary;
        let mut out = String::new();
        let _ = writeln!(out, "TidyTux report {} ({} mode, {} band)", h.run_id, h.mode, h.band);
        let _ = writeln!(out, "Target: {}", h.target.display());
        let _ = writeln!(out, "Free space: {}", format_bytes(h.available_bytes));
        if let Some(dir) = &h.backup_dir {
            let _ = writeln!(out, "Backups: {}", dir.display());
        }
        let _ = writeln!(out, "Items cleaned: {}", s.items_cleaned);
        let _ = writeln!(
            out,
            "Space reclaimed: {} ({} bytes)",
            format_bytes(s.space_saved_bytes),
            s.space_saved_bytes
        );
        if !s.per_category_counts.is_empty() {
            let _ = writeln!(out, "By category:");
            for (category, count) in &s.per_category_counts {
                let _ = writeln!(out, "  {:<10} {count}", category.dir_name());
            }
        }

        if verbose && !self.completed.is_empty() {
            let _ = writeln!(out, "Completed ({}):", self.completed.len());
            for item in &self.completed {
                let dest = item
                    .destination
                    .as_ref()
                    .map(|d| format!(" -> {}", d.display()))
                    .unwrap_or_default();
                let _ = writeln!(out, "  {}{dest} ({})", item.description, format_bytes(item.size_bytes));
            }
        }

        if !self.skipped.is_empty() {
            let _ = writeln!(out, "Skipped ({}):", self.skipped.len());
            for item in &self.skipped {
                let label = item.reason.as_deref().unwrap_or("skipped");
                let _ = writeln!(out, "  [{label}] {}", item.description);
                if verbose {
                    if let Some(detail) = &item.reason_detail {
                        let _ = writeln!(out, "      {detail}");
                    }
                }
            }
        }

        if h.report_only {
            let _ = writeln!(out, "Planned, not executed ({}):", self.planned.len());
            for item in &self.planned {
                let _ = writeln!(out, "  {} ({})", item.description, format_bytes(item.size_bytes));
            }
        }

        if verbose && !self.kept.is_empty() {
            let _ = writeln!(out, "Kept newest duplicates:");
            for path in &self.kept {
                let _ = writeln!(out, "  {}", path.display());
            }
        }

        if !self.tasks.is_empty() {
            let _ = writeln!(out, "System tasks:");
            for task in &self.tasks {
                match &task.reason {
                    None => {
                        let _ = writeln!(out, "  [done] {}", task.name);
                    }
                    Some(reason) => {
                        let _ = writeln!(out, "  [skipped] {}: {reason}", task.name);
                    }
                }
            }
        }
        out
    }

    /// Self-contained HTML page for the per-run log directory.
    #[must_use]
    pub fn to_html(&self) -> String {
        let h = &self.header;
        let s = &self.summary;
        let mut out = String::new();
        let _ = writeln!(out, "<!DOCTYPE html>");
        let _ = writeln!(out, "<html><head><meta charset=\"utf-8\">");
        let _ = writeln!(out, "<title>TidyTux report {}</title>", escape_html(&h.run_id));
        let _ = writeln!(
            out,
            "<style>body{{font-family:sans-serif}}table{{border-collapse:collapse}}td,th{{border:1px solid #ccc;padding:4px 8px}}</style>"
        );
        let _ = writeln!(out, "</head><body>");
        let _ = writeln!(out, "<h1>TidyTux report {}</h1>", escape_html(&h.run_id));
        let _ = writeln!(out, "<ul>");
        let _ = writeln!(out, "<li>Started: {}</li>", h.started_at.to_rfc3339());
        let _ = writeln!(out, "<li>Target: {}</li>", escape_html(&h.target.display().to_string()));
        let _ = writeln!(out, "<li>Mode: {} (band {})</li>", h.mode, h.band);
        let _ = writeln!(out, "<li>Free space: {}</li>", format_bytes(h.available_bytes));
        let _ = writeln!(out, "<li>Report only: {}</li>", h.report_only);
        let _ = writeln!(out, "</ul>");

        let _ = writeln!(out, "<h2>Summary</h2>");
        let _ = writeln!(
            out,
            "<p id=\"items-cleaned\" data-value=\"{0}\">Items cleaned: {0}</p>",
            s.items_cleaned
        );
        let _ = writeln!(
            out,
            "<p id=\"space-saved\" data-bytes=\"{}\">Space reclaimed: {}</p>",
            s.space_saved_bytes,
            format_bytes(s.space_saved_bytes)
        );
        let _ = writeln!(out, "<table><tr><th>Category</th><th>Items</th></tr>");
        for (category, count) in &s.per_category_counts {
            let _ = writeln!(out, "<tr><td>{}</td><td>{count}</td></tr>", category.dir_name());
        }
        let _ = writeln!(out, "</table>");

        write_item_table(&mut out, "Completed", &self.completed);
        write_item_table(&mut out, "Skipped", &self.skipped);
        if h.report_only {
            write_item_table(&mut out, "Planned", &self.planned);
        }

        if !self.tasks.is_empty() {
            let _ = writeln!(out, "<h2>System tasks</h2><table><tr><th>Task</th><th>Command</th><th>Status</th></tr>");
            for task in &self.tasks {
                let status = task.reason.as_deref().unwrap_or("done");
                let _ = writeln!(
                    out,
                    "<tr><td>{}</td><td><code>{}</code></td><td>{}</td></tr>",
                    escape_html(&task.name),
                    escape_html(&task.command),
                    escape_html(status)
                );
            }
            let _ = writeln!(out, "</table>");
        }
        let _ = writeln!(out, "</body></html>");
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn write_item_table(out: &mut String, title: &str, items: &[ReportItem]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "<h2>{title} ({})</h2>", items.len());
    let _ = writeln!(
        out,
        "<table><tr><th>Action</th><th>Source</th><th>Category</th><th>Size</th><th>Status</th></tr>"
    );
    for item in items {
        let status = item.reason_detail.as_deref().unwrap_or("ok");
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            item.kind,
            escape_html(&item.source.display().to_string()),
            item.category,
            format_bytes(item.size_bytes),
            escape_html(status)
        );
    }
    let _ = writeln!(out, "</table>");
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
