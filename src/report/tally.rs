//! Incremental run accounting.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::executor::act::{ExecutionResult, TaskResult};
use crate::scanner::planner::CandidateAction;
use crate::scanner::rules::Category;

/// Totals for one run. Only completed actions move the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub items_cleaned: u64,
    pub space_saved_bytes: u64,
    pub items_skipped: u64,
    pub per_category_counts: BTreeMap<Category, u64>,
}

/// Accumulates results in execution order.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    summary: RunSummary,
    completed: Vec<ExecutionResult>,
    skipped: Vec<ExecutionResult>,
    planned: Vec<CandidateAction>,
    tasks: Vec<TaskResult>,
}

impl Tally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: ExecutionResult) {
        if result.success() {
            self.summary.items_cleaned += 1;
            self.summary.space_saved_bytes += result.bytes_affected();
            *self
                .summary
                .per_category_counts
                .entry(result.action.category)
                .or_default() += 1;
            self.completed.push(result);
        } else {
            self.summary.items_skipped += 1;
            self.skipped.push(result);
        }
    }

    /// Report-only runs list what would happen without counting it.
    pub fn record_planned(&mut self, action: CandidateAction) {
        self.planned.push(action);
    }

    pub fn record_task(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    #[must_use]
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    #[must_use]
    pub fn completed(&self) -> &[ExecutionResult] {
        &self.completed
    }

    #[must_use]
    pub fn skipped(&self) -> &[ExecutionResult] {
        &self.skipped
    }

    #[must_use]
    pub fn planned(&self) -> &[CandidateAction] {
        &self.planned
    }

    #[must_use]
    pub fn tasks(&self) -> &[TaskResult] {
        &self.tasks
    }
}
