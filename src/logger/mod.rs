//! Append-only JSONL activity log with graceful degradation to stderr.

pub mod jsonl;
