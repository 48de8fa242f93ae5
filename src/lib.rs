//! TidyTux: interactive disk-cleanup orchestration.
//!
//! Reads free space on the target volume, picks a run mode, classifies the
//! target's files into organize / retire / delete actions, confirms each one,
//! and executes approved actions only after a verified backup exists.

pub mod cli;
#[cfg(feature = "cli")]
pub mod cli_app;
pub mod core;
pub mod executor;
pub mod gate;
pub mod logger;
pub mod monitor;
pub mod report;
pub mod scanner;
