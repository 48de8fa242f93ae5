//! Backup-Then-Act Executor: verified backups before any destructive step,
//! plus delegated system tasks through an injected command runner.

pub mod act;
pub mod backup;
pub mod runner;
pub mod tasks;
