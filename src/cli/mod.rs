//! Orchestration sequences behind the command-line surface.

pub mod clean;
