//! Confirmation Gate: per-action approval under a run-wide policy.

pub mod confirm;
pub mod prompt;
