//! Category Rule Engine: directory listing, extension/age rules, duplicate
//! families and candidate-action planning.

pub mod dedup;
pub mod entry;
pub mod planner;
pub mod rules;
