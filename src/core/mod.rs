//! Core types shared by every component: errors, configuration, run context.

pub mod config;
pub mod context;
pub mod errors;
