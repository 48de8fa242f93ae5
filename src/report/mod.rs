//! Tally & Reporter: run accounting and report rendering.

pub mod render;
pub mod tally;
