//! Adaptive replanning: reinforcement for weak skills, repetition reduction
//! for strong ones, applied as logged atomic plan diffs.

pub mod analyzer;
pub mod apply;
pub mod handlers;
