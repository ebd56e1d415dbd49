//! Use cases: orchestration across entities and ports.

pub mod generation;
pub mod sessions;
