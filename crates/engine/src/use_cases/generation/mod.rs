//! Entity generation: intake, the pipeline orchestrator, and its steps.

mod pipeline;
mod start;
mod steps;

pub use pipeline::RunPipeline;
pub use start::{GenerationAccepted, IntakeError, StartGeneration};
