//! The fixed, ordered step catalog for the generation pipeline.
//!
//! Order matters: later steps consume earlier outputs. Each step carries a
//! pre-assigned progress weight; the weights across the whole catalog sum to
//! exactly 100 so that progress reaches 100 no matter which optional steps
//! were skipped (a skipped step consumes its weight instantly).

use serde::{Deserialize, Serialize};

use crate::entities::StepOutput;

/// Step label used on the terminal event of a failed session.
pub const ERROR_LABEL: &str = "ERROR";

/// Step label used on the terminal event of a completed session.
pub const COMPLETED_LABEL: &str = "COMPLETED";

/// One step of the generation pipeline, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStep {
    /// Normalize the uploaded image reference (local, no provider call).
    NormalizingInput,
    /// Extract a salient description; uses the image-analysis capability
    /// when an image was supplied. OPTIONAL: falls back to a generic
    /// description when the capability fails.
    ExtractingDescription,
    /// Generate core attributes (name, demographic fields). REQUIRED.
    GeneratingCore,
    /// Generate the personality / narrative body. REQUIRED.
    GeneratingNarrative,
    /// Merge accumulated outputs into a complete entity. REQUIRED, local.
    CompilingEntity,
    /// Persist the compiled entity. REQUIRED.
    Persisting,
    /// Enqueue the downstream asset-generation job. Failure is non-fatal.
    QueuingAsset,
}

impl PipelineStep {
    /// All steps in execution order.
    pub const CATALOG: [PipelineStep; 7] = [
        PipelineStep::NormalizingInput,
        PipelineStep::ExtractingDescription,
        PipelineStep::GeneratingCore,
        PipelineStep::GeneratingNarrative,
        PipelineStep::CompilingEntity,
        PipelineStep::Persisting,
        PipelineStep::QueuingAsset,
    ];

    /// Wire label for progress events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NormalizingInput => "NORMALIZING_INPUT",
            Self::ExtractingDescription => "EXTRACTING_DESCRIPTION",
            Self::GeneratingCore => "GENERATING_CORE",
            Self::GeneratingNarrative => "GENERATING_NARRATIVE",
            Self::CompilingEntity => "COMPILING_ENTITY",
            Self::Persisting => "PERSISTING",
            Self::QueuingAsset => "QUEUING_ASSET",
        }
    }

    /// Share of the 0-100 progress range this step consumes.
    pub fn weight(&self) -> u8 {
        match self {
            Self::NormalizingInput => 10,
            Self::ExtractingDescription => 20,
            Self::GeneratingCore => 25,
            Self::GeneratingNarrative => 25,
            Self::CompilingEntity => 10,
            Self::Persisting => 5,
            Self::QueuingAsset => 5,
        }
    }

    /// REQUIRED steps fail the whole session; OPTIONAL steps degrade to
    /// fallback data and the pipeline continues.
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::ExtractingDescription | Self::QueuingAsset)
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a single step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Ok,
    SkippedFallback,
    Fatal,
}

/// Output of one pipeline step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step: PipelineStep,
    pub outcome: StepOutcome,
    /// Partial fields to merge into the session draft.
    pub output: Option<StepOutput>,
    /// Present iff outcome is not `Ok`.
    pub error_detail: Option<String>,
}

impl StepResult {
    pub fn ok(step: PipelineStep, output: StepOutput) -> Self {
        Self {
            step,
            outcome: StepOutcome::Ok,
            output: Some(output),
            error_detail: None,
        }
    }

    pub fn fallback(step: PipelineStep, output: StepOutput, detail: impl Into<String>) -> Self {
        Self {
            step,
            outcome: StepOutcome::SkippedFallback,
            output: Some(output),
            error_detail: Some(detail.into()),
        }
    }

    pub fn fatal(step: PipelineStep, detail: impl Into<String>) -> Self {
        Self {
            step,
            outcome: StepOutcome::Fatal,
            output: None,
            error_detail: Some(detail.into()),
        }
    }
}
