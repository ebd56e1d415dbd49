//! Progress events published on the per-session channel.
//!
//! Events are immutable values; the orchestrator is their single writer, so
//! the per-session ordering invariant (non-decreasing progress, terminal
//! event last) holds by construction.

use serde::{Deserialize, Serialize};

use crate::entities::StepOutput;
use crate::ids::{EntityId, SessionId};
use crate::pipeline::{PipelineStep, COMPLETED_LABEL, ERROR_LABEL};

/// Typed payload snapshot carried on a progress event, keyed by the step
/// that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressData {
    StepOutput(StepOutput),
    Completed {
        entity_id: EntityId,
        summary: String,
        /// False when the downstream asset job could not be enqueued.
        asset_job_queued: bool,
        /// True when any optional step degraded to fallback output.
        degraded: bool,
    },
    Error {
        detail: Option<String>,
    },
}

/// One event on a session's progress stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub session_id: SessionId,
    /// Step label, or `COMPLETED` / `ERROR` for terminal events.
    pub step: String,
    /// 0-100, non-decreasing per session (0 on the ERROR terminal).
    pub progress: u8,
    pub message: String,
    pub data: Option<ProgressData>,
}

impl ProgressEvent {
    /// Event emitted after a step finishes (or is skipped with fallback).
    pub fn step_done(
        session_id: SessionId,
        step: PipelineStep,
        progress: u8,
        message: impl Into<String>,
        output: Option<StepOutput>,
    ) -> Self {
        Self {
            session_id,
            step: step.label().to_string(),
            progress,
            message: message.into(),
            data: output.map(ProgressData::StepOutput),
        }
    }

    /// Terminal success event; always 100%.
    pub fn completed(
        session_id: SessionId,
        entity_id: EntityId,
        summary: String,
        asset_job_queued: bool,
        degraded: bool,
    ) -> Self {
        Self {
            session_id,
            step: COMPLETED_LABEL.to_string(),
            progress: 100,
            message: format!("Generation complete: {summary}"),
            data: Some(ProgressData::Completed {
                entity_id,
                summary,
                asset_job_queued,
                degraded,
            }),
        }
    }

    /// Terminal failure event. Progress 0 by convention: no partial credit,
    /// see the error.
    pub fn error(
        session_id: SessionId,
        message: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            session_id,
            step: ERROR_LABEL.to_string(),
            progress: 0,
            message: message.into(),
            data: Some(ProgressData::Error { detail }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.step == COMPLETED_LABEL || self.step == ERROR_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_event_is_terminal_at_100() {
        let event = ProgressEvent::completed(
            SessionId::new(),
            EntityId::new(),
            "character \"Kael\"".to_string(),
            true,
            false,
        );
        assert!(event.is_terminal());
        assert_eq!(event.progress, 100);
        assert_eq!(event.step, COMPLETED_LABEL);
    }

    #[test]
    fn error_event_is_terminal_at_0() {
        let event = ProgressEvent::error(SessionId::new(), "provider failed", None);
        assert!(event.is_terminal());
        assert_eq!(event.progress, 0);
        assert_eq!(event.step, ERROR_LABEL);
    }

    #[test]
    fn step_event_carries_typed_output() {
        let event = ProgressEvent::step_done(
            SessionId::new(),
            PipelineStep::ExtractingDescription,
            30,
            "Description ready",
            Some(StepOutput::DescriptionExtracted {
                description: "desc".to_string(),
            }),
        );
        assert!(!event.is_terminal());
        assert_eq!(event.step, "EXTRACTING_DESCRIPTION");
        assert!(matches!(
            event.data,
            Some(ProgressData::StepOutput(StepOutput::DescriptionExtracted { .. }))
        ));
    }

    #[test]
    fn events_serialize_with_camel_case_keys() {
        let event = ProgressEvent::error(SessionId::new(), "boom", Some("detail".to_string()));
        let json = serde_json::to_value(&event).expect("serialize");
        assert!(json.get("sessionId").is_some());
        assert_eq!(json["step"], "ERROR");
    }
}
