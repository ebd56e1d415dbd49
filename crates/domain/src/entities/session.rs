//! GenerationSession - the unit of work driven by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{EntityId, ReservationId, SessionId, UserId};
use crate::pipeline::PipelineStep;

use super::draft::EntityDraft;
use super::request::EntityKind;

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One generation session. Owned exclusively by the orchestrator task for
/// its lifetime; no mutation is permitted after a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSession {
    pub id: SessionId,
    pub requester_id: UserId,
    pub status: SessionStatus,
    pub current_step: Option<PipelineStep>,
    /// Monotonically non-decreasing, 0-100.
    pub progress_percent: u8,
    pub reserved_credits: u32,
    /// Attached once the ledger accepts the hold; intake rejects the
    /// request before spawning the pipeline if the hold fails.
    pub reservation_id: Option<ReservationId>,
    pub draft: EntityDraft,
    pub created_at: DateTime<Utc>,
    pub entity_id: Option<EntityId>,
    pub failure_reason: Option<String>,
}

impl GenerationSession {
    pub fn new(
        requester_id: UserId,
        kind: EntityKind,
        reserved_credits: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            requester_id,
            status: SessionStatus::Pending,
            current_step: None,
            progress_percent: 0,
            reserved_credits,
            reservation_id: None,
            draft: EntityDraft::new(kind),
            created_at: now,
            entity_id: None,
            failure_reason: None,
        }
    }

    /// Link the credit hold backing this session.
    pub fn attach_reservation(&mut self, reservation_id: ReservationId) {
        self.reservation_id = Some(reservation_id);
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state_transition(format!(
                "session {} is already terminal",
                self.id
            )));
        }
        Ok(())
    }

    /// Begin pipeline execution.
    pub fn start(&mut self) -> Result<(), DomainError> {
        self.ensure_live()?;
        self.status = SessionStatus::Running;
        Ok(())
    }

    /// Enter a step.
    pub fn begin_step(&mut self, step: PipelineStep) -> Result<(), DomainError> {
        self.ensure_live()?;
        self.current_step = Some(step);
        Ok(())
    }

    /// Consume a finished step's progress weight. Progress only ever moves
    /// forward; the sum of catalog weights caps it at exactly 100.
    pub fn advance(&mut self, step: PipelineStep) -> Result<u8, DomainError> {
        self.ensure_live()?;
        self.progress_percent = self
            .progress_percent
            .saturating_add(step.weight())
            .min(100);
        Ok(self.progress_percent)
    }

    /// Terminal success. Requires the full catalog to have been consumed.
    pub fn complete(&mut self, entity_id: EntityId) -> Result<(), DomainError> {
        self.ensure_live()?;
        if self.progress_percent != 100 {
            return Err(DomainError::invalid_state_transition(format!(
                "session {} completed at {}%",
                self.id, self.progress_percent
            )));
        }
        self.status = SessionStatus::Completed;
        self.entity_id = Some(entity_id);
        self.current_step = None;
        Ok(())
    }

    /// Terminal failure.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_live()?;
        self.status = SessionStatus::Failed;
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GenerationSession {
        let mut s = GenerationSession::new(UserId::new(), EntityKind::Character, 75, Utc::now());
        s.attach_reservation(ReservationId::new());
        s
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_100() {
        let mut s = session();
        s.start().expect("start");
        let mut last = 0;
        for step in PipelineStep::CATALOG {
            s.begin_step(step).expect("begin");
            let p = s.advance(step).expect("advance");
            assert!(p >= last, "progress must be non-decreasing");
            last = p;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn complete_requires_full_progress() {
        let mut s = session();
        s.start().expect("start");
        s.advance(PipelineStep::NormalizingInput).expect("advance");
        assert!(s.complete(EntityId::new()).is_err());
    }

    #[test]
    fn no_mutation_after_failed() {
        let mut s = session();
        s.start().expect("start");
        s.fail("provider unavailable").expect("fail");
        assert_eq!(s.status, SessionStatus::Failed);
        assert!(s.start().is_err());
        assert!(s.advance(PipelineStep::GeneratingCore).is_err());
        assert!(s.fail("again").is_err());
    }

    #[test]
    fn no_mutation_after_completed() {
        let mut s = session();
        s.start().expect("start");
        for step in PipelineStep::CATALOG {
            s.advance(step).expect("advance");
        }
        s.complete(EntityId::new()).expect("complete");
        assert!(s.begin_step(PipelineStep::Persisting).is_err());
        assert!(s.fail("late failure").is_err());
    }
}
