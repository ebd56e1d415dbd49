//! Generation intake.
//!
//! Everything here is synchronous with the request: cost, credit hold,
//! session registration, progress stream creation. The pipeline itself
//! runs on a detached task; the caller gets the session id back before
//! any step executes.

use std::sync::Arc;

use personaforge_domain::{cost, GenerationRequest, GenerationSession, SessionId};

use crate::infrastructure::ports::{ClockPort, CreditLedgerPort, LedgerError, ProgressPort};
use crate::use_cases::sessions::SessionStore;

use super::pipeline::RunPipeline;

#[derive(Debug, Clone)]
pub struct GenerationAccepted {
    pub session_id: SessionId,
    pub cost: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Insufficient credits: need {required}, have {available}")]
    InsufficientCredits { required: u32, available: u32 },
    #[error("Intake failed: {0}")]
    Internal(String),
}

pub struct StartGeneration {
    pipeline: Arc<RunPipeline>,
    ledger: Arc<dyn CreditLedgerPort>,
    sessions: Arc<SessionStore>,
    progress: Arc<dyn ProgressPort>,
    clock: Arc<dyn ClockPort>,
}

impl StartGeneration {
    pub fn new(
        pipeline: Arc<RunPipeline>,
        ledger: Arc<dyn CreditLedgerPort>,
        sessions: Arc<SessionStore>,
        progress: Arc<dyn ProgressPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            pipeline,
            ledger,
            sessions,
            progress,
            clock,
        }
    }

    /// Accept a validated request, hold credits, spawn the pipeline.
    ///
    /// On any error here no session exists, no credits are held, and no
    /// events will ever be published for the rejected request.
    pub async fn execute(&self, request: GenerationRequest) -> Result<GenerationAccepted, IntakeError> {
        let amount = cost(request.modality());
        let mut session = GenerationSession::new(
            request.requester_id,
            request.kind,
            amount,
            self.clock.now(),
        );

        let reservation_id = self
            .ledger
            .reserve(request.requester_id, session.id, amount)
            .await
            .map_err(|error| match error {
                LedgerError::InsufficientBalance {
                    required,
                    available,
                } => IntakeError::InsufficientCredits {
                    required,
                    available,
                },
                other => IntakeError::Internal(other.to_string()),
            })?;
        session.attach_reservation(reservation_id);

        // Stream exists before the id is returned, so a subscriber can
        // never race the first event.
        self.progress.open(session.id).await;
        self.sessions.insert(session.clone());

        tracing::info!(
            session_id = %session.id,
            requester_id = %request.requester_id,
            kind = %request.kind,
            cost = amount,
            "generation session accepted"
        );

        let session_id = session.id;
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            pipeline.run(session, request).await;
        });

        Ok(GenerationAccepted {
            session_id,
            cost: amount,
        })
    }
}
