//! The generation pipeline orchestrator.
//!
//! Runs as a detached task per session and is the session's single
//! writer: every status, progress, and draft mutation flows through here,
//! which is what makes the per-session event ordering invariant hold.
//!
//! Failure discipline:
//! - REQUIRED step fails -> release the credit hold, FAILED, ERROR event.
//! - OPTIONAL step fails -> merge fallback output, mark degraded, go on.
//! - Asset enqueue fails  -> complete anyway, flag it on the final event.
//! The credit hold ends in exactly one of committed or released.

use std::sync::Arc;

use personaforge_domain::{
    GenerationRequest, GenerationSession, PipelineStep, ProgressEvent, StepOutcome, StepOutput,
    StepResult,
};

use crate::infrastructure::capability::CapabilityRouter;
use crate::infrastructure::ports::{
    AssetJobData, AssetQueuePort, CreditLedgerPort, EntityRepo, ProgressPort,
};
use crate::use_cases::sessions::SessionStore;

use super::steps;

/// A fatal pipeline failure: which step died and why.
struct PipelineFailure {
    step: PipelineStep,
    detail: String,
}

impl PipelineFailure {
    fn new(step: PipelineStep, detail: impl Into<String>) -> Self {
        Self {
            step,
            detail: detail.into(),
        }
    }
}

pub struct RunPipeline {
    router: Arc<CapabilityRouter>,
    ledger: Arc<dyn CreditLedgerPort>,
    repo: Arc<dyn EntityRepo>,
    queue: Arc<dyn AssetQueuePort>,
    progress: Arc<dyn ProgressPort>,
    sessions: Arc<SessionStore>,
}

impl RunPipeline {
    pub fn new(
        router: Arc<CapabilityRouter>,
        ledger: Arc<dyn CreditLedgerPort>,
        repo: Arc<dyn EntityRepo>,
        queue: Arc<dyn AssetQueuePort>,
        progress: Arc<dyn ProgressPort>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            router,
            ledger,
            repo,
            queue,
            progress,
            sessions,
        }
    }

    /// Drive one session to a terminal state. Never panics, never returns
    /// an error: every failure path ends in a FAILED session with the
    /// credit hold released.
    pub async fn run(&self, mut session: GenerationSession, request: GenerationRequest) {
        let session_id = session.id;
        if let Err(failure) = self.drive(&mut session, &request).await {
            self.fail_session(&mut session, failure).await;
        }
        self.progress.close(session_id).await;
    }

    async fn drive(
        &self,
        session: &mut GenerationSession,
        request: &GenerationRequest,
    ) -> Result<(), PipelineFailure> {
        session
            .start()
            .map_err(|e| PipelineFailure::new(PipelineStep::NormalizingInput, e.to_string()))?;
        self.sessions.update(session);
        tracing::info!(session_id = %session.id, kind = %request.kind, "pipeline started");

        let result = steps::normalize_input(request);
        self.apply(session, result).await?;

        let result = steps::extract_description(&self.router, request).await;
        self.apply(session, result).await?;

        let result = steps::generate_core(&self.router, request, &session.draft).await;
        self.apply(session, result).await?;

        let result = steps::generate_narrative(&self.router, request, &session.draft).await;
        self.apply(session, result).await?;

        // Compile locally; a failure here means a REQUIRED step left the
        // draft incomplete, which is fatal.
        let step = PipelineStep::CompilingEntity;
        self.begin(session, step)?;
        let compiled = session
            .draft
            .compile()
            .map_err(|e| PipelineFailure::new(step, e.to_string()))?;
        let output = StepOutput::EntityCompiled {
            summary: compiled.summary(),
        };
        self.apply(session, StepResult::ok(step, output)).await?;

        // Single atomic write; no partial entities.
        let step = PipelineStep::Persisting;
        self.begin(session, step)?;
        let entity_id = self
            .repo
            .create(&compiled)
            .await
            .map_err(|e| PipelineFailure::new(step, e.to_string()))?;
        let progress = self.advance(session, step)?;
        self.progress
            .publish(ProgressEvent::step_done(
                session.id,
                step,
                progress,
                "Entity persisted",
                None,
            ))
            .await;

        // Fire-and-forget hand-off; failure is logged and flagged, never
        // fatal.
        let step = PipelineStep::QueuingAsset;
        self.begin(session, step)?;
        let job = AssetJobData {
            entity_id,
            entity_kind: compiled.kind,
            prompt: format!("{}, {}", compiled.name, compiled.description),
            reference_image: request.image.clone(),
            seed: rand::random(),
        };
        let asset_job_queued = match self.queue.enqueue(&job).await {
            Ok(job_id) => {
                tracing::debug!(session_id = %session.id, job_id = %job_id, "asset job queued");
                true
            }
            Err(error) => {
                tracing::warn!(session_id = %session.id, %error, "asset job could not be queued");
                false
            }
        };
        let progress = self.advance(session, step)?;
        let message = if asset_job_queued {
            "Asset generation queued"
        } else {
            "Asset generation unavailable, continuing without it"
        };
        self.progress
            .publish(ProgressEvent::step_done(session.id, step, progress, message, None))
            .await;

        if let Some(reservation_id) = session.reservation_id {
            if let Err(error) = self.ledger.commit(reservation_id).await {
                // Entity exists but the hold is gone; log loudly, the
                // reconciliation sweep has nothing to pick up here.
                tracing::error!(session_id = %session.id, %reservation_id, %error, "credit commit failed");
            }
        }

        session
            .complete(entity_id)
            .map_err(|e| PipelineFailure::new(step, e.to_string()))?;
        self.sessions.update(session);
        self.progress
            .publish(ProgressEvent::completed(
                session.id,
                entity_id,
                compiled.summary(),
                asset_job_queued,
                compiled.degraded,
            ))
            .await;
        tracing::info!(session_id = %session.id, entity_id = %entity_id, degraded = compiled.degraded, "generation complete");
        Ok(())
    }

    /// Merge a step result into the session, publish its event, or
    /// propagate a fatal failure.
    async fn apply(
        &self,
        session: &mut GenerationSession,
        result: StepResult,
    ) -> Result<(), PipelineFailure> {
        let step = result.step;
        self.begin(session, step)?;

        match result.outcome {
            StepOutcome::Ok => {
                if let Some(output) = &result.output {
                    session.draft.merge(output);
                }
                let progress = self.advance(session, step)?;
                self.progress
                    .publish(ProgressEvent::step_done(
                        session.id,
                        step,
                        progress,
                        step_message(step),
                        result.output,
                    ))
                    .await;
                Ok(())
            }
            StepOutcome::SkippedFallback => {
                if let Some(output) = &result.output {
                    session.draft.merge(output);
                }
                session.draft.mark_degraded(step);
                let progress = self.advance(session, step)?;
                tracing::warn!(
                    session_id = %session.id,
                    %step,
                    detail = result.error_detail.as_deref().unwrap_or(""),
                    "optional step degraded to fallback output"
                );
                self.progress
                    .publish(ProgressEvent::step_done(
                        session.id,
                        step,
                        progress,
                        format!("{step} unavailable, using fallback"),
                        result.output,
                    ))
                    .await;
                Ok(())
            }
            StepOutcome::Fatal => Err(PipelineFailure::new(
                step,
                result
                    .error_detail
                    .unwrap_or_else(|| "step failed without detail".to_string()),
            )),
        }
    }

    fn begin(
        &self,
        session: &mut GenerationSession,
        step: PipelineStep,
    ) -> Result<(), PipelineFailure> {
        session
            .begin_step(step)
            .map_err(|e| PipelineFailure::new(step, e.to_string()))?;
        self.sessions.update(session);
        Ok(())
    }

    fn advance(
        &self,
        session: &mut GenerationSession,
        step: PipelineStep,
    ) -> Result<u8, PipelineFailure> {
        let progress = session
            .advance(step)
            .map_err(|e| PipelineFailure::new(step, e.to_string()))?;
        self.sessions.update(session);
        Ok(progress)
    }

    /// Terminal failure path: release the hold, mark the session FAILED,
    /// publish the ERROR event. Release is idempotent, so a crash between
    /// these writes is recoverable by the reconciliation sweep.
    async fn fail_session(&self, session: &mut GenerationSession, failure: PipelineFailure) {
        tracing::error!(
            session_id = %session.id,
            step = %failure.step,
            detail = %failure.detail,
            "generation failed"
        );

        if let Some(reservation_id) = session.reservation_id {
            if let Err(error) = self.ledger.release(reservation_id).await {
                tracing::error!(session_id = %session.id, %reservation_id, %error, "credit release failed");
            }
        }

        if session
            .fail(format!("{} failed: {}", failure.step, failure.detail))
            .is_ok()
        {
            self.sessions.update(session);
        }

        self.progress
            .publish(ProgressEvent::error(
                session.id,
                format!("Generation failed at {}", failure.step),
                Some(failure.detail),
            ))
            .await;
    }
}

fn step_message(step: PipelineStep) -> &'static str {
    match step {
        PipelineStep::NormalizingInput => "Input normalized",
        PipelineStep::ExtractingDescription => "Description ready",
        PipelineStep::GeneratingCore => "Core attributes generated",
        PipelineStep::GeneratingNarrative => "Narrative generated",
        PipelineStep::CompilingEntity => "Entity compiled",
        PipelineStep::Persisting => "Entity persisted",
        PipelineStep::QueuingAsset => "Asset generation queued",
    }
}
