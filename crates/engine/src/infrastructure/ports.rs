//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is
//! concrete types. Ports exist for:
//! - Generation capabilities (could swap one LLM provider for another)
//! - The credit ledger (could swap in-memory -> database)
//! - Entity persistence (could swap in-memory -> database)
//! - The asset queue (could swap in-memory -> Redis)
//! - Progress delivery (could swap broadcast -> pub/sub)
//! - Clock (for testing)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use personaforge_domain::{
    CompiledEntity, CreditReservation, EntityId, EntityKind, ImageRef, JobId, ProgressEvent,
    ReservationId, SessionId, UserId,
};

// =============================================================================
// Error Types
// =============================================================================

/// Failure of an external generation capability. Timeouts are reported as
/// `RequestFailed`; the orchestrator classifies all variants identically.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Capability request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid capability response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: u32, available: u32 },
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RepoError {
    #[error("Entity already exists: {0}")]
    Duplicate(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EnqueueError {
    #[error("Asset queue unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Capability Port
// =============================================================================

/// An abstract generation function, decoupled from its backing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    ImageAnalysis,
    TextCompilation,
    NarrativeGeneration,
}

/// Request to a capability: a prompt plus optional context.
#[derive(Debug, Clone)]
pub struct CapabilityRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Image attachment for multimodal capabilities.
    pub image: Option<ImageRef>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CapabilityRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            image: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Structured output of a capability call.
#[derive(Debug, Clone)]
pub struct CapabilityResponse {
    pub content: String,
}

/// The only guarantee a capability handle makes: callable with a
/// (prompt, context) pair, returns structured output or a ProviderError.
/// Retry policy, if any, belongs to the capability implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CapabilityPort: Send + Sync {
    async fn invoke(&self, request: CapabilityRequest) -> Result<CapabilityResponse, ProviderError>;
}

// =============================================================================
// Credit Ledger Port
// =============================================================================

/// Atomic reserve/commit/release over per-user credit balances.
///
/// `reserve` is atomic with the balance read: no lost-update race between
/// concurrent requests from the same user. `commit` and `release` are
/// idempotent so the reconciliation sweep can retry them safely.
#[async_trait]
pub trait CreditLedgerPort: Send + Sync {
    async fn reserve(
        &self,
        user_id: UserId,
        session_id: SessionId,
        amount: u32,
    ) -> Result<ReservationId, LedgerError>;

    /// Finalize the debit. No-op on an already-terminal reservation.
    async fn commit(&self, id: ReservationId) -> Result<(), LedgerError>;

    /// Refund the hold in full. No-op on an already-terminal reservation.
    async fn release(&self, id: ReservationId) -> Result<(), LedgerError>;

    /// Currently available balance (held amounts excluded).
    async fn balance(&self, user_id: UserId) -> u32;

    async fn reservation(&self, id: ReservationId) -> Option<CreditReservation>;

    /// Reservations still HELD since before `cutoff`; the external
    /// reconciliation sweep force-releases these.
    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Vec<CreditReservation>;
}

// =============================================================================
// Entity Repository Port
// =============================================================================

/// Persistence for finished entities. `create` is a single atomic write;
/// the orchestrator never persists partial entities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityRepo: Send + Sync {
    async fn create(&self, entity: &CompiledEntity) -> Result<EntityId, RepoError>;
    async fn get(&self, id: EntityId) -> Result<Option<CompiledEntity>, RepoError>;
}

// =============================================================================
// Asset Queue Port
// =============================================================================

/// Payload of a downstream image-generation job.
#[derive(Debug, Clone)]
pub struct AssetJobData {
    pub entity_id: EntityId,
    pub entity_kind: EntityKind,
    /// Prompt for the image backend, derived from the entity.
    pub prompt: String,
    /// Reference material from the original request, if any.
    pub reference_image: Option<ImageRef>,
    pub seed: u32,
}

/// Fire-and-forget hand-off to the image-generation backend. The
/// orchestrator never awaits job completion; enqueue failure is logged,
/// not propagated as session failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetQueuePort: Send + Sync {
    async fn enqueue(&self, data: &AssetJobData) -> Result<JobId, EnqueueError>;
    async fn depth(&self) -> Result<usize, EnqueueError>;
}

// =============================================================================
// Progress Port
// =============================================================================

/// Per-session ordered event stream. Delivery is best-effort: events
/// published with no subscriber are dropped, not buffered.
#[async_trait]
pub trait ProgressPort: Send + Sync {
    /// Open the session's stream. Called at intake, before the session id
    /// is returned, so subscribers never race the first event.
    async fn open(&self, session_id: SessionId);

    async fn publish(&self, event: ProgressEvent);

    /// Close the stream after the terminal event.
    async fn close(&self, session_id: SessionId);
}

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
