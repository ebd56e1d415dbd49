//! PersonaForge Domain - Core domain types, value objects, and invariants.
//!
//! Pure types only: no I/O, no async, no clock access. Anything that needs
//! the outside world lives behind a port in the engine crate.

pub mod cost;
pub mod entities;
pub mod error;
pub mod ids;
pub mod pipeline;
pub mod progress;

pub use cost::{cost, BASE_COST, IMAGE_SURCHARGE, TEXT_SURCHARGE};
pub use entities::{
    CompiledEntity, ContentRating, CreditReservation, EntityDraft, EntityKind, GenerationRequest,
    GenerationSession, ImageRef, Modality, ReservationState, SessionStatus, StepOutput,
    MAX_PROMPT_CHARS,
};
pub use error::DomainError;
pub use ids::{EntityId, JobId, ReservationId, SessionId, UserId};
pub use pipeline::{PipelineStep, StepOutcome, StepResult, COMPLETED_LABEL, ERROR_LABEL};
pub use progress::{ProgressData, ProgressEvent};
