//! Domain entities for the generation pipeline.

mod draft;
mod request;
mod reservation;
mod session;

pub use draft::{CompiledEntity, EntityDraft, StepOutput};
pub use request::{
    ContentRating, EntityKind, GenerationRequest, ImageRef, Modality, MAX_PROMPT_CHARS,
};
pub use reservation::{CreditReservation, ReservationState};
pub use session::{GenerationSession, SessionStatus};
