//! PersonaForge Shared - Wire protocol between the engine and its clients.
//!
//! This crate contains only data types and serialization:
//! - REST request/response DTOs
//! - The progress message pushed over the per-session channel
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - serde, uuid, and the domain types
//! 2. **No business logic** - pure data types and conversions
//! 3. **Raw `uuid::Uuid` in DTOs** - domain ids stay inside the engine

pub mod messages;
pub mod requests;
pub mod responses;

pub use messages::{progress_topic, ProgressMessage};
pub use requests::GenerateRequestBody;
pub use responses::{CreditBalanceBody, ErrorBody, ErrorCode, GenerateAccepted, SessionSnapshot};
