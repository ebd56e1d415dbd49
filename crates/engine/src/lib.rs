//! PersonaForge Engine library.
//!
//! Server-side generation orchestration:
//!
//! - `infrastructure/` - port traits and their adapters (capability
//!   providers, credit ledger, entity store, asset queue, progress)
//! - `use_cases/` - intake and the pipeline orchestrator
//! - `api/` - HTTP and WebSocket entry points
//! - `app` - application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
