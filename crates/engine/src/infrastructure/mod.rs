//! Infrastructure: port traits and their adapters.

pub mod capability;
pub mod clock;
pub mod ledger;
pub mod llm;
pub mod ports;
pub mod progress;
pub mod queue;
pub mod repository;
