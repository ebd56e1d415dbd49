//! Credit cost of a generation request.
//!
//! Centralized as a pure function so pricing is testable in isolation from
//! the orchestrator. Cost is a function of the *requested* modality: a
//! session that degrades an optional image step to fallback output is still
//! charged the image surcharge (documented product behavior).

use crate::entities::Modality;

/// Flat cost every generation pays, regardless of modality.
pub const BASE_COST: u32 = 50;

/// Surcharge for supplying text input.
pub const TEXT_SURCHARGE: u32 = 0;

/// Surcharge for supplying an image input.
pub const IMAGE_SURCHARGE: u32 = 25;

/// Credits required for a request with the given modality.
pub fn cost(modality: Modality) -> u32 {
    let mut total = BASE_COST;
    if modality.text {
        total += TEXT_SURCHARGE;
    }
    if modality.image {
        total += IMAGE_SURCHARGE;
    }
    total
}
