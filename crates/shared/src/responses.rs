//! Response DTOs for the REST surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use personaforge_domain::{EntityKind, SessionStatus};

/// Successful `POST /api/generate` response. The session id is returned
/// before any pipeline step executes so the client can subscribe to the
/// progress channel without racing the first event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAccepted {
    pub session_id: Uuid,
    /// Credits reserved for this session.
    pub cost: u32,
}

/// Error classification code carried on 4xx/5xx bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    InsufficientCredits,
    NotFound,
    Internal,
    /// Unknown code for forward compatibility.
    #[serde(other)]
    Unknown,
}

/// Error body for all REST failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// `GET /api/sessions/{id}` response - recovery path for clients that
/// joined the progress channel too late (the channel does not buffer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    pub progress: u8,
    pub entity_kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// `GET /api/credits/{user_id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalanceBody {
    pub user_id: Uuid,
    pub balance: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_use_screaming_snake_case_on_the_wire() {
        let body = ErrorBody::new(ErrorCode::InsufficientCredits, "balance too low");
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["code"], "INSUFFICIENT_CREDITS");
    }

    #[test]
    fn unknown_error_codes_deserialize_without_failing() {
        let code: ErrorCode =
            serde_json::from_value(serde_json::json!("SOME_FUTURE_CODE")).expect("deserialize");
        assert_eq!(code, ErrorCode::Unknown);
    }
}
