//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use std::sync::Arc;
use uuid::Uuid;

use personaforge_domain::{
    DomainError, EntityKind, GenerationRequest, ImageRef, SessionId, UserId,
};
use personaforge_shared::{
    CreditBalanceBody, ErrorBody, ErrorCode, GenerateAccepted, GenerateRequestBody,
    SessionSnapshot,
};

use crate::app::App;
use crate::use_cases::generation::IntakeError;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/generate", post(generate))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/credits/{user_id}", get(get_credits))
}

async fn health() -> &'static str {
    "OK"
}

/// Intake endpoint. Replies 202 with the session id and reserved cost
/// before any pipeline step runs; all per-step results arrive on the
/// progress channel.
async fn generate(
    State(app): State<Arc<App>>,
    Json(body): Json<GenerateRequestBody>,
) -> Result<(StatusCode, Json<GenerateAccepted>), ApiError> {
    let request = parse_request(body)?;
    let accepted = app
        .use_cases
        .start_generation
        .execute(request)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateAccepted {
            session_id: accepted.session_id.to_uuid(),
            cost: accepted.cost,
        }),
    ))
}

/// Session snapshot - the recovery path for progress subscribers that
/// joined too late (the channel does not buffer).
async fn get_session(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = app
        .sessions
        .get(SessionId::from_uuid(id))
        .ok_or(ApiError::NotFound)?;
    Ok(Json(SessionSnapshot {
        session_id: session.id.to_uuid(),
        status: session.status,
        current_step: session.current_step.map(|s| s.label().to_string()),
        progress: session.progress_percent,
        entity_kind: session.draft.kind.unwrap_or(EntityKind::Character),
        entity_id: session.entity_id.map(|e| e.to_uuid()),
        failure_reason: session.failure_reason.clone(),
    }))
}

async fn get_credits(
    State(app): State<Arc<App>>,
    Path(user_id): Path<Uuid>,
) -> Json<CreditBalanceBody> {
    let balance = app.ledger.balance(UserId::from_uuid(user_id)).await;
    Json(CreditBalanceBody { user_id, balance })
}

fn parse_request(body: GenerateRequestBody) -> Result<GenerationRequest, ApiError> {
    let image = body
        .image_base64
        .map(|encoded| {
            let data = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| ApiError::Validation(format!("invalid base64 image: {e}")))?;
            Ok::<_, ApiError>(ImageRef {
                data,
                media_type: body
                    .image_media_type
                    .clone()
                    .unwrap_or_else(|| "image/png".to_string()),
            })
        })
        .transpose()?;

    GenerationRequest::new(
        UserId::from_uuid(body.requester_id),
        body.entity_kind,
        body.text,
        image,
        body.content_rating,
    )
    .map_err(ApiError::from)
}

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    InsufficientCredits { required: u32, available: u32 },
    NotFound,
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::InsufficientCredits {
                required,
                available,
            } => ApiError::InsufficientCredits {
                required,
                available,
            },
            IntakeError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new(ErrorCode::ValidationFailed, msg),
            ),
            ApiError::InsufficientCredits {
                required,
                available,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                ErrorBody::new(
                    ErrorCode::InsufficientCredits,
                    format!("insufficient credits: need {required}, have {available}"),
                ),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(ErrorCode::NotFound, "not found"),
            ),
            ApiError::Internal(msg) => {
                tracing::error!(%msg, "internal API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new(ErrorCode::Internal, "internal error"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
