//! Request DTOs for the REST intake surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use personaforge_domain::{ContentRating, EntityKind};

/// Body of `POST /api/generate`.
///
/// At least one of `text` / `image_base64` must be present; the engine
/// rejects the request synchronously otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequestBody {
    pub requester_id: Uuid,
    pub entity_kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64-encoded image payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    /// MIME type of the image payload (defaults to image/png).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_media_type: Option<String>,
    #[serde(default)]
    pub content_rating: ContentRating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_text_request() {
        let json = serde_json::json!({
            "requesterId": Uuid::new_v4(),
            "entityKind": "character",
            "text": "A warrior",
        });
        let body: GenerateRequestBody =
            serde_json::from_value(json).expect("minimal body deserializes");
        assert_eq!(body.entity_kind, EntityKind::Character);
        assert_eq!(body.content_rating, ContentRating::General);
        assert!(body.image_base64.is_none());
    }
}
