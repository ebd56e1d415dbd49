//! The immutable intake request.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::UserId;

/// Maximum accepted prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 2000;

/// What kind of entity the requester wants generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Story,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Character => write!(f, "character"),
            Self::Story => write!(f, "story"),
        }
    }
}

/// Content-sensitivity classification of the requested generation.
///
/// Routes transparently to different backing providers; step logic never
/// branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    #[default]
    General,
    Mature,
}

/// Binary reference to an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub data: Vec<u8>,
    /// MIME type (e.g., "image/png")
    pub media_type: String,
}

/// Which input types a request supplies. Determines cost and which
/// optional steps are even attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modality {
    pub text: bool,
    pub image: bool,
}

/// A validated generation request. Accepted at intake, never mutated.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub requester_id: UserId,
    pub kind: EntityKind,
    pub text: Option<String>,
    pub image: Option<ImageRef>,
    pub rating: ContentRating,
}

impl GenerationRequest {
    /// Validate and accept a request.
    ///
    /// Rejects requests with neither text nor image, empty text, or text
    /// beyond [`MAX_PROMPT_CHARS`].
    pub fn new(
        requester_id: UserId,
        kind: EntityKind,
        text: Option<String>,
        image: Option<ImageRef>,
        rating: ContentRating,
    ) -> Result<Self, DomainError> {
        let text = match text {
            Some(t) if t.trim().is_empty() => None,
            other => other,
        };

        if text.is_none() && image.is_none() {
            return Err(DomainError::validation(
                "request must supply text, an image, or both",
            ));
        }

        if let Some(ref t) = text {
            let chars = t.chars().count();
            if chars > MAX_PROMPT_CHARS {
                return Err(DomainError::validation(format!(
                    "text is {} characters, maximum is {}",
                    chars, MAX_PROMPT_CHARS
                )));
            }
        }

        if let Some(ref img) = image {
            if img.data.is_empty() {
                return Err(DomainError::validation("image payload is empty"));
            }
        }

        Ok(Self {
            requester_id,
            kind,
            text,
            image,
            rating,
        })
    }

    /// The modality flags of this request.
    pub fn modality(&self) -> Modality {
        Modality {
            text: self.text.is_some(),
            image: self.image.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageRef {
        ImageRef {
            data: vec![0x89, 0x50, 0x4e, 0x47],
            media_type: "image/png".to_string(),
        }
    }

    #[test]
    fn accepts_text_only() {
        let req = GenerationRequest::new(
            UserId::new(),
            EntityKind::Character,
            Some("A warrior".to_string()),
            None,
            ContentRating::General,
        )
        .expect("text-only request should validate");
        assert!(req.modality().text);
        assert!(!req.modality().image);
    }

    #[test]
    fn accepts_image_only() {
        let req = GenerationRequest::new(
            UserId::new(),
            EntityKind::Character,
            None,
            Some(image()),
            ContentRating::General,
        )
        .expect("image-only request should validate");
        assert!(!req.modality().text);
        assert!(req.modality().image);
    }

    #[test]
    fn rejects_empty_request() {
        let err = GenerationRequest::new(
            UserId::new(),
            EntityKind::Story,
            None,
            None,
            ContentRating::General,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn whitespace_only_text_counts_as_absent() {
        let err = GenerationRequest::new(
            UserId::new(),
            EntityKind::Character,
            Some("   \n".to_string()),
            None,
            ContentRating::General,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_text_over_limit() {
        let long = "x".repeat(MAX_PROMPT_CHARS + 1);
        let err = GenerationRequest::new(
            UserId::new(),
            EntityKind::Character,
            Some(long),
            None,
            ContentRating::General,
        )
        .unwrap_err();
        assert!(err.to_string().contains("maximum"));
    }

    #[test]
    fn accepts_text_at_exact_limit() {
        let exact = "y".repeat(MAX_PROMPT_CHARS);
        assert!(GenerationRequest::new(
            UserId::new(),
            EntityKind::Character,
            Some(exact),
            None,
            ContentRating::General,
        )
        .is_ok());
    }
}
