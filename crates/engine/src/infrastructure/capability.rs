//! Capability routing.
//!
//! The orchestrator asks for an abstract capability; the router picks a
//! concrete provider handle from the request's content rating. Sensitive
//! content routes to the unrestricted provider set, everything else to the
//! standard one. Pipeline steps never know which provider they hit.

use std::sync::Arc;

use personaforge_domain::ContentRating;

use super::ports::{CapabilityKind, CapabilityPort};

/// Provider handles for one content tier.
#[derive(Clone)]
pub struct ProviderSet {
    /// Multimodal provider for image analysis.
    pub vision: Arc<dyn CapabilityPort>,
    /// Text provider for attribute and narrative generation.
    pub text: Arc<dyn CapabilityPort>,
}

impl ProviderSet {
    /// Both capabilities served by the same provider.
    pub fn uniform(provider: Arc<dyn CapabilityPort>) -> Self {
        Self {
            vision: provider.clone(),
            text: provider,
        }
    }
}

pub struct CapabilityRouter {
    standard: ProviderSet,
    unrestricted: ProviderSet,
}

impl CapabilityRouter {
    pub fn new(standard: ProviderSet, unrestricted: ProviderSet) -> Self {
        Self {
            standard,
            unrestricted,
        }
    }

    /// A deployment with a single provider tier.
    pub fn single_tier(set: ProviderSet) -> Self {
        Self {
            standard: set.clone(),
            unrestricted: set,
        }
    }

    pub fn select(&self, kind: CapabilityKind, rating: ContentRating) -> Arc<dyn CapabilityPort> {
        let set = match rating {
            ContentRating::General => &self.standard,
            ContentRating::Mature => &self.unrestricted,
        };
        match kind {
            CapabilityKind::ImageAnalysis => set.vision.clone(),
            CapabilityKind::TextCompilation | CapabilityKind::NarrativeGeneration => {
                set.text.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{CapabilityRequest, CapabilityResponse, ProviderError};
    use async_trait::async_trait;

    struct Marker(&'static str);

    #[async_trait]
    impl CapabilityPort for Marker {
        async fn invoke(
            &self,
            _request: CapabilityRequest,
        ) -> Result<CapabilityResponse, ProviderError> {
            Ok(CapabilityResponse {
                content: self.0.to_string(),
            })
        }
    }

    fn set(vision: &'static str, text: &'static str) -> ProviderSet {
        ProviderSet {
            vision: Arc::new(Marker(vision)),
            text: Arc::new(Marker(text)),
        }
    }

    async fn label(handle: Arc<dyn CapabilityPort>) -> String {
        handle
            .invoke(CapabilityRequest::new("probe"))
            .await
            .expect("marker provider")
            .content
    }

    #[tokio::test]
    async fn routes_by_rating_and_kind() {
        let router = CapabilityRouter::new(
            set("std-vision", "std-text"),
            set("unr-vision", "unr-text"),
        );

        let general_vision = router.select(CapabilityKind::ImageAnalysis, ContentRating::General);
        assert_eq!(label(general_vision).await, "std-vision");

        let mature_narrative =
            router.select(CapabilityKind::NarrativeGeneration, ContentRating::Mature);
        assert_eq!(label(mature_narrative).await, "unr-text");

        let general_core = router.select(CapabilityKind::TextCompilation, ContentRating::General);
        assert_eq!(label(general_core).await, "std-text");
    }
}
