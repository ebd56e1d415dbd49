//! Step executors: prompt construction, capability invocation, response
//! parsing, and the fallback defaults for optional steps.

use serde::Deserialize;

use personaforge_domain::{
    EntityDraft, EntityKind, GenerationRequest, PipelineStep, StepOutput, StepResult,
};

use crate::infrastructure::capability::CapabilityRouter;
use crate::infrastructure::ports::{CapabilityKind, CapabilityRequest};

/// Normalize the request inputs. Local, cannot fail.
pub(super) fn normalize_input(request: &GenerationRequest) -> StepResult {
    StepResult::ok(
        PipelineStep::NormalizingInput,
        StepOutput::InputNormalized {
            has_reference_image: request.image.is_some(),
        },
    )
}

/// Extract a working description of the requested entity.
///
/// With an image attached this calls the image-analysis capability; the
/// step is OPTIONAL, so a provider failure degrades to a fallback
/// description instead of failing the session. Text-only requests derive
/// the description locally.
pub(super) async fn extract_description(
    router: &CapabilityRouter,
    request: &GenerationRequest,
) -> StepResult {
    let step = PipelineStep::ExtractingDescription;

    let Some(image) = &request.image else {
        // Validation guarantees text is present when there is no image.
        let description = request.text.clone().unwrap_or_default();
        return StepResult::ok(step, StepOutput::DescriptionExtracted { description });
    };

    let capability = router.select(CapabilityKind::ImageAnalysis, request.rating);
    let mut prompt = format!(
        "Describe the subject of this image as the basis for a {} in a role-play setting. \
         Focus on appearance, mood, and distinguishing features. Reply with the description \
         only, no preamble.",
        request.kind
    );
    if let Some(text) = &request.text {
        prompt.push_str(&format!("\n\nAdditional context from the requester: {text}"));
    }

    let capability_request = CapabilityRequest::new(prompt).with_image(image.clone());
    match capability.invoke(capability_request).await {
        Ok(response) if !response.content.trim().is_empty() => StepResult::ok(
            step,
            StepOutput::DescriptionExtracted {
                description: response.content.trim().to_string(),
            },
        ),
        Ok(_) => StepResult::fallback(
            step,
            StepOutput::DescriptionExtracted {
                description: fallback_description(request),
            },
            "image analysis returned an empty description",
        ),
        Err(error) => StepResult::fallback(
            step,
            StepOutput::DescriptionExtracted {
                description: fallback_description(request),
            },
            error.to_string(),
        ),
    }
}

/// Generate the core attributes. REQUIRED: any provider or parse failure
/// is fatal for the session.
pub(super) async fn generate_core(
    router: &CapabilityRouter,
    request: &GenerationRequest,
    draft: &EntityDraft,
) -> StepResult {
    let step = PipelineStep::GeneratingCore;
    let capability = router.select(CapabilityKind::TextCompilation, request.rating);

    let description = draft.description.as_deref().unwrap_or_default();
    let prompt = format!(
        "Based on this description, define the core attributes of a {kind}:\n\n{description}\n\n\
         Respond with strict JSON only, using exactly these keys:\n\
         {{\"name\": string, \"age_group\": string, \"gender\": string, \"archetype\": string}}",
        kind = request.kind,
    );

    let capability_request = CapabilityRequest::new(prompt)
        .with_system_prompt(system_prompt(request.kind))
        .with_temperature(0.8);

    let content = match capability.invoke(capability_request).await {
        Ok(response) => response.content,
        Err(error) => return StepResult::fatal(step, error.to_string()),
    };

    match serde_json::from_str::<CorePayload>(&extract_json(&content)) {
        Ok(payload) if !payload.name.trim().is_empty() => StepResult::ok(
            step,
            StepOutput::CoreAttributes {
                name: payload.name.trim().to_string(),
                age_group: payload.age_group,
                gender: payload.gender,
                archetype: payload.archetype,
            },
        ),
        Ok(_) => StepResult::fatal(step, "core attributes are missing a name"),
        Err(error) => StepResult::fatal(step, format!("unparseable core attributes: {error}")),
    }
}

/// Generate the narrative body. REQUIRED.
pub(super) async fn generate_narrative(
    router: &CapabilityRouter,
    request: &GenerationRequest,
    draft: &EntityDraft,
) -> StepResult {
    let step = PipelineStep::GeneratingNarrative;
    let capability = router.select(CapabilityKind::NarrativeGeneration, request.rating);

    let name = draft.name.as_deref().unwrap_or("the subject");
    let description = draft.description.as_deref().unwrap_or_default();
    let prompt = format!(
        "Write the narrative body for {name}, a {kind} described as:\n\n{description}\n\n\
         Respond with strict JSON only, using exactly these keys:\n\
         {{\"personality\": string, \"objectives\": [string], \"backstory\": string}}",
        kind = request.kind,
    );

    let capability_request = CapabilityRequest::new(prompt)
        .with_system_prompt(system_prompt(request.kind))
        .with_temperature(0.9);

    let content = match capability.invoke(capability_request).await {
        Ok(response) => response.content,
        Err(error) => return StepResult::fatal(step, error.to_string()),
    };

    match serde_json::from_str::<NarrativePayload>(&extract_json(&content)) {
        Ok(payload) if !payload.personality.trim().is_empty() => StepResult::ok(
            step,
            StepOutput::NarrativeBody {
                personality: payload.personality,
                objectives: payload.objectives,
                backstory: payload.backstory,
            },
        ),
        Ok(_) => StepResult::fatal(step, "narrative body is missing a personality"),
        Err(error) => StepResult::fatal(step, format!("unparseable narrative body: {error}")),
    }
}

fn system_prompt(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Character => {
            "You are a character designer for a role-play platform. \
             You always answer with valid JSON and nothing else."
        }
        EntityKind::Story => {
            "You are a narrative designer for a role-play platform. \
             You always answer with valid JSON and nothing else."
        }
    }
}

/// Fallback when image analysis is unavailable: prefer the requester's
/// own text, otherwise a fixed generic description.
fn fallback_description(request: &GenerationRequest) -> String {
    if let Some(text) = &request.text {
        return text.clone();
    }
    match request.kind {
        EntityKind::Character => {
            "A mysterious figure whose appearance is yet to be revealed".to_string()
        }
        EntityKind::Story => "An untold tale waiting for its first scene".to_string(),
    }
}

/// Extract JSON from a response that might have markdown code blocks or
/// extra text around it.
fn extract_json(response: &str) -> String {
    if let Some(start) = response.find("```json") {
        if let Some(end) = response[start + 7..].find("```") {
            return response[start + 7..start + 7 + end].trim().to_string();
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return response[start..=end].to_string();
            }
        }
    }

    response.trim().to_string()
}

#[derive(Deserialize)]
struct CorePayload {
    name: String,
    #[serde(default)]
    age_group: String,
    #[serde(default)]
    gender: String,
    #[serde(default)]
    archetype: String,
}

#[derive(Deserialize)]
struct NarrativePayload {
    personality: String,
    #[serde(default)]
    objectives: Vec<String>,
    #[serde(default)]
    backstory: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use personaforge_domain::{ContentRating, ImageRef, UserId};

    fn image() -> ImageRef {
        ImageRef {
            data: vec![0x89, 0x50, 0x4e, 0x47],
            media_type: "image/png".to_string(),
        }
    }

    #[test]
    fn fallback_prefers_requester_text_over_generic_default() {
        let with_text = GenerationRequest::new(
            UserId::new(),
            EntityKind::Character,
            Some("A mage".to_string()),
            Some(image()),
            ContentRating::General,
        )
        .expect("valid request");
        assert_eq!(fallback_description(&with_text), "A mage");

        let image_only = GenerationRequest::new(
            UserId::new(),
            EntityKind::Character,
            None,
            Some(image()),
            ContentRating::General,
        )
        .expect("valid request");
        assert!(fallback_description(&image_only).contains("mysterious figure"));
    }

    #[test]
    fn extracts_json_from_markdown_block() {
        let response = "Here you go:\n```json\n{\"name\": \"Kael\"}\n```\nHope that helps!";
        assert_eq!(extract_json(response), "{\"name\": \"Kael\"}");
    }

    #[test]
    fn extracts_raw_json_object_with_surrounding_prose() {
        let response = "Sure! {\"name\": \"Kael\", \"age_group\": \"adult\"} as requested.";
        let parsed: CorePayload =
            serde_json::from_str(&extract_json(response)).expect("extracted JSON parses");
        assert_eq!(parsed.name, "Kael");
    }

    #[test]
    fn passes_plain_json_through() {
        let response = "{\"personality\": \"stoic\"}";
        let parsed: NarrativePayload =
            serde_json::from_str(&extract_json(response)).expect("plain JSON parses");
        assert_eq!(parsed.personality, "stoic");
        assert!(parsed.objectives.is_empty());
    }
}
