//! The entity draft accumulator and the typed per-step outputs.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::EntityId;
use crate::pipeline::PipelineStep;

use super::request::EntityKind;

/// Data produced by a single pipeline step, tagged by the step that can
/// produce it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutput {
    InputNormalized {
        has_reference_image: bool,
    },
    DescriptionExtracted {
        description: String,
    },
    CoreAttributes {
        name: String,
        age_group: String,
        gender: String,
        archetype: String,
    },
    NarrativeBody {
        personality: String,
        objectives: Vec<String>,
        backstory: String,
    },
    EntityCompiled {
        summary: String,
    },
}

/// Accumulator for step outputs. Owned exclusively by the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityDraft {
    pub kind: Option<EntityKind>,
    pub has_reference_image: bool,
    pub description: Option<String>,
    pub name: Option<String>,
    pub age_group: Option<String>,
    pub gender: Option<String>,
    pub archetype: Option<String>,
    pub personality: Option<String>,
    pub objectives: Vec<String>,
    pub backstory: Option<String>,
    pub summary: Option<String>,
    /// Steps whose output came from fallback defaults.
    pub degraded_steps: Vec<PipelineStep>,
}

impl EntityDraft {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Merge one step's output into the accumulator.
    pub fn merge(&mut self, output: &StepOutput) {
        match output {
            StepOutput::InputNormalized {
                has_reference_image,
            } => {
                self.has_reference_image = *has_reference_image;
            }
            StepOutput::DescriptionExtracted { description } => {
                self.description = Some(description.clone());
            }
            StepOutput::CoreAttributes {
                name,
                age_group,
                gender,
                archetype,
            } => {
                self.name = Some(name.clone());
                self.age_group = Some(age_group.clone());
                self.gender = Some(gender.clone());
                self.archetype = Some(archetype.clone());
            }
            StepOutput::NarrativeBody {
                personality,
                objectives,
                backstory,
            } => {
                self.personality = Some(personality.clone());
                self.objectives = objectives.clone();
                self.backstory = Some(backstory.clone());
            }
            StepOutput::EntityCompiled { summary } => {
                self.summary = Some(summary.clone());
            }
        }
    }

    /// Record that a step degraded to fallback output.
    pub fn mark_degraded(&mut self, step: PipelineStep) {
        if !self.degraded_steps.contains(&step) {
            self.degraded_steps.push(step);
        }
    }

    /// Compile the accumulated fields into a complete entity.
    ///
    /// Fails when a required field is still missing, which means a REQUIRED
    /// step did not run - the orchestrator treats that as fatal.
    pub fn compile(&self) -> Result<CompiledEntity, DomainError> {
        let kind = self
            .kind
            .ok_or_else(|| DomainError::validation("draft has no entity kind"))?;
        let name = self
            .name
            .clone()
            .ok_or_else(|| DomainError::validation("draft has no name"))?;
        let description = self
            .description
            .clone()
            .ok_or_else(|| DomainError::validation("draft has no description"))?;
        let personality = self
            .personality
            .clone()
            .ok_or_else(|| DomainError::validation("draft has no personality"))?;

        Ok(CompiledEntity {
            id: EntityId::new(),
            kind,
            name,
            description,
            age_group: self.age_group.clone().unwrap_or_default(),
            gender: self.gender.clone().unwrap_or_default(),
            archetype: self.archetype.clone().unwrap_or_default(),
            personality,
            objectives: self.objectives.clone(),
            backstory: self.backstory.clone().unwrap_or_default(),
            degraded: !self.degraded_steps.is_empty(),
        })
    }
}

/// A fully compiled entity, ready for atomic persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub description: String,
    pub age_group: String,
    pub gender: String,
    pub archetype: String,
    pub personality: String,
    pub objectives: Vec<String>,
    pub backstory: String,
    /// True when any step's output came from fallback defaults.
    pub degraded: bool,
}

impl CompiledEntity {
    /// One-line summary carried on the final progress event.
    pub fn summary(&self) -> String {
        format!("{} \"{}\": {}", self.kind, self.name, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_draft() -> EntityDraft {
        let mut draft = EntityDraft::new(EntityKind::Character);
        draft.merge(&StepOutput::DescriptionExtracted {
            description: "A grizzled veteran".to_string(),
        });
        draft.merge(&StepOutput::CoreAttributes {
            name: "Kael".to_string(),
            age_group: "adult".to_string(),
            gender: "male".to_string(),
            archetype: "warrior".to_string(),
        });
        draft.merge(&StepOutput::NarrativeBody {
            personality: "Stoic, loyal".to_string(),
            objectives: vec!["Protect the caravan".to_string()],
            backstory: "Fought in the border wars".to_string(),
        });
        draft
    }

    #[test]
    fn merge_accumulates_fields_across_steps() {
        let draft = full_draft();
        assert_eq!(draft.name.as_deref(), Some("Kael"));
        assert_eq!(draft.objectives.len(), 1);
        assert_eq!(draft.description.as_deref(), Some("A grizzled veteran"));
    }

    #[test]
    fn compile_succeeds_with_required_fields() {
        let entity = full_draft().compile().expect("complete draft compiles");
        assert_eq!(entity.name, "Kael");
        assert!(!entity.degraded);
        assert!(entity.summary().contains("Kael"));
    }

    #[test]
    fn compile_fails_without_narrative() {
        let mut draft = EntityDraft::new(EntityKind::Character);
        draft.merge(&StepOutput::DescriptionExtracted {
            description: "desc".to_string(),
        });
        draft.merge(&StepOutput::CoreAttributes {
            name: "N".to_string(),
            age_group: "adult".to_string(),
            gender: "female".to_string(),
            archetype: "mage".to_string(),
        });
        assert!(draft.compile().is_err());
    }

    #[test]
    fn degraded_steps_flag_compiled_entity() {
        let mut draft = full_draft();
        draft.mark_degraded(PipelineStep::ExtractingDescription);
        draft.mark_degraded(PipelineStep::ExtractingDescription);
        assert_eq!(draft.degraded_steps.len(), 1);
        let entity = draft.compile().expect("draft compiles");
        assert!(entity.degraded);
    }
}
