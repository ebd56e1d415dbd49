//! In-memory entity repository.

use async_trait::async_trait;
use dashmap::DashMap;

use personaforge_domain::{CompiledEntity, EntityId};

use super::ports::{EntityRepo, RepoError};

/// DashMap-backed store; insert is a single atomic write, so a reader can
/// never observe a partially persisted entity.
#[derive(Default)]
pub struct InMemoryEntityRepo {
    entities: DashMap<EntityId, CompiledEntity>,
}

impl InMemoryEntityRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[async_trait]
impl EntityRepo for InMemoryEntityRepo {
    async fn create(&self, entity: &CompiledEntity) -> Result<EntityId, RepoError> {
        let id = entity.id;
        if self.entities.insert(id, entity.clone()).is_some() {
            return Err(RepoError::Duplicate(id.to_string()));
        }
        tracing::debug!(entity_id = %id, kind = ?entity.kind, "entity persisted");
        Ok(id)
    }

    async fn get(&self, id: EntityId) -> Result<Option<CompiledEntity>, RepoError> {
        Ok(self.entities.get(&id).map(|e| e.clone()))
    }
}
