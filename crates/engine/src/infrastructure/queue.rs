//! In-memory asset queue.
//!
//! Vec-based storage behind an RwLock, FIFO within pending items. The
//! engine only enqueues; the dequeue/complete/fail half of the API exists
//! for the image-generation worker that drains this queue out of process
//! in the database-backed deployment.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use personaforge_domain::JobId;

use super::ports::{AssetJobData, AssetQueuePort, EnqueueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Clone)]
pub struct AssetJob {
    pub id: JobId,
    pub data: AssetJobData,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

#[derive(Default)]
pub struct InMemoryAssetQueue {
    items: Arc<RwLock<Vec<AssetJob>>>,
}

impl InMemoryAssetQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the oldest pending job for processing.
    pub async fn dequeue(&self) -> Option<AssetJob> {
        let mut items = self.items.write().await;
        let idx = items.iter().position(|i| i.status == JobStatus::Pending)?;
        let job = &mut items[idx];
        job.status = JobStatus::Processing;
        job.updated_at = Utc::now();
        Some(job.clone())
    }

    pub async fn complete(&self, id: JobId) {
        let mut items = self.items.write().await;
        if let Some(job) = items.iter_mut().find(|i| i.id == id) {
            job.status = JobStatus::Completed;
            job.updated_at = Utc::now();
        }
    }

    pub async fn fail(&self, id: JobId, error: &str) {
        let mut items = self.items.write().await;
        if let Some(job) = items.iter_mut().find(|i| i.id == id) {
            job.status = JobStatus::Failed;
            job.error_message = Some(error.to_string());
            job.updated_at = Utc::now();
        }
    }

    pub async fn list_by_status(&self, status: JobStatus) -> Vec<AssetJob> {
        let items = self.items.read().await;
        items.iter().filter(|i| i.status == status).cloned().collect()
    }
}

#[async_trait]
impl AssetQueuePort for InMemoryAssetQueue {
    async fn enqueue(&self, data: &AssetJobData) -> Result<JobId, EnqueueError> {
        let mut items = self.items.write().await;
        let now = Utc::now();
        let job = AssetJob {
            id: JobId::new(),
            data: data.clone(),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            error_message: None,
        };
        let id = job.id;
        items.push(job);
        tracing::debug!(job_id = %id, entity_id = %data.entity_id, "asset job queued");
        Ok(id)
    }

    async fn depth(&self) -> Result<usize, EnqueueError> {
        let items = self.items.read().await;
        Ok(items.iter().filter(|i| i.status == JobStatus::Pending).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use personaforge_domain::{EntityId, EntityKind};

    fn job_data() -> AssetJobData {
        AssetJobData {
            entity_id: EntityId::new(),
            entity_kind: EntityKind::Character,
            prompt: "portrait of a warrior".to_string(),
            reference_image: None,
            seed: 42,
        }
    }

    #[tokio::test]
    async fn enqueue_increases_depth() {
        let queue = InMemoryAssetQueue::new();
        assert_eq!(queue.depth().await.expect("depth"), 0);
        queue.enqueue(&job_data()).await.expect("enqueue");
        queue.enqueue(&job_data()).await.expect("enqueue");
        assert_eq!(queue.depth().await.expect("depth"), 2);
    }

    #[tokio::test]
    async fn dequeue_claims_oldest_pending() {
        let queue = InMemoryAssetQueue::new();
        let first = queue.enqueue(&job_data()).await.expect("enqueue");
        queue.enqueue(&job_data()).await.expect("enqueue");

        let claimed = queue.dequeue().await.expect("job available");
        assert_eq!(claimed.id, first);
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(queue.depth().await.expect("depth"), 1);
    }

    #[tokio::test]
    async fn failed_jobs_keep_their_error() {
        let queue = InMemoryAssetQueue::new();
        let id = queue.enqueue(&job_data()).await.expect("enqueue");
        queue.dequeue().await.expect("job available");
        queue.fail(id, "backend unreachable").await;

        let failed = queue.list_by_status(JobStatus::Failed).await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error_message.as_deref(), Some("backend unreachable"));
    }
}
