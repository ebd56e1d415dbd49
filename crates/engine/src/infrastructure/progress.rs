//! Broadcast-backed progress channel.
//!
//! One tokio broadcast channel per live session. Events published while no
//! subscriber is attached are dropped (broadcast send to zero receivers
//! fails, which is exactly the contract): late joiners recover through the
//! session snapshot endpoint instead of a replay buffer.

use dashmap::DashMap;
use tokio::sync::broadcast;

use async_trait::async_trait;
use personaforge_domain::{ProgressEvent, SessionId};

use super::ports::ProgressPort;

/// Buffered events per subscriber before lag kicks in.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
pub struct ProgressChannel {
    channels: DashMap<SessionId, broadcast::Sender<ProgressEvent>>,
}

impl ProgressChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a session's stream. Returns None once the stream is
    /// closed (terminal event already delivered) or never existed.
    pub fn join(&self, session_id: SessionId) -> Option<broadcast::Receiver<ProgressEvent>> {
        self.channels.get(&session_id).map(|tx| tx.subscribe())
    }

    pub fn live_sessions(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl ProgressPort for ProgressChannel {
    async fn open(&self, session_id: SessionId) {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        self.channels.insert(session_id, tx);
    }

    async fn publish(&self, event: ProgressEvent) {
        if let Some(tx) = self.channels.get(&event.session_id) {
            // Err means no subscriber is attached; the event is dropped.
            let _ = tx.send(event);
        }
    }

    async fn close(&self, session_id: SessionId) {
        self.channels.remove(&session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use personaforge_domain::PipelineStep;

    fn step_event(session_id: SessionId, step: PipelineStep, progress: u8) -> ProgressEvent {
        ProgressEvent::step_done(session_id, step, progress, "ok", None)
    }

    #[tokio::test]
    async fn subscriber_receives_events_in_order() {
        let channel = ProgressChannel::new();
        let session_id = SessionId::new();
        channel.open(session_id).await;

        let mut rx = channel.join(session_id).expect("stream open");
        channel
            .publish(step_event(session_id, PipelineStep::NormalizingInput, 10))
            .await;
        channel
            .publish(step_event(session_id, PipelineStep::GeneratingCore, 55))
            .await;

        assert_eq!(rx.recv().await.expect("first").step, "NORMALIZING_INPUT");
        assert_eq!(rx.recv().await.expect("second").step, "GENERATING_CORE");
    }

    #[tokio::test]
    async fn publish_without_subscriber_drops_event() {
        let channel = ProgressChannel::new();
        let session_id = SessionId::new();
        channel.open(session_id).await;

        channel
            .publish(step_event(session_id, PipelineStep::NormalizingInput, 10))
            .await;

        // A subscriber joining afterwards sees nothing buffered.
        let mut rx = channel.join(session_id).expect("stream open");
        channel.close(session_id).await;
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn join_after_close_returns_none() {
        let channel = ProgressChannel::new();
        let session_id = SessionId::new();
        channel.open(session_id).await;
        channel.close(session_id).await;
        assert!(channel.join(session_id).is_none());
    }
}
