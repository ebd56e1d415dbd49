//! Messages pushed over the per-session progress channel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use personaforge_domain::{ProgressData, ProgressEvent};

/// Wire shape of one progress event:
/// `{ step, progress, message, data? }`.
///
/// `data` is tagged by the producing step (see
/// [`personaforge_domain::ProgressData`]); clients can switch on
/// `data.kind` without guessing at payload shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMessage {
    pub session_id: Uuid,
    pub step: String,
    /// 0-100, non-decreasing per session.
    pub progress: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ProgressData>,
}

impl From<ProgressEvent> for ProgressMessage {
    fn from(event: ProgressEvent) -> Self {
        Self {
            session_id: event.session_id.to_uuid(),
            step: event.step,
            progress: event.progress,
            message: event.message,
            data: event.data,
        }
    }
}

/// Conventional channel topic for a session's progress stream. Any
/// transport (WebSocket room, pub/sub topic, SSE stream) may implement it
/// as long as per-session ordering holds.
pub fn progress_topic(requester_id: Uuid, session_id: Uuid) -> String {
    format!("entity-generation:{requester_id}:{session_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use personaforge_domain::SessionId;

    #[test]
    fn converts_domain_event_to_wire_message() {
        let session_id = SessionId::new();
        let event = ProgressEvent::error(session_id, "boom", None);
        let msg = ProgressMessage::from(event);
        assert_eq!(msg.session_id, session_id.to_uuid());
        assert_eq!(msg.step, "ERROR");
        assert_eq!(msg.progress, 0);
    }

    #[test]
    fn topic_follows_naming_convention() {
        let requester = Uuid::new_v4();
        let session = Uuid::new_v4();
        assert_eq!(
            progress_topic(requester, session),
            format!("entity-generation:{requester}:{session}")
        );
    }
}
