use serde_json::{json, Value};
use uuid::Uuid;
use vidora_core::models::{Classification, ResourceStatus};

/// A lifecycle notification emitted by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started {
        resource_id: Uuid,
        owner_id: Uuid,
    },
    Progress {
        resource_id: Uuid,
        owner_id: Uuid,
        progress: i32,
    },
    Completed {
        resource_id: Uuid,
        owner_id: Uuid,
        classification: Classification,
    },
}

impl ProgressEvent {
    /// Wire name of the event (`started`, `progress`, `completed`).
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Started { .. } => "started",
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::Completed { .. } => "completed",
        }
    }

    pub fn resource_id(&self) -> Uuid {
        match self {
            ProgressEvent::Started { resource_id, .. }
            | ProgressEvent::Progress { resource_id, .. }
            | ProgressEvent::Completed { resource_id, .. } => *resource_id,
        }
    }

    pub fn owner_id(&self) -> Uuid {
        match self {
            ProgressEvent::Started { owner_id, .. }
            | ProgressEvent::Progress { owner_id, .. }
            | ProgressEvent::Completed { owner_id, .. } => *owner_id,
        }
    }

    /// JSON body sent to subscribers.
    pub fn payload(&self) -> Value {
        match self {
            ProgressEvent::Started { resource_id, .. } => json!({
                "videoId": resource_id,
                "status": ResourceStatus::Processing,
                "progress": 0,
            }),
            ProgressEvent::Progress {
                resource_id,
                progress,
                ..
            } => json!({
                "videoId": resource_id,
                "status": ResourceStatus::Processing,
                "progress": progress,
            }),
            ProgressEvent::Completed {
                resource_id,
                classification,
                ..
            } => json!({
                "videoId": resource_id,
                "status": ResourceStatus::Complete,
                "progress": 100,
                "classification": classification,
            }),
        }
    }
}

/// Receives tracker notifications. Delivery is fire-and-forget: `publish`
/// must not block and its outcome is never observed by the tracker.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: ProgressEvent);
}

impl<F> NotificationSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn publish(&self, event: ProgressEvent) {
        self(event)
    }
}
