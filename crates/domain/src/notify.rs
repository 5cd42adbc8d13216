//! Fire-and-forget notification delivery.
//!
//! Delivery failures are logged and swallowed; they never roll back the
//! state transition that produced the notification.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use common::{UserId, WaybillId};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    WaybillCreated,
    StatusUpdate,
}

/// A message addressed to one user about one waybill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub message: String,
    pub waybill_id: WaybillId,
    pub kind: NotificationKind,
}

/// Error from a notification sink.
#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Destination for outbound notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// In-memory notification sink for testing.
#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    delivered: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotificationSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all notifications delivered so far.
    pub async fn delivered(&self) -> Vec<Notification> {
        self.delivered.read().await.clone()
    }

    /// Returns the notifications addressed to one user.
    pub async fn delivered_to(&self, recipient: UserId) -> Vec<Notification> {
        self.delivered
            .read()
            .await
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        self.delivered.write().await.push(notification);
        Ok(())
    }
}
