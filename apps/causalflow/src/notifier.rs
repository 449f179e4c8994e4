//! # Timed Notifications
//!
//! Wraps the core [`NotificationChannel`] with a tokio timer per message. The
//! timer expires only the message it was started for, and posting a new
//! message aborts the previous timer.

use causalflow_core::{MessageId, Notification, NotificationChannel, NotificationKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

#[derive(Debug, Default)]
struct Slot {
    channel: NotificationChannel,
    timer: Option<AbortHandle>,
}

/// Shared handle to the single notification slot.
#[derive(Debug, Clone)]
pub struct Notifier {
    slot: Arc<Mutex<Slot>>,
    ttl: Duration,
}

impl Notifier {
    /// Must be used inside a tokio runtime; each post spawns its timer.
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn error(&self, text: impl Into<String>) -> MessageId {
        self.post(NotificationKind::Error, text).await
    }

    pub async fn success(&self, text: impl Into<String>) -> MessageId {
        self.post(NotificationKind::Success, text).await
    }

    /// Replace the active message and schedule its expiry.
    pub async fn post(&self, kind: NotificationKind, text: impl Into<String>) -> MessageId {
        let mut slot = self.slot.lock().await;
        let id = slot.channel.post(kind, text);
        if let Some(stale) = slot.timer.take() {
            stale.abort();
        }

        let shared = Arc::clone(&self.slot);
        let ttl = self.ttl;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut slot = shared.lock().await;
            if slot.channel.expire(id) {
                slot.timer = None;
            }
        });
        slot.timer = Some(timer.abort_handle());
        id
    }

    /// Clear the active message now.
    pub async fn dismiss(&self) {
        let mut slot = self.slot.lock().await;
        slot.channel.dismiss();
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
    }

    pub async fn current(&self) -> Option<Notification> {
        self.slot.lock().await.channel.current().cloned()
    }

    pub async fn error_text(&self) -> Option<String> {
        self.slot.lock().await.channel.error().map(str::to_string)
    }

    pub async fn success_text(&self) -> Option<String> {
        self.slot.lock().await.channel.success().map(str::to_string)
    }
}
