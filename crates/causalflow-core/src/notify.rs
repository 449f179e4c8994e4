//! # Notification Channel
//!
//! At most one active message: posting an error replaces any success and
//! vice versa. Each posted message gets a fresh [`MessageId`]; the timed
//! auto-clear must name the id it was scheduled for, so an old timer can
//! never clear a newer message.
//!
//! Time itself is the app layer's concern.

use serde::{Deserialize, Serialize};

/// Generation number of a posted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Error,
    Success,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: MessageId,
    pub kind: NotificationKind,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationChannel {
    current: Option<Notification>,
    next_id: u64,
}

impl NotificationChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a message, replacing whatever is active.
    pub fn post(&mut self, kind: NotificationKind, text: impl Into<String>) -> MessageId {
        self.next_id = self.next_id.saturating_add(1);
        let id = MessageId(self.next_id);
        self.current = Some(Notification {
            id,
            kind,
            text: text.into(),
        });
        id
    }

    /// Clear the message if it is still `id`. Returns whether it was cleared.
    pub fn expire(&mut self, id: MessageId) -> bool {
        if self.current.as_ref().is_some_and(|n| n.id == id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Clear whatever is active.
    pub fn dismiss(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Active error text, if the active message is an error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.text_of(NotificationKind::Error)
    }

    /// Active success text, if the active message is a success.
    #[must_use]
    pub fn success(&self) -> Option<&str> {
        self.text_of(NotificationKind::Success)
    }

    fn text_of(&self, kind: NotificationKind) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|n| n.kind == kind)
            .map(|n| n.text.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================
