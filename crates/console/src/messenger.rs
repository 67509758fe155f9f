//! Messaging channel boundary
//!
//! The console never talks to a chat platform directly; it goes through
//! this trait. Tests use `MockMessenger`, a real deployment plugs in a
//! client for its platform.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;
use taskbot_core::{InlineButton, UserId};
use thiserror::Error;

/// Channel-level send failure. Always non-fatal to the caller's state.
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("Send to {to} failed: {reason}")]
    SendFailed { to: UserId, reason: String },
}

/// One outbound message: text, optional image, selectable buttons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: UserId,
    pub text: String,
    pub image: Option<String>,
    pub buttons: Vec<InlineButton>,
}

impl OutboundMessage {
    pub fn text(to: UserId, text: impl Into<String>) -> Self {
        Self {
            to,
            text: text.into(),
            image: None,
            buttons: Vec::new(),
        }
    }
}

/// The outbound side of the messaging channel
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), MessengerError>;
}

/// Recording messenger for tests.
///
/// Keeps every delivered message and can be told to fail for specific
/// recipients, for the counted-not-fatal fan-out paths.
pub struct MockMessenger {
    sent: RwLock<Vec<OutboundMessage>>,
    failing: RwLock<HashSet<UserId>>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Make every send to this recipient fail
    pub fn fail_for(&self, user: UserId) {
        self.failing.write().unwrap().insert(user);
    }

    /// All delivered messages, in send order
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.read().unwrap().clone()
    }

    /// Delivered messages for one recipient
    pub fn sent_to(&self, user: UserId) -> Vec<OutboundMessage> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.to == user)
            .cloned()
            .collect()
    }
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send(&self, message: OutboundMessage) -> Result<(), MessengerError> {
        if self.failing.read().unwrap().contains(&message.to) {
            return Err(MessengerError::SendFailed {
                to: message.to,
                reason: "recipient unreachable".to_string(),
            });
        }
        self.sent.write().unwrap().push(message);
        Ok(())
    }
}
