use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound reply port.
///
/// Telegram is the only implementation; tests substitute a recording fake.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a message rendered with Telegram HTML parse mode.
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    /// Send a message with no markup interpretation.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
