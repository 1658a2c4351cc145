pub mod policy;

use async_trait::async_trait;

use crate::chat::types::{ChatId, UserId};
use crate::error::Error;

/// Outbound message delivery to a chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat: ChatId, text: &str) -> Result<(), Error>;
}

/// Whether a user may change a chat's settings.
#[async_trait]
pub trait AdminCheck: Send + Sync {
    async fn is_admin(&self, chat: ChatId, user: UserId) -> bool;
}
