use alloy::primitives::B256;
use thiserror::Error;

use crate::chat::types::{ChatId, UserId};

/// Errors surfaced by the monitoring and attribution core.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed address, non-positive threshold, empty message. No state was changed.
    #[error("{0}")]
    InvalidInput(String),

    /// The caller is not allowed to change this chat's settings. No state was changed.
    #[error("user {user} is not an admin of chat {chat}")]
    NotAdmin { chat: ChatId, user: UserId },

    /// A pending transaction could not be fetched.
    #[error("failed to resolve transaction {hash}: {reason}")]
    Resolution { hash: B256, reason: String },

    /// Delivery of a message to a chat failed.
    #[error("failed to notify chat {chat}: {reason}")]
    Notify { chat: ChatId, reason: String },

    /// Transport-level RPC failure (subscription setup, connection).
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The upstream pending-transaction stream terminated.
    #[error("pending transaction subscription closed")]
    SubscriptionClosed,
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
