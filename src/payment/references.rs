use alloy::primitives::keccak256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::chat::types::ChatId;

/// Payment reference -> chat lookup.
///
/// A reference is an opaque value the payer puts in the transaction data.
/// Matching is a best-effort heuristic with no cryptographic binding to the
/// payer, so it only gates cosmetic features.
pub struct ReferenceTable {
    entries: RwLock<HashMap<String, ChatId>>,
    salt: u64,
    counter: AtomicU64,
}

impl Default for ReferenceTable {
    fn default() -> Self {
        let salt = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_salt(salt)
    }
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_salt(salt: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            salt,
            counter: AtomicU64::new(0),
        }
    }

    /// Mint a fresh reference for `chat` and record it.
    pub async fn issue(&self, chat: ChatId) -> String {
        let nonce = self.counter.fetch_add(1, Ordering::Relaxed);

        let mut preimage = Vec::with_capacity(24);
        preimage.extend_from_slice(&chat.0.to_be_bytes());
        preimage.extend_from_slice(&self.salt.to_be_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let reference = format!("0x{}", hex::encode(&keccak256(&preimage)[..8]));

        self.register(&reference, chat).await;
        reference
    }

    /// Record an externally minted reference. Returns false for an empty value.
    pub async fn register(&self, reference: &str, chat: ChatId) -> bool {
        let key = normalize(reference);
        if key.is_empty() || key == "0x" {
            return false;
        }
        self.entries.write().await.insert(key, chat);
        true
    }

    pub async fn resolve(&self, reference: &str) -> Option<ChatId> {
        self.entries.read().await.get(&normalize(reference)).copied()
    }

    /// Resolve and consume a reference in one step.
    pub async fn take(&self, reference: &str) -> Option<ChatId> {
        self.entries.write().await.remove(&normalize(reference))
    }

    /// Point every reference owned by `old` at `new`. Returns how many moved.
    pub async fn rekey(&self, old: ChatId, new: ChatId) -> usize {
        let mut entries = self.entries.write().await;
        let mut moved = 0;
        for chat in entries.values_mut().filter(|chat| **chat == old) {
            *chat = new;
            moved += 1;
        }
        moved
    }
}

fn normalize(reference: &str) -> String {
    reference.trim().to_ascii_lowercase()
}
