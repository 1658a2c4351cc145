use std::sync::Arc;

use crate::payment::references::ReferenceTable;

use super::registry::ChatRegistry;
use super::types::ChatId;

/// Rekeys chat state when the upstream chat id changes (group -> supergroup).
pub struct MigrationHandler {
    registry: Arc<ChatRegistry>,
    references: Arc<ReferenceTable>,
}

impl MigrationHandler {
    pub fn new(registry: Arc<ChatRegistry>, references: Arc<ReferenceTable>) -> Self {
        Self {
            registry,
            references,
        }
    }

    pub async fn handle(&self, old: ChatId, new: ChatId) {
        if old == new {
            return;
        }

        if let Some(discarded) = self.registry.migrate(old, new).await {
            tracing::warn!(
                from = %old,
                to = %new,
                discarded = ?discarded,
                "Chat migration replaced an existing config"
            );
        }

        let references = self.references.rekey(old, new).await;
        tracing::info!(from = %old, to = %new, references, "Chat migrated");
    }
}
