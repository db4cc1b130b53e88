use tokio::sync::RwLock;
use tracing::info;

use common::ConversationId;

/// Single-slot holder for the subscribed conversation.
///
/// Shared between the scheduler and command handlers behind an `Arc`. The
/// slot starts empty, is overwritten by every subscribe (last writer wins)
/// and is never cleared.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slot: RwLock<Option<ConversationId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<ConversationId> {
        *self.slot.read().await
    }

    /// Make `conversation` the delivery target. Returns the previous one.
    pub async fn subscribe(&self, conversation: ConversationId) -> Option<ConversationId> {
        let previous = self.slot.write().await.replace(conversation);
        match previous {
            Some(prev) if prev != conversation => {
                info!(%prev, %conversation, "Session taken over by another conversation")
            }
            Some(_) => {}
            None => info!(%conversation, "Session subscribed"),
        }
        previous
    }
}
