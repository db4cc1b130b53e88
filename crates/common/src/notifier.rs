use async_trait::async_trait;

use crate::{ConversationId, Result};

/// Outbound side of the chat transport.
///
/// Inbound commands are parsed by the transport itself and handed to
/// `CommandDispatcher`; this trait only covers delivering text.
#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn send(&self, conversation: ConversationId, text: &str) -> Result<()>;
}
