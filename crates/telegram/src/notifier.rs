use async_trait::async_trait;
use teloxide::{prelude::*, types::ChatId};
use tracing::debug;

use common::{ConversationId, Error, NotifierPort, Result};

/// Delivers plain-text messages to Telegram chats.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl NotifierPort for TelegramNotifier {
    async fn send(&self, conversation: ConversationId, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(conversation.0), text)
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;
        debug!(%conversation, "Telegram message sent");
        Ok(())
    }
}
