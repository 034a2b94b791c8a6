use async_trait::async_trait;
use teloxide::{prelude::*, types::ChatId};

use metronom_models::user::UserId;
use metronom_scheduler::DeliveryChannel;

/// Delivers fired reminders through the Telegram sendMessage API.
pub struct TelegramDeliveryChannel {
    bot: Bot,
}

impl TelegramDeliveryChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl DeliveryChannel for TelegramDeliveryChannel {
    async fn send_message(&self, user: UserId, text: &str) -> anyhow::Result<()> {
        self.bot.send_message(ChatId(user), text).await?;
        Ok(())
    }
}
