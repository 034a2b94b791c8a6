mod delivery;
mod dispatch;
mod parse;


pub use delivery::TelegramDeliveryChannel;
pub use dispatch::reply_for_command;

use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, macros::BotCommands, prelude::*};

use metronom_storage::{JobRegistry, RegistryStorage};

type HandlerResult = anyhow::Result<()>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "explain how reminders are registered.")]
    Help,
    #[command(description = "register a recurring reminder.")]
    Set(String),
    #[command(description = "set the default timezone offset for new reminders.")]
    SetTimezone(String),
    #[command(description = "list the registered reminders.")]
    View,
    #[command(description = "remove a reminder by its /view number.")]
    Remove(String),
}

pub struct TelegramInteractionInterface;

impl TelegramInteractionInterface {
    pub async fn start<S>(bot: Bot, registry: Arc<JobRegistry<S>>)
    where
        S: RegistryStorage + 'static,
    {
        log::info!("Starting Telegram interaction interface");

        Dispatcher::builder(bot, schema::<S>())
            .dependencies(dptree::deps![registry])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await
    }
}

fn schema<S>() -> UpdateHandler<anyhow::Error>
where
    S: RegistryStorage + 'static,
{
    Update::filter_message()
        .branch(teloxide::filter_command::<Command, _>().endpoint(handle_command::<S>))
        .branch(dptree::endpoint(unrecognized_message))
}

async fn handle_command<S>(
    bot: Bot,
    msg: Message,
    command: Command,
    registry: Arc<JobRegistry<S>>,
) -> HandlerResult
where
    S: RegistryStorage + 'static,
{
    let chat_id = msg.chat.id;
    let reply = dispatch::reply_for_command(registry.as_ref(), chat_id.0, command).await;
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

async fn unrecognized_message(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, dispatch::INVALID_COMMAND).await?;
    Ok(())
}
