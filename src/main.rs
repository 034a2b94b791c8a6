mod appsettings;

use std::path::Path;
use std::sync::Arc;

use teloxide::Bot;
use tokio_util::sync::CancellationToken;

use metronom_scheduler::TickHandler;
use metronom_storage::{JobRegistry, SqliteRegistryStorage};
use metronom_telegram::{TelegramDeliveryChannel, TelegramInteractionInterface};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::get();

    let storage = SqliteRegistryStorage::open(Path::new(&settings.storage.path))?;
    let registry = Arc::new(JobRegistry::new(storage));
    log::info!("Opened job registry [path = {}]", settings.storage.path);

    let bot = Bot::new(settings.telegram.token.clone());
    let delivery = Arc::new(TelegramDeliveryChannel::new(bot.clone()));

    let cancellation_token = CancellationToken::new();
    let tick_handler = Arc::new(TickHandler::new(registry.clone(), delivery));
    let tick_task = tokio::spawn(tick_handler.run(cancellation_token.child_token()));

    TelegramInteractionInterface::start(bot, registry).await;

    cancellation_token.cancel();
    let _ = tick_task.await;

    Ok(())
}
