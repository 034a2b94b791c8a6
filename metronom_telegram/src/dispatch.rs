use std::time::Duration;

use metronom_models::{job::TzOffset, user::UserId};
use metronom_storage::{JobRegistry, RegistryError, RegistryStorage};

use crate::{Command, parse};

pub const INVALID_COMMAND: &str = "Invalid command";

const GENERIC_FAILURE: &str = "Oops an error occurred";
const INVALID_INDEX: &str = "Invalid index selected";
const REMOVAL_WARNING: &str =
    "No reminder was removed, check if the reminder time was inputted correctly";
const TIMEZONE_USAGE: &str = "Invalid argument\nUsage: <integer timezone offset>\nExample: -10";

const HELP: &str = "Sets a reminder triggered daily by default at the specified time.\n\n\
Usage: /set <time in 24h format> <message> <flags>\n\
Example: /set 1907 dinner -w 1,2 -d 2,4 -m 2,12\n\n\
Flags:\n\
-w: Only send on specific days of the week, taking in 0-6 representing Sunday to Saturday\n\
Usage: -w 0,1,2,3,4,5,6 \n\
Example: -w 0,3 sends a message every Sunday and Wednesday\n\n\
-d: Only send on specific days of the month.\n\
Usage: -d 12,23 \n\
Example: -d 12,23 sends a message every 12th and 23rd of the month\n\n\
-m: Only send in specific months of the year.\n\
Usage: -m 1,12 \n\
Example: -m 1,12 sends a message every Jan and Dec\n\n\
Using multiple flags requires all of them to match for the message to be sent.\n\n\
Other commands:\n\
/settimezone <integer offset> sets the default UTC offset used for new reminders\n\
/view lists the registered reminders\n\
/remove <index> removes a reminder by its /view number";

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Produces the reply for one inbound command. Validation problems come back
/// as reply text; anything unexpected is logged and collapsed into a generic
/// failure reply.
pub async fn reply_for_command<S: RegistryStorage>(
    registry: &JobRegistry<S>,
    chat: UserId,
    command: Command,
) -> String {
    let reply = tokio::time::timeout(COMMAND_TIMEOUT, try_reply(registry, chat, command)).await;

    match reply {
        Ok(Ok(reply)) => reply,
        Ok(Err(error)) => {
            log::error!("Command handling failed [chat_id = {}, error = {:#}]", chat, error);
            GENERIC_FAILURE.to_string()
        }
        Err(_) => {
            log::error!("Command handling timed out [chat_id = {}]", chat);
            GENERIC_FAILURE.to_string()
        }
    }
}

async fn try_reply<S: RegistryStorage>(
    registry: &JobRegistry<S>,
    chat: UserId,
    command: Command,
) -> anyhow::Result<String> {
    match command {
        Command::Help => Ok(HELP.to_string()),
        Command::Set(args) => set(registry, chat, &args).await,
        Command::SetTimezone(args) => set_timezone(registry, chat, &args).await,
        Command::View => view(registry, chat).await,
        Command::Remove(args) => remove(registry, chat, &args).await,
    }
}

async fn set<S: RegistryStorage>(
    registry: &JobRegistry<S>,
    chat: UserId,
    args: &str,
) -> anyhow::Result<String> {
    match parse::parse_set_args(args) {
        Err(errors) => Ok(errors.join("\n\n")),
        Ok(new_job) => {
            registry.add_job(chat, new_job).await?;
            Ok("Message set".to_string())
        }
    }
}

async fn set_timezone<S: RegistryStorage>(
    registry: &JobRegistry<S>,
    chat: UserId,
    args: &str,
) -> anyhow::Result<String> {
    let offset = args.trim().parse::<i8>().ok().and_then(TzOffset::new);
    let Some(offset) = offset else {
        return Ok(TIMEZONE_USAGE.to_string());
    };

    registry.set_offset(chat, offset).await?;

    Ok(format!(
        "Timezone set to {offset}\n\
         Do note that previous reminders might not be accurate due to the change\n\
         It would be best to re-input all reminders again"
    ))
}

async fn view<S: RegistryStorage>(
    registry: &JobRegistry<S>,
    chat: UserId,
) -> anyhow::Result<String> {
    let account = registry.user(chat).await?;
    let Some(account) = account.filter(|account| !account.jobs.is_empty()) else {
        return Ok("No Reminders".to_string());
    };

    let mut reply = String::from("Reminders\n");
    for (index, job) in account.jobs.iter().enumerate() {
        reply.push_str(&format!(
            "({}) Time: {}, Message: {}, Offset: {}",
            index + 1,
            job.fire_at,
            job.message,
            job.tz
        ));
        if let Some(day) = &job.day {
            reply.push_str(&format!(", Day: {}", render_values(day)));
        }
        if let Some(date) = &job.date {
            reply.push_str(&format!(", Date: {}", render_values(date)));
        }
        if let Some(month) = &job.month {
            reply.push_str(&format!(", Month: {}", render_values(month)));
        }
        reply.push_str("\n\n");
    }
    reply.push_str(&format!("Default offset: {}", account.offset));

    Ok(reply)
}

async fn remove<S: RegistryStorage>(
    registry: &JobRegistry<S>,
    chat: UserId,
    args: &str,
) -> anyhow::Result<String> {
    let Some(index) = args.trim().parse::<usize>().ok().filter(|index| *index >= 1) else {
        return Ok(INVALID_INDEX.to_string());
    };

    match registry.remove_job(chat, index).await {
        Ok(_) => Ok("Reminder successfully removed".to_string()),
        Err(RegistryError::InvalidIndex) => Ok(INVALID_INDEX.to_string()),
        Err(RegistryError::Inconsistent { .. }) => Ok(REMOVAL_WARNING.to_string()),
        Err(error @ RegistryError::Store(_)) => Err(error.into()),
    }
}

fn render_values(values: &[u8]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
