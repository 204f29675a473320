use log::info;
use teloxide::{prelude::*, utils::command::BotCommands};

pub const RUNNING_REPLY: &str = "Bot is running ✅";

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(
    rename_rule = "lowercase",
    description = "Send a deal (text, or a photo with a caption) and I'll format it. These commands are supported:"
)]
pub enum Command {
    #[command(description = "check that the bot is alive.")]
    Start,
    #[command(description = "display this text.")]
    Help,
}

pub async fn answer(bot: Bot, msg: Message, cmd: Command) -> ResponseResult<()> {
    info!("💬 Processing command {cmd:?} in chat {}", msg.chat.id);

    match cmd {
        Command::Start => {
            info!("📤 Sending liveness reply to chat {}", msg.chat.id);
            bot.send_message(msg.chat.id, RUNNING_REPLY).await?
        }
        Command::Help => {
            info!("📤 Sending help response to chat {}", msg.chat.id);
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?
        }
    };

    Ok(())
}
