//! Bot instance creation and command registration.

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use foxcore::config::{network, Config};

/// Bot commands enum with descriptions
///
/// The `/start` payload carries the optional referral deep-link
/// (`https://t.me/<bot>?start=<referrer_id>`), delivered by Telegram as
/// the command argument.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "начать игру и открыть меню")]
    Start(String),
}

/// Creates a Bot instance with custom or default API URL
///
/// The token comes from the loaded [`Config`]; `BOT_API_URL` switches
/// the bot to a local Bot API server.
pub fn create_bot(config: &Config) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(network::timeout()).build()?;

    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        Bot::with_client(config.bot_token.clone(), client).set_api_url(url)
    } else {
        Bot::with_client(config.bot_token.clone(), client)
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![BotCommand::new("start", "начать игру и открыть меню")])
        .await?;

    Ok(())
}
