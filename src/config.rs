use std::env;

use teloxide::types::{ChatId, Recipient};
use thiserror::Error;

use crate::template::DEFAULT_CHANNEL;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOT_TOKEN environment variable not set")]
    MissingToken,
    #[error("GROUP_ID must be a numeric chat id or an @channel username, got '{0}'")]
    InvalidGroupId(String),
    #[error("PORT must be a valid number, got '{0}'")]
    InvalidPort(String),
}

/// Runtime settings read from the environment (or `.env`)
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Secondary destination every formatted deal is relayed to
    pub group_id: Option<Recipient>,
    /// Handle advertised in the "follow us" line
    pub main_channel: String,
    /// Port for the keep-alive / webhook HTTP server
    pub port: u16,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = non_empty("BOT_TOKEN").ok_or(ConfigError::MissingToken)?;
        let group_id = non_empty("GROUP_ID").map(|v| parse_recipient(&v)).transpose()?;
        let main_channel = non_empty("MAIN_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        let port = match non_empty("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            bot_token,
            group_id,
            main_channel,
            port,
        })
    }
}

fn parse_recipient(raw: &str) -> Result<Recipient, ConfigError> {
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    match raw.strip_prefix('@') {
        Some(name) if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') => {
            Ok(Recipient::ChannelUsername(raw.to_string()))
        }
        _ => Err(ConfigError::InvalidGroupId(raw.to_string())),
    }
}
