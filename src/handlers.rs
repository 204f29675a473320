use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use teloxide::{
    prelude::*,
    types::{FileId, InputFile, MessageId, Recipient, ReplyParameters},
    utils::command::BotCommands,
};

use crate::commands::{Command, answer};
use crate::config::BotConfig;
use crate::template::{RuleBook, TemplateFormatter, extract_urls};

pub const MISSING_TEXT_PROMPT: &str = "⚠️ Please send text or photo with caption.";
/// Telegram caps photo captions at this many UTF-16 code units
pub const CAPTION_LIMIT: usize = 1024;

/// Shared, read-only state handed to every update handler
#[derive(Debug, Clone)]
pub struct DealContext {
    pub formatter: TemplateFormatter,
    /// Best-effort secondary destination for formatted deals
    pub relay: Option<Recipient>,
}

impl DealContext {
    pub fn new(formatter: TemplateFormatter, relay: Option<Recipient>) -> Self {
        Self { formatter, relay }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        let rules = RuleBook::default();
        info!("📚 Loaded {} platform rules", rules.rules().len());
        Self::new(
            TemplateFormatter::new(rules, config.main_channel.clone()),
            config.group_id.clone(),
        )
    }
}

/// The parts of an incoming Telegram message the formatter cares about
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub raw_text: Option<String>,
    pub urls: Vec<String>,
    pub photo: Option<FileId>,
}

impl InboundMessage {
    /// A photo caption wins over plain text.
    pub fn new(text: Option<&str>, caption: Option<&str>, photo: Option<FileId>) -> Self {
        let raw_text = caption.or(text).map(str::to_string);
        let urls = raw_text.as_deref().map(extract_urls).unwrap_or_default();
        Self {
            raw_text,
            urls,
            photo,
        }
    }

    pub fn from_message(msg: &Message) -> Self {
        // Telegram lists photo sizes smallest first
        let photo = msg
            .photo()
            .and_then(|sizes| sizes.last())
            .map(|size| size.file.id.clone());
        Self::new(msg.text(), msg.caption(), photo)
    }

    /// Text worth formatting, or `None` when there is nothing but whitespace
    pub fn deal_text(&self) -> Option<&str> {
        self.raw_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Reply sent; `relayed` tells whether the relay destination got a copy too
    Sent { relayed: bool },
    /// No usable text, the sender was asked for some
    UserPrompted,
    /// Reply sent but the relay failed
    RelayFailed(String),
}

/// Outbound side of the bot, implemented for `Bot` and faked in tests
#[async_trait]
pub trait DealTransport: Send + Sync {
    async fn deliver_text(
        &self,
        to: Recipient,
        reply_to: Option<MessageId>,
        text: String,
    ) -> ResponseResult<()>;

    async fn deliver_photo(
        &self,
        to: Recipient,
        reply_to: Option<MessageId>,
        photo: FileId,
        caption: Option<String>,
    ) -> ResponseResult<()>;
}

#[async_trait]
impl DealTransport for Bot {
    async fn deliver_text(
        &self,
        to: Recipient,
        reply_to: Option<MessageId>,
        text: String,
    ) -> ResponseResult<()> {
        let mut request = self.send_message(to, text);
        request.reply_parameters = reply_to.map(ReplyParameters::new);
        request.await?;
        Ok(())
    }

    async fn deliver_photo(
        &self,
        to: Recipient,
        reply_to: Option<MessageId>,
        photo: FileId,
        caption: Option<String>,
    ) -> ResponseResult<()> {
        let mut request = self.send_photo(to, InputFile::file_id(photo));
        request.caption = caption;
        request.reply_parameters = reply_to.map(ReplyParameters::new);
        request.await?;
        Ok(())
    }
}

fn fits_in_caption(content: &str) -> bool {
    content.encode_utf16().count() <= CAPTION_LIMIT
}

/// Sends `content` as the photo caption when it fits, otherwise sends the
/// bare photo followed by `content` as a text message.
async fn deliver<T: DealTransport + ?Sized>(
    transport: &T,
    to: Recipient,
    reply_to: Option<MessageId>,
    photo: Option<&FileId>,
    content: &str,
) -> ResponseResult<()> {
    match photo {
        Some(photo) if fits_in_caption(content) => {
            transport
                .deliver_photo(to, reply_to, photo.clone(), Some(content.to_string()))
                .await
        }
        Some(photo) => {
            info!("✂️ Deal too long for a caption - sending photo and text separately");
            transport
                .deliver_photo(to.clone(), reply_to, photo.clone(), None)
                .await?;
            transport
                .deliver_text(to, reply_to, content.to_string())
                .await
        }
        None => {
            transport
                .deliver_text(to, reply_to, content.to_string())
                .await
        }
    }
}

/// Formats a deal post and replies with it, then relays a copy if configured.
///
/// Only the primary reply can fail this call; relay errors are logged and
/// reported as [`DispatchOutcome::RelayFailed`].
pub async fn dispatch<T: DealTransport + ?Sized>(
    transport: &T,
    ctx: &DealContext,
    chat: ChatId,
    reply_to: Option<MessageId>,
    inbound: &InboundMessage,
) -> ResponseResult<DispatchOutcome> {
    let Some(text) = inbound.deal_text() else {
        info!("🙄 No text or caption in chat {chat} - prompting sender");
        transport
            .deliver_text(chat.into(), reply_to, MISSING_TEXT_PROMPT.to_string())
            .await?;
        return Ok(DispatchOutcome::UserPrompted);
    };

    let platform = ctx.formatter.classify(text, &inbound.urls);
    info!(
        "🏷️ Detected platform {platform} in chat {chat} ({} link(s))",
        inbound.urls.len()
    );
    let response = ctx.formatter.format(text, &inbound.urls);

    deliver(
        transport,
        chat.into(),
        reply_to,
        inbound.photo.as_ref(),
        &response,
    )
    .await?;
    info!(
        "📤 Sent formatted deal to chat {chat} (photo: {})",
        inbound.photo.is_some()
    );

    let Some(relay) = ctx.relay.clone() else {
        return Ok(DispatchOutcome::Sent { relayed: false });
    };

    match deliver(
        transport,
        relay.clone(),
        None,
        inbound.photo.as_ref(),
        &response,
    )
    .await
    {
        Ok(()) => {
            info!("📣 Relayed deal to {relay:?}");
            Ok(DispatchOutcome::Sent { relayed: true })
        }
        Err(e) => {
            warn!("❌ Failed to relay deal to {relay:?}: {e}");
            Ok(DispatchOutcome::RelayFailed(e.to_string()))
        }
    }
}

/// What `handle_message` does with an update
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Neither text nor photo, e.g. stickers and service messages
    Ignore,
    Command(Command),
    Deal,
}

/// Known commands are answered; everything else carrying text or a photo,
/// unknown `/...` text included, is a deal post.
pub fn route(text: Option<&str>, has_photo: bool, bot_username: &str) -> Route {
    match text {
        None if !has_photo => Route::Ignore,
        Some(text) if text.starts_with('/') => Command::parse(text, bot_username)
            .map(Route::Command)
            .unwrap_or(Route::Deal),
        _ => Route::Deal,
    }
}

pub async fn handle_message(bot: Bot, msg: Message, ctx: Arc<DealContext>) -> ResponseResult<()> {
    // Only command-looking text needs the bot's username
    let bot_username = match msg.text() {
        Some(text) if text.starts_with('/') => bot
            .get_me()
            .await?
            .username
            .clone()
            .unwrap_or_else(|| "bot".to_string()),
        _ => String::new(),
    };

    match route(msg.text(), msg.photo().is_some(), &bot_username) {
        Route::Ignore => {
            info!("📎 Ignoring message without text or photo in chat {}", msg.chat.id);
            Ok(())
        }
        Route::Command(cmd) => {
            info!("✅ Command parsed successfully: {cmd:?}");
            answer(bot, msg, cmd).await
        }
        Route::Deal => {
            info!("📝 Processing deal post in chat {}", msg.chat.id);
            let inbound = InboundMessage::from_message(&msg);
            let outcome = dispatch(&bot, &ctx, msg.chat.id, Some(msg.id), &inbound).await?;
            info!("🏁 Finished chat {} with {outcome:?}", msg.chat.id);
            Ok(())
        }
    }
}
