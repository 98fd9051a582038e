use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use channels::{BotClient, ChannelError, InlineButton, Message};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::DispatcherSettings;
use crate::dispatch::registry::DispatchContext;
use crate::dispatch::{Dispatcher, DispatcherKind};
use crate::domain::{Notice, NoticeContent};
use crate::errors::{FeederError, FeederResult};
use crate::http::RetryPolicy;

/// The three delivery calls the fallback chain is built from. Each returns
/// true only when the channel accepted the message.
#[cfg_attr(test, mockall::automock)]
pub trait ChannelApi: Send + Sync {
    /// Let the channel fetch the document from `url` itself
    fn send_document_by_url(&self, url: &str, caption: &str) -> bool;

    fn send_document_upload(&self, file_name: &str, bytes: Vec<u8>, caption: &str) -> bool;

    fn send_link_message(&self, text: &str, button_text: &str, url: &str) -> bool;
}

#[cfg_attr(test, mockall::automock)]
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str) -> FeederResult<Vec<u8>>;
}

/// Bot API client bound to one chat, retrying transient failures.
pub struct BotChannel {
    client: BotClient,
    chat_id: String,
    retry: RetryPolicy,
}

impl BotChannel {
    pub fn new(client: BotClient, chat_id: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            chat_id,
            retry,
        }
    }

    fn deliver<F>(&self, what: &str, op: F) -> bool
    where
        F: FnMut() -> Result<Message, ChannelError>,
    {
        match self.retry.run(what, op) {
            Ok(message) => {
                debug!(chat = %self.chat_id, what, message_id = message.message_id, "delivered");
                true
            }
            Err(e) => {
                warn!(chat = %self.chat_id, what, error = %e, "delivery attempt failed");
                false
            }
        }
    }
}

impl ChannelApi for BotChannel {
    fn send_document_by_url(&self, url: &str, caption: &str) -> bool {
        self.deliver("sendDocument(url)", || {
            self.client.send_document_url(&self.chat_id, url, caption)
        })
    }

    fn send_document_upload(&self, file_name: &str, bytes: Vec<u8>, caption: &str) -> bool {
        self.deliver("sendDocument(upload)", || {
            self.client
                .send_document_bytes(&self.chat_id, file_name, bytes.clone(), caption)
        })
    }

    fn send_link_message(&self, text: &str, button_text: &str, url: &str) -> bool {
        let buttons = [InlineButton::new(button_text, url)];
        self.deliver("sendMessage", || {
            self.client.send_message(&self.chat_id, text, &buttons)
        })
    }
}

pub struct TelegramDispatcher {
    name: String,
    api: Box<dyn ChannelApi>,
    downloader: Arc<dyn Downloader>,
    upload_extensions: HashSet<String>,
}

impl TelegramDispatcher {
    pub fn new(
        name: String,
        api: Box<dyn ChannelApi>,
        downloader: Arc<dyn Downloader>,
        upload_extensions: &[String],
    ) -> Self {
        Self {
            name,
            api,
            downloader,
            upload_extensions: upload_extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    fn is_uploadable(&self, content: &NoticeContent) -> bool {
        content
            .extension()
            .is_some_and(|ext| self.upload_extensions.contains(&ext))
    }

    /// By reference, then local download + upload, then a link button.
    fn send_document(&self, content: &NoticeContent, file_name: &str, caption: &str) -> bool {
        if self.api.send_document_by_url(&content.link, caption) {
            return true;
        }

        info!(dispatcher = %self.name, link = %content.link, "by-reference send failed, uploading");
        match self.downloader.download(&content.link) {
            Ok(bytes) => {
                if self.api.send_document_upload(file_name, bytes, caption) {
                    return true;
                }
            }
            Err(e) => warn!(dispatcher = %self.name, link = %content.link, error = %e, "download failed"),
        }

        self.api
            .send_link_message(caption, &format!("Open - {file_name}"), &content.link)
    }
}

impl Dispatcher for TelegramDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DispatcherKind {
        DispatcherKind::Telegram
    }

    fn send(&self, notice: &Notice<'_>) -> bool {
        let caption = build_caption(&notice.source_names(), &notice.content);
        let content = &notice.content;

        match content.file_name() {
            Some(file_name) if self.is_uploadable(content) => {
                self.send_document(content, file_name, &caption)
            }
            _ => self.api.send_link_message(&caption, "Open Notice", &content.link),
        }
    }
}

/// Constructor registered for `DispatcherKind::Telegram`
pub fn build(settings: &DispatcherSettings, ctx: &DispatchContext<'_>) -> FeederResult<Arc<dyn Dispatcher>> {
    let token = ctx
        .bot_token
        .ok_or_else(|| FeederError::MissingEnvVar("TG_BOT_TOKEN".to_string()))?;
    let chat_id = settings.chat_id.clone().ok_or_else(|| {
        FeederError::Config(format!("dispatcher '{}' requires a chat_id", settings.name()))
    })?;

    let client = match settings.api_url.as_deref() {
        Some(api_url) => BotClient::with_api_url(api_url, token, ctx.timeout)?,
        None => BotClient::new(token, ctx.timeout)?,
    };
    let upload_extensions = settings
        .upload_extensions
        .as_deref()
        .unwrap_or(ctx.upload_extensions);

    Ok(Arc::new(TelegramDispatcher::new(
        settings.name().to_string(),
        Box::new(BotChannel::new(client, chat_id, ctx.retry)),
        Arc::clone(&ctx.downloader),
        upload_extensions,
    )))
}

/// `#Source` tags, date and title, escaped for MarkdownV2
pub fn build_caption(source_names: &[&str], content: &NoticeContent) -> String {
    let tags = source_names
        .iter()
        .map(|name| format!("#{name}"))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "{}  \n*Date \\- * {} \n{}",
        escape_markdown_v2(&tags),
        escape_markdown_v2(&content.date),
        escape_markdown_v2(&content.title)
    )
}

pub fn escape_markdown_v2(text: &str) -> String {
    static SPECIAL: OnceLock<Regex> = OnceLock::new();
    let special = SPECIAL.get_or_init(|| {
        Regex::new(r"[_*\[\]()~`>#+\-=|{}.!,\\]").expect("static regex")
    });
    special.replace_all(text, r"\$0").into_owned()
}
