//! Telegram Bot API bindings for Rust
//! Provides functions to post text messages and documents into a chat or channel

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid bot token")]
    InvalidToken,
    #[error("Request rejected with status {status}: {description}")]
    Rejected { status: u16, description: String },
}

impl ChannelError {
    /// HTTP status reported by the Bot API, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            ChannelError::RequestError(e) => e.status().map(|s| s.as_u16()),
            ChannelError::Rejected { status, .. } => Some(*status),
            ChannelError::InvalidToken => None,
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ChannelError::RequestError(e) => e.is_timeout() || e.is_connect(),
            ChannelError::Rejected { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            ChannelError::InvalidToken => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub url: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
    result: Option<Message>,
}

#[derive(Debug, Serialize)]
struct ReplyMarkup<'a> {
    inline_keyboard: Vec<Vec<&'a InlineButton>>,
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup<'a>>,
}

#[derive(Debug, Serialize)]
struct SendDocumentPayload<'a> {
    chat_id: &'a str,
    document: &'a str,
    caption: &'a str,
    parse_mode: &'static str,
}

pub struct BotClient {
    endpoint: String,
    client: Client,
}

impl BotClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self, ChannelError> {
        Self::with_api_url(DEFAULT_API_URL, token, timeout)
    }

    /// Build a client against a self-hosted Bot API server
    pub fn with_api_url(api_url: &str, token: &str, timeout: Duration) -> Result<Self, ChannelError> {
        if !is_valid_token(token) {
            return Err(ChannelError::InvalidToken);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            client,
        })
    }

    /// Send a MarkdownV2 text message, optionally with one row of link buttons
    pub fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[InlineButton],
    ) -> Result<Message, ChannelError> {
        let reply_markup = if buttons.is_empty() {
            None
        } else {
            Some(ReplyMarkup {
                inline_keyboard: vec![buttons.iter().collect()],
            })
        };

        let payload = SendMessagePayload {
            chat_id,
            text,
            parse_mode: "MarkdownV2",
            disable_web_page_preview: true,
            reply_markup,
        };

        let response = self
            .client
            .post(format!("{}/sendMessage", self.endpoint))
            .json(&payload)
            .send()?;

        Self::into_message(response)
    }

    /// Ask Telegram to fetch the document from `url` itself
    pub fn send_document_url(
        &self,
        chat_id: &str,
        url: &str,
        caption: &str,
    ) -> Result<Message, ChannelError> {
        let payload = SendDocumentPayload {
            chat_id,
            document: url,
            caption,
            parse_mode: "MarkdownV2",
        };

        let response = self
            .client
            .post(format!("{}/sendDocument", self.endpoint))
            .json(&payload)
            .send()?;

        Self::into_message(response)
    }

    /// Upload the document bytes as a multipart attachment
    pub fn send_document_bytes(
        &self,
        chat_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<Message, ChannelError> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "MarkdownV2")
            .part("document", Part::bytes(bytes).file_name(file_name.to_string()));

        let response = self
            .client
            .post(format!("{}/sendDocument", self.endpoint))
            .multipart(form)
            .send()?;

        Self::into_message(response)
    }

    fn into_message(response: Response) -> Result<Message, ChannelError> {
        let status = response.status();
        let body = response.text()?;
        parse_envelope(status, &body)
    }
}

/// Accepted only as HTTP 200 carrying `ok: true` and a result
fn parse_envelope(status: StatusCode, body: &str) -> Result<Message, ChannelError> {
    match serde_json::from_str::<ApiResponse>(body) {
        Ok(ApiResponse {
            ok: true,
            result: Some(message),
            ..
        }) if status == StatusCode::OK => Ok(message),
        Ok(api) => Err(ChannelError::Rejected {
            status: status.as_u16(),
            description: api.description.unwrap_or_else(|| "no description".to_string()),
        }),
        Err(_) => Err(ChannelError::Rejected {
            status: status.as_u16(),
            description: body.chars().take(200).collect(),
        }),
    }
}

/// Bot tokens look like `123456:ABC-DEF_ghi`
fn is_valid_token(token: &str) -> bool {
    match token.split_once(':') {
        Some((id, secret)) => {
            !id.is_empty()
                && id.chars().all(|c| c.is_ascii_digit())
                && !secret.is_empty()
                && secret
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        None => false,
    }
}
