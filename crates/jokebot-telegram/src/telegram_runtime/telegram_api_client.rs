//! Telegram Bot API client helpers used by polling and reply flows.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use jokebot_runtime::{InlineButton, OutboundMessage, ReplySink};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{
    is_retryable_telegram_status, is_retryable_transport_error, retry_delay, truncate_for_error,
};

const ALLOWED_UPDATES: &str = r#"["message","callback_query"]"#;

#[derive(Debug, Deserialize)]
struct TelegramEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    #[serde(default)]
    parameters: Option<TelegramResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct TelegramResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TelegramSentMessage {
    pub(super) chat_id: i64,
    pub(super) message_id: i64,
}

#[derive(Clone)]
pub(super) struct TelegramApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl TelegramApiClient {
    /// `poll_timeout_seconds` is added to the HTTP timeout so long polls are
    /// not cut short by the client.
    pub(super) fn new(
        api_base: String,
        bot_token: String,
        request_timeout_ms: u64,
        poll_timeout_seconds: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let bot_token = bot_token.trim().to_string();
        if bot_token.is_empty() {
            bail!("telegram bot token cannot be empty");
        }
        let api_base = api_base.trim().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            bail!("telegram api base cannot be empty");
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("jokebot-telegram"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let timeout = Duration::from_millis(request_timeout_ms.max(1))
            .saturating_add(Duration::from_secs(poll_timeout_seconds));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to create telegram api client")?;

        Ok(Self {
            http,
            api_base,
            bot_token,
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    pub(super) async fn get_updates(
        &self,
        offset: u64,
        poll_timeout_seconds: u64,
    ) -> Result<Vec<Value>> {
        let url = self.method_url("getUpdates");
        let query = [
            ("offset", offset.to_string()),
            ("timeout", poll_timeout_seconds.to_string()),
            ("allowed_updates", ALLOWED_UPDATES.to_string()),
        ];
        self.request_json("getUpdates", || self.http.get(url.as_str()).query(&query))
            .await
    }

    pub(super) async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
        keyboard: &[Vec<InlineButton>],
    ) -> Result<TelegramSentMessage> {
        let payload = render_send_message_payload(chat_id, text, reply_to_message_id, keyboard);
        let url = self.method_url("sendMessage");
        let message: Value = self
            .request_json("sendMessage", || self.http.post(url.as_str()).json(&payload))
            .await?;
        let message_id = message
            .get("message_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("telegram sendMessage response missing message_id"))?;
        Ok(TelegramSentMessage {
            chat_id,
            message_id,
        })
    }

    pub(super) async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({ "callback_query_id": callback_query_id });
        if let Some(text) = text.map(str::trim).filter(|value| !value.is_empty()) {
            payload["text"] = Value::String(text.to_string());
        }
        let url = self.method_url("answerCallbackQuery");
        let acknowledged: bool = self
            .request_json("answerCallbackQuery", || {
                self.http.post(url.as_str()).json(&payload)
            })
            .await?;
        if !acknowledged {
            bail!("telegram answerCallbackQuery returned false");
        }
        Ok(())
    }

    async fn request_json<T, F>(&self, method: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header(
                    "x-jokebot-retry-attempt",
                    attempt.saturating_sub(1).to_string(),
                )
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .with_context(|| format!("failed to read telegram {method} response"))?;
                    let envelope = serde_json::from_str::<TelegramEnvelope<T>>(&body).ok();

                    if status.is_success() {
                        let envelope = envelope.ok_or_else(|| {
                            anyhow!(
                                "failed to decode telegram {method} response: {}",
                                truncate_for_error(&body, 320)
                            )
                        })?;
                        if !envelope.ok {
                            bail!(
                                "telegram api {method} failed: {}",
                                envelope
                                    .description
                                    .unwrap_or_else(|| "unknown error".to_string())
                            );
                        }
                        return envelope
                            .result
                            .ok_or_else(|| anyhow!("telegram {method} response missing result"));
                    }

                    let retry_after = envelope
                        .as_ref()
                        .and_then(|value| value.parameters.as_ref())
                        .and_then(|parameters| parameters.retry_after);
                    if attempt < self.retry_max_attempts
                        && is_retryable_telegram_status(status.as_u16())
                    {
                        warn!(
                            method,
                            attempt,
                            status = status.as_u16(),
                            "retrying telegram api request"
                        );
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    let detail = envelope
                        .and_then(|value| value.description)
                        .unwrap_or_else(|| truncate_for_error(&body, 800));
                    bail!(
                        "telegram api {method} failed with status {}: {}",
                        status.as_u16(),
                        detail
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        warn!(
                            method,
                            attempt,
                            "retrying telegram api request after transport error"
                        );
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    // Strip the URL so the bot token never reaches logs.
                    return Err(anyhow!(error.without_url()))
                        .with_context(|| format!("telegram api {method} request failed"));
                }
            }
        }
    }
}

#[async_trait]
impl ReplySink for TelegramApiClient {
    async fn send_message(&self, message: &OutboundMessage) -> Result<()> {
        TelegramApiClient::send_message(
            self,
            message.conversation_id.0,
            &message.text,
            message.reply_to_message_id,
            &message.keyboard,
        )
        .await
        .map(|sent| {
            debug!(
                chat_id = sent.chat_id,
                message_id = sent.message_id,
                "telegram message sent"
            );
        })
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.answer_callback_query(callback_id, text).await
    }
}

pub(super) fn render_send_message_payload(
    chat_id: i64,
    text: &str,
    reply_to_message_id: Option<i64>,
    keyboard: &[Vec<InlineButton>],
) -> Value {
    let mut payload = json!({
        "chat_id": chat_id,
        "text": text,
        "link_preview_options": { "is_disabled": true },
    });
    if let Some(message_id) = reply_to_message_id {
        payload["reply_parameters"] = json!({
            "message_id": message_id,
            "allow_sending_without_reply": true,
        });
    }
    if !keyboard.is_empty() {
        let rows = keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| {
                        json!({
                            "text": button.label,
                            "callback_data": button.callback_data,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        payload["reply_markup"] = json!({ "inline_keyboard": rows });
    }
    payload
}
