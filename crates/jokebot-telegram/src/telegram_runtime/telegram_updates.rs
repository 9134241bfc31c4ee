use anyhow::{Context, Result};
use jokebot_runtime::{ConversationId, InboundEvent};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    #[serde(default)]
    message: Option<TelegramMessage>,
    #[serde(default)]
    callback_query: Option<TelegramCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    chat: TelegramChat,
    #[serde(default)]
    from: Option<TelegramUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    id: i64,
    #[serde(default)]
    is_bot: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramCallbackQuery {
    id: String,
    from: TelegramUser,
    #[serde(default)]
    message: Option<TelegramMessage>,
    #[serde(default)]
    data: Option<String>,
}

/// What the runtime should do with one raw update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum NormalizedUpdate {
    Event(InboundEvent),
    /// Button press without its chat message or payload. Telegram keeps the
    /// client spinner running until the query is answered.
    DetachedCallback { callback_id: String },
    Ignored,
}

pub(super) fn update_id_of(update: &Value) -> Option<u64> {
    update.get("update_id").and_then(Value::as_u64)
}

/// Maps a raw update to a dispatcher event.
///
/// Messages from bots and non-text messages are ignored.
pub(super) fn normalize_update(update: &Value) -> Result<NormalizedUpdate> {
    let update = TelegramUpdate::deserialize(update).context("invalid telegram update payload")?;

    if let Some(message) = update.message {
        if message.from.as_ref().is_some_and(|user| user.is_bot) {
            return Ok(NormalizedUpdate::Ignored);
        }
        let Some(text) = message.text else {
            return Ok(NormalizedUpdate::Ignored);
        };
        return Ok(NormalizedUpdate::Event(InboundEvent::Message {
            conversation_id: ConversationId(message.chat.id),
            user_id: message.from.map(|user| user.id),
            message_id: Some(message.message_id),
            text,
        }));
    }

    if let Some(callback) = update.callback_query {
        if callback.from.is_bot {
            return Ok(NormalizedUpdate::Ignored);
        }
        let (Some(message), Some(data)) = (callback.message, callback.data) else {
            return Ok(NormalizedUpdate::DetachedCallback {
                callback_id: callback.id,
            });
        };
        return Ok(NormalizedUpdate::Event(InboundEvent::Callback {
            conversation_id: ConversationId(message.chat.id),
            user_id: Some(callback.from.id),
            callback_id: callback.id,
            data,
        }));
    }

    Ok(NormalizedUpdate::Ignored)
}
