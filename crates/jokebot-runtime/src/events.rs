use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::ConversationId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One normalized inbound update, independent of the chat platform.
pub enum InboundEvent {
    Message {
        conversation_id: ConversationId,
        user_id: Option<i64>,
        message_id: Option<i64>,
        text: String,
    },
    Callback {
        conversation_id: ConversationId,
        user_id: Option<i64>,
        callback_id: String,
        data: String,
    },
}

impl InboundEvent {
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            Self::Message {
                conversation_id, ..
            }
            | Self::Callback {
                conversation_id, ..
            } => *conversation_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Callback { .. } => "callback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A message the bot wants delivered to a conversation.
pub struct OutboundMessage {
    pub conversation_id: ConversationId,
    pub text: String,
    pub reply_to_message_id: Option<i64>,
    /// Rows of inline buttons; empty means no keyboard.
    pub keyboard: Vec<Vec<InlineButton>>,
}

impl OutboundMessage {
    pub fn text(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self {
            conversation_id,
            text: text.into(),
            reply_to_message_id: None,
            keyboard: Vec::new(),
        }
    }

    pub fn replying_to(mut self, message_id: Option<i64>) -> Self {
        self.reply_to_message_id = message_id;
        self
    }

    pub fn with_keyboard(mut self, keyboard: Vec<Vec<InlineButton>>) -> Self {
        self.keyboard = keyboard;
        self
    }
}

#[async_trait]
/// Delivery seam implemented by chat transports.
pub trait ReplySink: Send + Sync {
    async fn send_message(&self, message: &OutboundMessage) -> Result<()>;

    /// Acknowledges a button press, optionally with a short notice.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
