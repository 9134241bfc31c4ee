//! Routes inbound commands, follow-up messages, and button presses.

use std::sync::Arc;

use jokebot_core::current_unix_timestamp_ms;
use jokebot_source::{fetch_batch, Joke, JokeSource, KeywordFinder, DEFAULT_MAX_SEARCH_ATTEMPTS};
use jokebot_store::{JokeRecord, JokeStore};
use tracing::{debug, info, warn};

use crate::commands::{parse_bot_command, parse_custom_joke, BotCommand, CallbackAction};
use crate::events::{InboundEvent, OutboundMessage, ReplySink};
use crate::render::{
    batch_keyboard, found_keyboard, found_text, not_found_text, render_batch, render_saved_jokes,
    searching_text, unknown_command_text, welcome_text, BATCH_EMPTY, CUSTOM_JOKE_ANONYMOUS,
    CUSTOM_JOKE_FORMAT_ERROR, CUSTOM_JOKE_PROMPT, CUSTOM_JOKE_SAVED, CUSTOM_JOKE_SAVE_FAILED,
    EMPTY_KEYWORD, JOKE_SAVED, JOKE_SAVE_FAILED, KEYWORD_PROMPT, NO_SAVED_JOKES,
    SAVED_JOKES_MAX_CHARS, STALE_BATCH_SELECTION, STALE_FOUND_SELECTION, UNKNOWN_CALLBACK,
};
use crate::session::{
    ConversationId, PendingAction, SessionStore, DEFAULT_CACHE_TTL_MS,
};

#[derive(Debug, Clone)]
/// Tunables for [`JokeDispatcher`].
pub struct DispatcherConfig {
    pub batch_size: usize,
    pub list_max_chars: usize,
    pub search_max_attempts: usize,
    pub search_retry_base_delay_ms: u64,
    /// Zero keeps pending flows until consumed.
    pub pending_ttl_ms: u64,
    /// Lifetime of cached batches and search hits behind save buttons.
    pub cache_ttl_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            list_max_chars: SAVED_JOKES_MAX_CHARS,
            search_max_attempts: DEFAULT_MAX_SEARCH_ATTEMPTS,
            search_retry_base_delay_ms: 0,
            pending_ttl_ms: 15 * 60 * 1_000,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What a single dispatch did, for transport audit logs.
pub struct DispatchOutcome {
    pub action: String,
    pub status: &'static str,
}

impl DispatchOutcome {
    fn new(action: impl Into<String>, status: &'static str) -> Self {
        Self {
            action: action.into(),
            status,
        }
    }
}

/// Handles one inbound event at a time.
///
/// Owns the session store, so callers must serialize events; the polling
/// transports do.
pub struct JokeDispatcher {
    config: DispatcherConfig,
    source: Arc<dyn JokeSource>,
    finder: KeywordFinder,
    store: JokeStore,
    sessions: SessionStore,
}

impl JokeDispatcher {
    pub fn new(config: DispatcherConfig, source: Arc<dyn JokeSource>, store: JokeStore) -> Self {
        let finder = KeywordFinder::new(source.clone(), config.search_max_attempts)
            .with_retry_base_delay_ms(config.search_retry_base_delay_ms);
        let sessions =
            SessionStore::new(config.pending_ttl_ms).with_cache_ttl_ms(config.cache_ttl_ms);
        Self {
            config,
            source,
            finder,
            store,
            sessions,
        }
    }

    pub fn store(&self) -> &JokeStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle_event(
        &mut self,
        event: &InboundEvent,
        sink: &dyn ReplySink,
    ) -> DispatchOutcome {
        self.handle_event_at(event, sink, current_unix_timestamp_ms())
            .await
    }

    /// Same as [`Self::handle_event`] with an explicit clock reading.
    pub async fn handle_event_at(
        &mut self,
        event: &InboundEvent,
        sink: &dyn ReplySink,
        now_unix_ms: u64,
    ) -> DispatchOutcome {
        self.sessions.prune_expired(now_unix_ms);
        match event {
            InboundEvent::Message {
                conversation_id,
                user_id,
                message_id,
                text,
            } => {
                self.handle_message(
                    sink,
                    *conversation_id,
                    *user_id,
                    *message_id,
                    text,
                    now_unix_ms,
                )
                .await
            }
            InboundEvent::Callback {
                conversation_id,
                callback_id,
                data,
                ..
            } => {
                self.handle_callback(sink, *conversation_id, callback_id, data, now_unix_ms)
                    .await
            }
        }
    }

    async fn handle_message(
        &mut self,
        sink: &dyn ReplySink,
        conversation: ConversationId,
        user_id: Option<i64>,
        message_id: Option<i64>,
        text: &str,
        now_unix_ms: u64,
    ) -> DispatchOutcome {
        if let Some(command) = parse_bot_command(text) {
            if let Some(previous) = self.sessions.end(conversation) {
                debug!(
                    conversation_id = %conversation,
                    pending = previous.as_str(),
                    command = command.name(),
                    "command reset pending flow"
                );
            }
            return self
                .handle_command(sink, conversation, message_id, command, now_unix_ms)
                .await;
        }

        match self.sessions.pending(conversation, now_unix_ms) {
            Some(PendingAction::AwaitingKeyword) => {
                self.handle_keyword(sink, conversation, text, now_unix_ms)
                    .await
            }
            Some(PendingAction::AwaitingCustomJoke) => {
                self.handle_custom_joke(sink, conversation, user_id, text)
                    .await
            }
            None => {
                debug!(conversation_id = %conversation, "ignoring message outside of a flow");
                DispatchOutcome::new("message", "ignored")
            }
        }
    }

    async fn handle_command(
        &mut self,
        sink: &dyn ReplySink,
        conversation: ConversationId,
        message_id: Option<i64>,
        command: BotCommand,
        now_unix_ms: u64,
    ) -> DispatchOutcome {
        let name = command.name().to_string();
        let status = match command {
            BotCommand::Start | BotCommand::Help => {
                let reply = OutboundMessage::text(conversation, welcome_text(self.config.batch_size))
                    .replying_to(message_id);
                deliver(sink, &reply).await;
                "reported"
            }
            BotCommand::Jokes => {
                self.send_batch(sink, conversation, message_id, now_unix_ms)
                    .await
            }
            BotCommand::BestJokes => {
                let records = self.store.load_all();
                let text = if records.is_empty() {
                    NO_SAVED_JOKES.to_string()
                } else {
                    render_saved_jokes(&records, self.config.list_max_chars)
                };
                deliver(
                    sink,
                    &OutboundMessage::text(conversation, text).replying_to(message_id),
                )
                .await;
                if records.is_empty() {
                    "empty"
                } else {
                    "reported"
                }
            }
            BotCommand::FindJoke => {
                deliver(sink, &OutboundMessage::text(conversation, KEYWORD_PROMPT)).await;
                self.sessions
                    .begin(conversation, PendingAction::AwaitingKeyword, now_unix_ms);
                "prompted"
            }
            BotCommand::Unknown { ref command } => {
                let reply = OutboundMessage::text(
                    conversation,
                    unknown_command_text(command, self.config.batch_size),
                )
                .replying_to(message_id);
                deliver(sink, &reply).await;
                "usage_reported"
            }
        };
        DispatchOutcome::new(name, status)
    }

    async fn send_batch(
        &mut self,
        sink: &dyn ReplySink,
        conversation: ConversationId,
        message_id: Option<i64>,
        now_unix_ms: u64,
    ) -> &'static str {
        let jokes = fetch_batch(self.source.as_ref(), self.config.batch_size).await;
        if jokes.is_empty() {
            warn!(conversation_id = %conversation, "no jokes fetched for batch");
            deliver(
                sink,
                &OutboundMessage::text(conversation, BATCH_EMPTY).replying_to(message_id),
            )
            .await;
            return "fetch_failed";
        }

        info!(conversation_id = %conversation, count = jokes.len(), "fetched joke batch");
        let reply = OutboundMessage::text(conversation, render_batch(&jokes))
            .with_keyboard(batch_keyboard(jokes.len()));
        self.sessions.store_batch(conversation, jokes, now_unix_ms);
        deliver(sink, &reply).await;
        "fetched"
    }

    async fn handle_keyword(
        &mut self,
        sink: &dyn ReplySink,
        conversation: ConversationId,
        text: &str,
        now_unix_ms: u64,
    ) -> DispatchOutcome {
        let keyword = text.trim();
        if keyword.is_empty() {
            deliver(sink, &OutboundMessage::text(conversation, EMPTY_KEYWORD)).await;
            return DispatchOutcome::new("find_joke", "rejected");
        }

        deliver(
            sink,
            &OutboundMessage::text(conversation, searching_text(keyword)),
        )
        .await;
        let search = self.finder.find(keyword).await;
        self.sessions.end(conversation);

        match search.joke {
            Some(joke) => {
                let reply = OutboundMessage::text(conversation, found_text(&joke));
                let hit_id = self.sessions.store_found(conversation, joke, now_unix_ms);
                let reply = reply.with_keyboard(found_keyboard(hit_id));
                deliver(sink, &reply).await;
                DispatchOutcome::new("find_joke", "found")
            }
            None => {
                deliver(
                    sink,
                    &OutboundMessage::text(conversation, not_found_text(keyword)),
                )
                .await;
                DispatchOutcome::new("find_joke", "not_found")
            }
        }
    }

    async fn handle_custom_joke(
        &mut self,
        sink: &dyn ReplySink,
        conversation: ConversationId,
        user_id: Option<i64>,
        text: &str,
    ) -> DispatchOutcome {
        self.sessions.end(conversation);

        let Some((setup, punchline)) = parse_custom_joke(text) else {
            deliver(
                sink,
                &OutboundMessage::text(conversation, CUSTOM_JOKE_FORMAT_ERROR),
            )
            .await;
            return DispatchOutcome::new("add_joke", "rejected");
        };
        let Some(user_id) = user_id else {
            deliver(
                sink,
                &OutboundMessage::text(conversation, CUSTOM_JOKE_ANONYMOUS),
            )
            .await;
            return DispatchOutcome::new("add_joke", "rejected");
        };

        let record = JokeRecord::from_user(&setup, &punchline, user_id);
        let (reply, status) = match self.store.append(&record) {
            Ok(()) => (CUSTOM_JOKE_SAVED, "saved"),
            Err(_) => (CUSTOM_JOKE_SAVE_FAILED, "save_failed"),
        };
        deliver(sink, &OutboundMessage::text(conversation, reply)).await;
        DispatchOutcome::new("add_joke", status)
    }

    async fn handle_callback(
        &mut self,
        sink: &dyn ReplySink,
        conversation: ConversationId,
        callback_id: &str,
        data: &str,
        now_unix_ms: u64,
    ) -> DispatchOutcome {
        match CallbackAction::parse(data) {
            CallbackAction::SaveIndex(index) => {
                let joke = self.sessions.batch_joke(conversation, index).cloned();
                let status = self
                    .save_selected(sink, callback_id, joke, STALE_BATCH_SELECTION)
                    .await;
                DispatchOutcome::new("save_joke", status)
            }
            CallbackAction::SaveFound(hit_id) => {
                let joke = self.sessions.found_joke(conversation, hit_id).cloned();
                let status = self
                    .save_selected(sink, callback_id, joke, STALE_FOUND_SELECTION)
                    .await;
                DispatchOutcome::new("save_found", status)
            }
            CallbackAction::AddJoke => {
                acknowledge(sink, callback_id, None).await;
                deliver(
                    sink,
                    &OutboundMessage::text(conversation, CUSTOM_JOKE_PROMPT),
                )
                .await;
                self.sessions
                    .begin(conversation, PendingAction::AwaitingCustomJoke, now_unix_ms);
                DispatchOutcome::new("add_joke", "prompted")
            }
            CallbackAction::Unknown(raw) => {
                warn!(conversation_id = %conversation, data = %raw, "unknown callback data");
                acknowledge(sink, callback_id, Some(UNKNOWN_CALLBACK)).await;
                DispatchOutcome::new("callback", "unknown")
            }
        }
    }

    async fn save_selected(
        &self,
        sink: &dyn ReplySink,
        callback_id: &str,
        joke: Option<Joke>,
        stale_notice: &str,
    ) -> &'static str {
        let Some(joke) = joke else {
            acknowledge(sink, callback_id, Some(stale_notice)).await;
            return "stale";
        };
        match self
            .store
            .append(&JokeRecord::from_api(&joke.setup, &joke.punchline))
        {
            Ok(()) => {
                acknowledge(sink, callback_id, Some(JOKE_SAVED)).await;
                "saved"
            }
            Err(_) => {
                acknowledge(sink, callback_id, Some(JOKE_SAVE_FAILED)).await;
                "save_failed"
            }
        }
    }
}

async fn deliver(sink: &dyn ReplySink, message: &OutboundMessage) {
    if let Err(err) = sink.send_message(message).await {
        warn!(
            conversation_id = %message.conversation_id,
            error = %err,
            "failed to deliver reply"
        );
    }
}

async fn acknowledge(sink: &dyn ReplySink, callback_id: &str, text: Option<&str>) {
    if let Err(err) = sink.answer_callback(callback_id, text).await {
        warn!(callback_id, error = %err, "failed to answer callback");
    }
}
