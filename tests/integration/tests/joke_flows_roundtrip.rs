use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use httpmock::prelude::*;
use jokebot_runtime::{
    ConversationId, DispatcherConfig, InboundEvent, JokeDispatcher, OutboundMessage, ReplySink,
};
use jokebot_source::{HttpJokeSource, HttpJokeSourceConfig};
use jokebot_store::{JokeOrigin, JokeStore};
use jokebot_telegram::{TelegramBotRuntime, TelegramBotRuntimeConfig};
use serde_json::json;
use tempfile::tempdir;
use tokio::sync::Mutex as AsyncMutex;

const CHAT: ConversationId = ConversationId(42);
const USER: i64 = 7;

#[derive(Default)]
struct RecordingSink {
    messages: AsyncMutex<Vec<OutboundMessage>>,
    callbacks: AsyncMutex<Vec<(String, Option<String>)>>,
}

impl RecordingSink {
    async fn last_text(&self) -> String {
        self.messages
            .lock()
            .await
            .last()
            .map(|message| message.text.clone())
            .unwrap_or_default()
    }

    async fn last_save_button(&self) -> String {
        self.messages
            .lock()
            .await
            .last()
            .and_then(|message| message.keyboard.first())
            .and_then(|row| row.first())
            .map(|button| button.callback_data.clone())
            .unwrap_or_default()
    }

    async fn last_callback_text(&self) -> Option<String> {
        self.callbacks
            .lock()
            .await
            .last()
            .and_then(|(_, text)| text.clone())
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send_message(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()> {
        self.callbacks
            .lock()
            .await
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}

fn http_source(server: &MockServer) -> Arc<HttpJokeSource> {
    Arc::new(
        HttpJokeSource::new(HttpJokeSourceConfig {
            endpoint: server.url("/random_joke"),
            request_timeout_ms: 2_000,
        })
        .expect("joke source"),
    )
}

fn dispatcher(server: &MockServer, jokes_path: &Path) -> JokeDispatcher {
    JokeDispatcher::new(
        DispatcherConfig {
            batch_size: 3,
            ..DispatcherConfig::default()
        },
        http_source(server),
        JokeStore::new(jokes_path),
    )
}

fn message(text: &str) -> InboundEvent {
    InboundEvent::Message {
        conversation_id: CHAT,
        user_id: Some(USER),
        message_id: Some(1),
        text: text.to_string(),
    }
}

fn callback(data: &str) -> InboundEvent {
    InboundEvent::Callback {
        conversation_id: CHAT,
        user_id: Some(USER),
        callback_id: "cb".to_string(),
        data: data.to_string(),
    }
}

#[tokio::test]
async fn integration_find_save_and_list_round_trip_through_http_source() {
    let server = MockServer::start();
    let api = server.mock(|when, then| {
        when.method(GET).path("/random_joke");
        then.status(200).json_body(json!({
            "id": 1,
            "type": "general",
            "setup": "Why did the chicken cross the road?",
            "punchline": "To get to the other side."
        }));
    });
    let temp = tempdir().expect("tempdir");
    let jokes_path = temp.path().join("best_jokes.jsonl");
    let mut bot = dispatcher(&server, &jokes_path);
    let sink = RecordingSink::default();

    bot.handle_event(&message("/find_joke"), &sink).await;
    let outcome = bot.handle_event(&message("Chicken"), &sink).await;
    assert_eq!(outcome.status, "found");
    assert!(sink.last_text().await.starts_with("Found joke:"));
    api.assert_calls(1);

    let save_button = sink.last_save_button().await;
    assert!(save_button.starts_with("save_found:"));
    let outcome = bot.handle_event(&callback(&save_button), &sink).await;
    assert_eq!(outcome.status, "saved");
    assert_eq!(
        sink.last_callback_text().await.as_deref(),
        Some("Joke saved successfully!")
    );

    bot.handle_event(&message("/best_jokes"), &sink).await;
    let listing = sink.last_text().await;
    assert!(listing.starts_with("🌟 Top Saved Jokes 🌟"));
    assert!(listing.contains("Why did the chicken cross the road? - To get to the other side."));
}

#[tokio::test]
async fn integration_keyword_search_stops_after_attempt_ceiling() {
    let server = MockServer::start();
    let api = server.mock(|when, then| {
        when.method(GET).path("/random_joke");
        then.status(200).json_body(json!({
            "setup": "What do you call a fish with no eyes?",
            "punchline": "A fsh."
        }));
    });
    let temp = tempdir().expect("tempdir");
    let mut bot = dispatcher(&server, &temp.path().join("best_jokes.jsonl"));
    let sink = RecordingSink::default();

    bot.handle_event(&message("/find_joke"), &sink).await;
    let outcome = bot.handle_event(&message("zebra"), &sink).await;

    assert_eq!(outcome.status, "not_found");
    api.assert_calls(10);
    assert!(sink.last_text().await.contains("zebra"));
}

#[tokio::test]
async fn integration_custom_jokes_survive_a_restart() {
    let server = MockServer::start();
    let temp = tempdir().expect("tempdir");
    let jokes_path = temp.path().join("best_jokes.jsonl");

    {
        let mut bot = dispatcher(&server, &jokes_path);
        let sink = RecordingSink::default();
        bot.handle_event(&callback("add_joke"), &sink).await;
        let outcome = bot
            .handle_event(&message("Why so serious? - Because tests."), &sink)
            .await;
        assert_eq!(outcome.status, "saved");
    }

    let records = JokeStore::new(&jokes_path).load_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "Why so serious? - Because tests.");
    assert_eq!(records[0].source, JokeOrigin::User);
    assert_eq!(records[0].user_id, Some(USER));

    let mut restarted = dispatcher(&server, &jokes_path);
    let sink = RecordingSink::default();
    restarted.handle_event(&message("/best_jokes"), &sink).await;
    assert!(sink
        .last_text()
        .await
        .contains("Why so serious? - Because tests."));
}

#[tokio::test]
async fn regression_batch_reports_failure_when_joke_api_is_down() {
    let server = MockServer::start();
    let api = server.mock(|when, then| {
        when.method(GET).path("/random_joke");
        then.status(500).body("upstream failure");
    });
    let temp = tempdir().expect("tempdir");
    let mut bot = dispatcher(&server, &temp.path().join("best_jokes.jsonl"));
    let sink = RecordingSink::default();

    let outcome = bot.handle_event(&message("/jokes"), &sink).await;
    assert_eq!(outcome.status, "fetch_failed");
    api.assert_calls(3);

    let outcome = bot.handle_event(&callback("save_joke:0"), &sink).await;
    assert_eq!(outcome.status, "stale");
    assert!(JokeStore::new(temp.path().join("best_jokes.jsonl"))
        .load_all()
        .is_empty());
}

#[tokio::test]
async fn integration_telegram_poll_cycle_uses_live_joke_source() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/random_joke");
        then.status(200).json_body(json!({
            "setup": "Why don't skeletons fight?",
            "punchline": "They don't have the guts."
        }));
    });
    let updates = server.mock(|when, then| {
        when.method(GET)
            .path("/bot123:abc/getUpdates")
            .query_param("offset", "0");
        then.status(200).json_body(json!({
            "ok": true,
            "result": [{
                "update_id": 900,
                "message": {
                    "message_id": 3,
                    "from": { "id": USER, "is_bot": false },
                    "chat": { "id": 42 },
                    "text": "/jokes@joke_test_bot"
                }
            }]
        }));
    });
    let batch = server.mock(|when, then| {
        when.method(POST)
            .path("/bot123:abc/sendMessage")
            .body_includes("3. Why don't skeletons fight? - They don't have the guts.")
            .body_includes("save_joke:2");
        then.status(200).json_body(json!({
            "ok": true,
            "result": { "message_id": 77, "chat": { "id": 42 } }
        }));
    });

    let temp = tempdir().expect("tempdir");
    let mut runtime = TelegramBotRuntime::new(
        TelegramBotRuntimeConfig {
            api_base: server.base_url(),
            bot_token: "123:abc".to_string(),
            poll_timeout_seconds: 0,
            request_timeout_ms: 2_000,
            retry_max_attempts: 1,
            retry_base_delay_ms: 0,
            error_backoff: Duration::from_millis(1),
            state_dir: temp.path().to_path_buf(),
        },
        dispatcher(&server, &temp.path().join("best_jokes.jsonl")),
    )
    .expect("runtime");

    let report = runtime.poll_once().await.expect("poll");
    assert_eq!(report.handled_events, 1);
    assert_eq!(runtime.next_update_offset(), 901);
    updates.assert_calls(1);
    batch.assert_calls(1);
}
