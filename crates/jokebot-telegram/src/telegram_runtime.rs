//! Telegram long-polling runtime that feeds updates through the joke dispatcher.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use jokebot_core::current_unix_timestamp_ms;
use jokebot_runtime::JokeDispatcher;
use jokebot_source::next_backoff_ms;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

mod telegram_api_client;
mod telegram_state_store;
mod telegram_updates;

use telegram_api_client::TelegramApiClient;
use telegram_state_store::{JsonlEventLog, TelegramStateStore, TelegramTransportHealth};
use telegram_updates::{normalize_update, update_id_of, NormalizedUpdate};

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const TELEGRAM_STATE_SCHEMA_VERSION: u32 = 1;
const DETACHED_CALLBACK_NOTICE: &str = "This button has expired. Send /start to begin again.";

#[derive(Debug, Clone)]
/// Runtime configuration for the Telegram polling loop.
pub struct TelegramBotRuntimeConfig {
    pub api_base: String,
    pub bot_token: String,
    pub poll_timeout_seconds: u64,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    /// Pause after a failed poll before trying again.
    pub error_backoff: Duration,
    pub state_dir: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollCycleReport {
    pub received_updates: usize,
    pub handled_events: usize,
    pub ignored_updates: usize,
    pub failed_updates: usize,
}

/// Runs the Telegram polling loop until ctrl-c.
pub async fn run_telegram_bot(
    config: TelegramBotRuntimeConfig,
    dispatcher: JokeDispatcher,
) -> Result<()> {
    let mut runtime = TelegramBotRuntime::new(config, dispatcher)?;
    runtime.run().await
}

pub struct TelegramBotRuntime {
    config: TelegramBotRuntimeConfig,
    client: TelegramApiClient,
    state_store: TelegramStateStore,
    inbound_log: JsonlEventLog,
    outbound_log: JsonlEventLog,
    dispatcher: JokeDispatcher,
}

impl TelegramBotRuntime {
    pub fn new(config: TelegramBotRuntimeConfig, dispatcher: JokeDispatcher) -> Result<Self> {
        let state_dir = config.state_dir.clone();
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("failed to create {}", state_dir.display()))?;

        let client = TelegramApiClient::new(
            config.api_base.clone(),
            config.bot_token.clone(),
            config.request_timeout_ms,
            config.poll_timeout_seconds,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;
        let state_store = TelegramStateStore::load(state_dir.join("telegram-state.json"))?;
        let inbound_log = JsonlEventLog::open(state_dir.join("inbound-events.jsonl"))?;
        let outbound_log = JsonlEventLog::open(state_dir.join("outbound-events.jsonl"))?;

        Ok(Self {
            config,
            client,
            state_store,
            inbound_log,
            outbound_log,
            dispatcher,
        })
    }

    pub fn dispatcher(&self) -> &JokeDispatcher {
        &self.dispatcher
    }

    pub fn next_update_offset(&self) -> u64 {
        self.state_store.next_update_offset()
    }

    async fn run(&mut self) -> Result<()> {
        let mut failure_streak = self.state_store.transport_health().failure_streak;
        info!(
            offset = self.state_store.next_update_offset(),
            "telegram bot polling started"
        );
        loop {
            let cycle_started = Instant::now();
            let offset = self.state_store.next_update_offset();
            let poll = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("telegram bot shutdown requested");
                    return Ok(());
                }
                poll = self.client.get_updates(offset, self.config.poll_timeout_seconds) => poll,
            };

            match poll {
                Ok(updates) => {
                    let report = self.process_updates(updates).await;
                    log_cycle(&report);
                    match self.persist_transport_health(&report, elapsed_ms(cycle_started), 0) {
                        Ok(()) => failure_streak = 0,
                        Err(error) => {
                            failure_streak = failure_streak.saturating_add(1);
                            error!(failure_streak, "failed to persist telegram state: {error:#}");
                            if self.back_off().await {
                                return Ok(());
                            }
                        }
                    }
                }
                Err(error) => {
                    failure_streak = failure_streak.saturating_add(1);
                    error!(failure_streak, "telegram getUpdates failed: {error:#}");
                    if let Err(persist_error) = self.persist_transport_health(
                        &PollCycleReport::default(),
                        elapsed_ms(cycle_started),
                        failure_streak,
                    ) {
                        warn!("failed to persist telegram state: {persist_error:#}");
                    }
                    if self.back_off().await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Sleeps for the error backoff; returns true when ctrl-c arrived first.
    async fn back_off(&self) -> bool {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("telegram bot shutdown requested");
                true
            }
            _ = tokio::time::sleep(self.config.error_backoff) => false,
        }
    }

    /// Runs a single long poll and handles every update it returns.
    pub async fn poll_once(&mut self) -> Result<PollCycleReport> {
        let cycle_started = Instant::now();
        let offset = self.state_store.next_update_offset();
        let updates = match self
            .client
            .get_updates(offset, self.config.poll_timeout_seconds)
            .await
        {
            Ok(updates) => updates,
            Err(error) => {
                let failure_streak = self
                    .state_store
                    .transport_health()
                    .failure_streak
                    .saturating_add(1);
                self.persist_transport_health(
                    &PollCycleReport::default(),
                    elapsed_ms(cycle_started),
                    failure_streak,
                )?;
                return Err(error);
            }
        };
        let report = self.process_updates(updates).await;
        self.persist_transport_health(&report, elapsed_ms(cycle_started), 0)?;
        Ok(report)
    }

    /// Handles a batch of updates. Audit log and state file failures are
    /// logged and skipped so every update is still acknowledged.
    async fn process_updates(&mut self, updates: Vec<Value>) -> PollCycleReport {
        let mut report = PollCycleReport {
            received_updates: updates.len(),
            ..PollCycleReport::default()
        };

        for update in updates {
            let update_id = update_id_of(&update);
            append_or_warn(
                &mut self.inbound_log,
                &json!({
                    "timestamp_unix_ms": current_unix_timestamp_ms(),
                    "update_id": update_id,
                    "payload": update,
                }),
            );

            match normalize_update(&update) {
                Ok(NormalizedUpdate::Event(event)) => {
                    let outcome = self.dispatcher.handle_event(&event, &self.client).await;
                    debug!(
                        update_id,
                        kind = event.kind(),
                        action = outcome.action.as_str(),
                        status = outcome.status,
                        "telegram update handled"
                    );
                    append_or_warn(
                        &mut self.outbound_log,
                        &json!({
                            "timestamp_unix_ms": current_unix_timestamp_ms(),
                            "update_id": update_id,
                            "conversation_id": event.conversation_id(),
                            "kind": event.kind(),
                            "action": outcome.action,
                            "status": outcome.status,
                        }),
                    );
                    report.handled_events = report.handled_events.saturating_add(1);
                }
                Ok(NormalizedUpdate::DetachedCallback { callback_id }) => {
                    if let Err(error) = self
                        .client
                        .answer_callback_query(&callback_id, Some(DETACHED_CALLBACK_NOTICE))
                        .await
                    {
                        warn!(update_id, "failed to answer detached callback: {error:#}");
                    }
                    report.ignored_updates = report.ignored_updates.saturating_add(1);
                }
                Ok(NormalizedUpdate::Ignored) => {
                    report.ignored_updates = report.ignored_updates.saturating_add(1);
                }
                Err(error) => {
                    warn!(update_id, "failed to decode telegram update: {error:#}");
                    report.failed_updates = report.failed_updates.saturating_add(1);
                }
            }

            // Advance per update so a crash mid-batch never replays handled ones.
            if let Some(update_id) = update_id {
                if self.state_store.acknowledge_update(update_id) {
                    if let Err(error) = self.state_store.save() {
                        warn!(update_id, "failed to persist telegram offset: {error:#}");
                    }
                }
            }
        }
        report
    }

    fn persist_transport_health(
        &mut self,
        report: &PollCycleReport,
        cycle_duration_ms: u64,
        failure_streak: usize,
    ) -> Result<()> {
        let total_handled = self
            .state_store
            .transport_health()
            .total_handled
            .saturating_add(report.handled_events as u64);
        let snapshot = TelegramTransportHealth {
            updated_unix_ms: current_unix_timestamp_ms(),
            cycle_duration_ms,
            failure_streak,
            last_cycle_received: report.received_updates,
            last_cycle_handled: report.handled_events,
            last_cycle_ignored: report.ignored_updates,
            last_cycle_failed: report.failed_updates,
            total_handled,
        };
        if self.state_store.update_transport_health(snapshot) {
            self.state_store.save()?;
        }
        Ok(())
    }
}

fn append_or_warn(log: &mut JsonlEventLog, event: &Value) {
    if let Err(error) = log.append(event) {
        warn!(log = %log.path().display(), "failed to append event log: {error:#}");
    }
}

fn log_cycle(report: &PollCycleReport) {
    if report.received_updates == 0 {
        return;
    }
    info!(
        received = report.received_updates,
        handled = report.handled_events,
        ignored = report.ignored_updates,
        failed = report.failed_updates,
        "telegram poll cycle"
    );
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn is_retryable_telegram_status(status: u16) -> bool {
    status == 429 || status >= 500
}

fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Exponential backoff, stretched to honor Telegram's `retry_after` hint.
fn retry_delay(base_delay_ms: u64, attempt: usize, retry_after_seconds: Option<u64>) -> Duration {
    let backoff_ms = next_backoff_ms(base_delay_ms, attempt);
    let hinted_ms = retry_after_seconds
        .unwrap_or(0)
        .saturating_mul(1_000);
    Duration::from_millis(backoff_ms.max(hinted_ms))
}

fn truncate_for_error(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
