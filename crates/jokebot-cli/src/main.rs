mod bootstrap_helpers;
mod cli_args;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use jokebot_runtime::{DispatcherConfig, JokeDispatcher};
use jokebot_source::{HttpJokeSource, HttpJokeSourceConfig};
use jokebot_store::JokeStore;
use jokebot_telegram::{run_telegram_bot, TelegramBotRuntimeConfig};
use tracing::info;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let dispatcher = build_dispatcher(&cli)?;
    info!(
        jokes_file = %dispatcher.store().path().display(),
        state_dir = %cli.state_dir.display(),
        "starting jokebot"
    );
    run_telegram_bot(build_runtime_config(&cli), dispatcher).await
}

fn build_dispatcher(cli: &Cli) -> Result<JokeDispatcher> {
    let source = HttpJokeSource::new(HttpJokeSourceConfig {
        endpoint: cli.joke_api_url.clone(),
        request_timeout_ms: cli.joke_request_timeout_ms,
    })
    .context("failed to create joke api client")?;

    let store = JokeStore::new(cli.jokes_file_path());
    store
        .ensure_exists()
        .context("failed to prepare saved-jokes file")?;

    Ok(JokeDispatcher::new(
        dispatcher_config(cli),
        Arc::new(source),
        store,
    ))
}

fn dispatcher_config(cli: &Cli) -> DispatcherConfig {
    DispatcherConfig {
        batch_size: cli.batch_size,
        list_max_chars: cli.list_max_chars,
        search_max_attempts: cli.search_max_attempts,
        search_retry_base_delay_ms: cli.search_retry_base_delay_ms,
        pending_ttl_ms: cli.pending_ttl_seconds.saturating_mul(1_000),
        cache_ttl_ms: cli.cache_ttl_seconds.saturating_mul(1_000),
    }
}

fn build_runtime_config(cli: &Cli) -> TelegramBotRuntimeConfig {
    TelegramBotRuntimeConfig {
        api_base: cli.telegram_api_base.clone(),
        bot_token: cli.telegram_bot_token.clone(),
        poll_timeout_seconds: cli.telegram_poll_timeout_seconds,
        request_timeout_ms: cli.telegram_request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
        error_backoff: Duration::from_millis(cli.telegram_error_backoff_ms),
        state_dir: cli.state_dir.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use tempfile::tempdir;

    use super::{build_dispatcher, build_runtime_config, dispatcher_config};
    use crate::cli_args::Cli;

    #[test]
    fn unit_dispatcher_config_converts_ttl_to_millis() {
        let cli = Cli::try_parse_from([
            "jokebot",
            "--telegram-bot-token",
            "t",
            "--pending-ttl-seconds",
            "60",
            "--batch-size",
            "6",
        ])
        .expect("parse cli");
        let config = dispatcher_config(&cli);
        assert_eq!(config.pending_ttl_ms, 60_000);
        assert_eq!(config.batch_size, 6);
        assert_eq!(config.cache_ttl_ms, 3_600_000);
    }

    #[test]
    fn regression_telegram_client_uses_its_own_request_timeout() {
        let cli = Cli::try_parse_from([
            "jokebot",
            "--telegram-bot-token",
            "t",
            "--joke-request-timeout-ms",
            "1500",
            "--telegram-request-timeout-ms",
            "20000",
        ])
        .expect("parse cli");
        assert_eq!(build_runtime_config(&cli).request_timeout_ms, 20_000);
        assert_eq!(cli.joke_request_timeout_ms, 1_500);
    }

    #[test]
    fn functional_build_dispatcher_creates_jokes_file() {
        let temp = tempdir().expect("tempdir");
        let state_dir = temp.path().join("state");
        let cli = Cli::try_parse_from([
            "jokebot",
            "--telegram-bot-token",
            "t",
            "--state-dir",
            state_dir.to_str().expect("utf-8 path"),
        ])
        .expect("parse cli");

        let dispatcher = build_dispatcher(&cli).expect("build dispatcher");
        assert!(state_dir.join("best_jokes.jsonl").is_file());
        assert!(dispatcher.store().load_all().is_empty());

        let runtime = build_runtime_config(&cli);
        assert_eq!(runtime.state_dir, state_dir);
        assert_eq!(runtime.error_backoff, Duration::from_millis(5_000));
    }
}
