use std::path::PathBuf;

use clap::Parser;
use jokebot_source::{DEFAULT_JOKE_API_URL, DEFAULT_MAX_SEARCH_ATTEMPTS};
use jokebot_telegram::DEFAULT_TELEGRAM_API_BASE;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_non_blank(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("value cannot be blank".to_string());
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Parser)]
#[command(
    name = "jokebot",
    about = "Telegram joke bot with keyword search and a saved-jokes log",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "telegram-bot-token",
        env = "JOKEBOT_TELEGRAM_BOT_TOKEN",
        hide_env_values = true,
        value_parser = parse_non_blank,
        help = "Telegram bot token issued by BotFather."
    )]
    pub(crate) telegram_bot_token: String,

    #[arg(
        long = "telegram-api-base",
        env = "JOKEBOT_TELEGRAM_API_BASE",
        default_value = DEFAULT_TELEGRAM_API_BASE,
        help = "Base URL of the Telegram Bot API."
    )]
    pub(crate) telegram_api_base: String,

    #[arg(
        long = "telegram-poll-timeout-seconds",
        env = "JOKEBOT_TELEGRAM_POLL_TIMEOUT_SECONDS",
        default_value_t = 30,
        help = "Long-poll timeout passed to getUpdates."
    )]
    pub(crate) telegram_poll_timeout_seconds: u64,

    #[arg(
        long = "telegram-error-backoff-ms",
        env = "JOKEBOT_TELEGRAM_ERROR_BACKOFF_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Delay before polling again after a failed getUpdates call."
    )]
    pub(crate) telegram_error_backoff_ms: u64,

    #[arg(
        long = "telegram-request-timeout-ms",
        env = "JOKEBOT_TELEGRAM_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout for Telegram API calls, added on top of the long-poll window."
    )]
    pub(crate) telegram_request_timeout_ms: u64,

    #[arg(
        long = "state-dir",
        env = "JOKEBOT_STATE_DIR",
        default_value = ".jokebot",
        help = "Directory for transport state and event logs."
    )]
    pub(crate) state_dir: PathBuf,

    #[arg(
        long = "jokes-file",
        env = "JOKEBOT_JOKES_FILE",
        help = "Saved-jokes log. Defaults to <state-dir>/best_jokes.jsonl."
    )]
    pub(crate) jokes_file: Option<PathBuf>,

    #[arg(
        long = "joke-api-url",
        env = "JOKEBOT_JOKE_API_URL",
        default_value = DEFAULT_JOKE_API_URL,
        help = "Endpoint returning one random joke as {setup, punchline}."
    )]
    pub(crate) joke_api_url: String,

    #[arg(
        long = "joke-request-timeout-ms",
        env = "JOKEBOT_JOKE_REQUEST_TIMEOUT_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Timeout for a single joke API request."
    )]
    pub(crate) joke_request_timeout_ms: u64,

    #[arg(
        long = "search-max-attempts",
        env = "JOKEBOT_SEARCH_MAX_ATTEMPTS",
        default_value_t = DEFAULT_MAX_SEARCH_ATTEMPTS,
        value_parser = parse_positive_usize,
        help = "Random jokes fetched per keyword search before giving up."
    )]
    pub(crate) search_max_attempts: usize,

    #[arg(
        long = "search-retry-base-delay-ms",
        env = "JOKEBOT_SEARCH_RETRY_BASE_DELAY_MS",
        default_value_t = 0,
        help = "Backoff base after a failed search fetch. 0 disables backoff."
    )]
    pub(crate) search_retry_base_delay_ms: u64,

    #[arg(
        long = "batch-size",
        env = "JOKEBOT_BATCH_SIZE",
        default_value_t = 4,
        value_parser = parse_positive_usize,
        help = "Jokes shown per /jokes batch."
    )]
    pub(crate) batch_size: usize,

    #[arg(
        long = "list-max-chars",
        env = "JOKEBOT_LIST_MAX_CHARS",
        default_value_t = 4_000,
        value_parser = parse_positive_usize,
        help = "Character ceiling for the /best_jokes listing."
    )]
    pub(crate) list_max_chars: usize,

    #[arg(
        long = "pending-ttl-seconds",
        env = "JOKEBOT_PENDING_TTL_SECONDS",
        default_value_t = 900,
        help = "Seconds a keyword or custom-joke prompt stays open. 0 keeps it open."
    )]
    pub(crate) pending_ttl_seconds: u64,

    #[arg(
        long = "cache-ttl-seconds",
        env = "JOKEBOT_CACHE_TTL_SECONDS",
        default_value_t = 3_600,
        value_parser = parse_positive_u64,
        help = "Seconds a /jokes batch or search hit stays saveable."
    )]
    pub(crate) cache_ttl_seconds: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "JOKEBOT_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per Telegram API call for rate limits and server errors."
    )]
    pub(crate) retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "JOKEBOT_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Backoff base for Telegram API retries."
    )]
    pub(crate) retry_base_delay_ms: u64,
}

impl Cli {
    pub(crate) fn jokes_file_path(&self) -> PathBuf {
        self.jokes_file
            .clone()
            .unwrap_or_else(|| self.state_dir.join("best_jokes.jsonl"))
    }
}
