//! Telegram Bot API transport for jokebot.
//!
//! Long-polls `getUpdates`, normalizes updates into dispatcher events, and
//! delivers replies through `sendMessage` and `answerCallbackQuery`.

mod telegram_runtime;

pub use telegram_runtime::{
    run_telegram_bot, PollCycleReport, TelegramBotRuntime, TelegramBotRuntimeConfig,
    DEFAULT_TELEGRAM_API_BASE,
};
