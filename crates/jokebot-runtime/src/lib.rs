//! Transport-agnostic conversation runtime for jokebot.
//!
//! The dispatcher turns normalized inbound events into store writes, remote
//! joke lookups, and outbound replies. Transports supply events and implement
//! [`ReplySink`].

mod commands;
mod dispatcher;
mod events;
mod render;
mod session;

pub use commands::{parse_bot_command, parse_custom_joke, BotCommand, CallbackAction};
pub use dispatcher::{DispatchOutcome, DispatcherConfig, JokeDispatcher};
pub use events::{InboundEvent, InlineButton, OutboundMessage, ReplySink};
pub use render::{render_saved_jokes, welcome_text, SAVED_JOKES_MAX_CHARS};
pub use session::{
    ConversationId, PendingAction, SessionStore, DEFAULT_CACHE_TTL_MS, MAX_FOUND_HITS,
};
