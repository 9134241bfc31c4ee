//! Remote joke source access for jokebot.
//!
//! Hosts the [`JokeSource`] seam, the HTTP client for the public joke API,
//! batch fetching, and the bounded-attempt keyword search.
mod batch;
mod http;
mod keyword;
mod retry;
mod types;

pub use batch::fetch_batch;
pub use http::{HttpJokeSource, HttpJokeSourceConfig, DEFAULT_JOKE_API_URL};
pub use keyword::{KeywordFinder, KeywordSearch, DEFAULT_MAX_SEARCH_ATTEMPTS};
pub use retry::{next_backoff_ms, MAX_BACKOFF_MS};
pub use types::{Joke, JokeSource, JokeSourceError};
