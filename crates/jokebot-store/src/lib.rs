//! Append-only storage for saved jokes.
//!
//! Jokes are kept as newline-delimited JSON records. Each line stands on its
//! own, so a torn final write corrupts at most one record and loading skips it.

mod joke_store;
mod record;

pub use joke_store::{JokeStore, JokeStoreError};
pub use record::{JokeOrigin, JokeRecord};
