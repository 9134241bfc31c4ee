//! Foundational low-level utilities shared across jokebot crates.
//!
//! Provides atomic file-write helpers, char-bounded text truncation, and the
//! time utilities used by pending-flow expiry and transport logs.

pub mod atomic_io;
pub mod text;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use text::truncate_chars;
pub use time_utils::{current_unix_timestamp_ms, is_expired_unix_ms};
