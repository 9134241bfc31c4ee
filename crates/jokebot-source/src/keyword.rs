//! Bounded keyword search over a random-joke source.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::retry::next_backoff_ms;
use crate::types::{Joke, JokeSource};

pub const DEFAULT_MAX_SEARCH_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of one keyword search.
pub struct KeywordSearch {
    pub joke: Option<Joke>,
    pub attempts: usize,
}

#[derive(Clone)]
/// Samples random jokes until one mentions the keyword or the attempt
/// ceiling is reached.
///
/// Search quality is bounded by luck: a keyword absent from the remote corpus
/// always burns the full ceiling.
pub struct KeywordFinder {
    source: Arc<dyn JokeSource>,
    max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl KeywordFinder {
    pub fn new(source: Arc<dyn JokeSource>, max_attempts: usize) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
            retry_base_delay_ms: 0,
        }
    }

    /// Sleeps with exponential backoff after each failed request.
    pub fn with_retry_base_delay_ms(mut self, retry_base_delay_ms: u64) -> Self {
        self.retry_base_delay_ms = retry_base_delay_ms;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub async fn find(&self, keyword: &str) -> KeywordSearch {
        let keyword_lower = keyword.trim().to_lowercase();
        let mut consecutive_failures = 0_usize;
        for attempt in 1..=self.max_attempts {
            match self.source.fetch_random().await {
                Ok(joke) => {
                    consecutive_failures = 0;
                    if joke.mentions(&keyword_lower) {
                        info!(keyword = %keyword_lower, attempt, "keyword search matched");
                        return KeywordSearch {
                            joke: Some(joke),
                            attempts: attempt,
                        };
                    }
                    debug!(keyword = %keyword_lower, attempt, "joke did not match keyword");
                }
                Err(err) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    warn!(keyword = %keyword_lower, attempt, error = %err, "keyword search request failed");
                    let delay_ms = next_backoff_ms(self.retry_base_delay_ms, consecutive_failures);
                    if delay_ms > 0 && attempt < self.max_attempts {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
            }
        }
        info!(keyword = %keyword_lower, attempts = self.max_attempts, "keyword search exhausted");
        KeywordSearch {
            joke: None,
            attempts: self.max_attempts,
        }
    }
}
