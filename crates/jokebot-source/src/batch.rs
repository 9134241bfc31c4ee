use tracing::warn;

use crate::types::{Joke, JokeSource};

/// Requests `count` independent jokes and keeps the successes in order.
///
/// Every request may fail on its own; fewer than `count` jokes is a normal
/// outcome and an empty result means every request failed.
pub async fn fetch_batch(source: &dyn JokeSource, count: usize) -> Vec<Joke> {
    let mut jokes = Vec::with_capacity(count);
    for attempt in 1..=count {
        match source.fetch_random().await {
            Ok(joke) => jokes.push(joke),
            Err(err) => warn!(attempt, error = %err, "batch joke request failed"),
        }
    }
    jokes
}
