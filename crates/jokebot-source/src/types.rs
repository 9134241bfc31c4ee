use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A setup/punchline pair as returned by the remote joke API.
pub struct Joke {
    pub setup: String,
    pub punchline: String,
}

impl Joke {
    pub fn new(setup: impl Into<String>, punchline: impl Into<String>) -> Self {
        Self {
            setup: setup.into(),
            punchline: punchline.into(),
        }
    }

    /// Renders the joke as `"<setup> - <punchline>"`.
    pub fn text(&self) -> String {
        format!("{} - {}", self.setup, self.punchline)
    }

    /// Case-insensitive substring match against setup or punchline.
    ///
    /// `keyword_lower` must already be lowercase.
    pub fn mentions(&self, keyword_lower: &str) -> bool {
        self.setup.to_lowercase().contains(keyword_lower)
            || self.punchline.to_lowercase().contains(keyword_lower)
    }
}

#[derive(Debug, Error)]
/// Failure of a single remote joke request.
pub enum JokeSourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("joke api returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid joke api response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
/// Anything that can hand out one random joke per call.
pub trait JokeSource: Send + Sync {
    async fn fetch_random(&self) -> Result<Joke, JokeSourceError>;
}
