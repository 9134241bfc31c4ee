//! HTTP client for the public random-joke endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::types::{Joke, JokeSource, JokeSourceError};

pub const DEFAULT_JOKE_API_URL: &str = "https://official-joke-api.appspot.com/random_joke";

#[derive(Debug, Clone)]
pub struct HttpJokeSourceConfig {
    pub endpoint: String,
    pub request_timeout_ms: u64,
}

impl Default for HttpJokeSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_JOKE_API_URL.to_string(),
            request_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone)]
/// Fetches one random joke per `GET` against a fixed endpoint.
pub struct HttpJokeSource {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpJokeSource {
    pub fn new(config: HttpJokeSourceConfig) -> Result<Self, JokeSourceError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("jokebot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl JokeSource for HttpJokeSource {
    async fn fetch_random(&self) -> Result<Joke, JokeSourceError> {
        let response = self.http.get(&self.endpoint).send().await.map_err(|err| {
            warn!(endpoint = %self.endpoint, error = %err, "joke api request failed");
            JokeSourceError::Http(err)
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "joke api returned error status");
            return Err(JokeSourceError::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        let payload = response.json::<Value>().await?;
        parse_joke_payload(&payload)
    }
}

fn parse_joke_payload(payload: &Value) -> Result<Joke, JokeSourceError> {
    let field = |name: &str| {
        payload
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| JokeSourceError::InvalidResponse(format!("missing string field `{name}`")))
    };
    Ok(Joke {
        setup: field("setup")?,
        punchline: field("punchline")?,
    })
}

fn truncate_body(body: &str) -> String {
    body.chars().take(320).collect()
}
