use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Provenance of a saved joke.
pub enum JokeOrigin {
    #[default]
    Api,
    User,
}

impl JokeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One persisted joke entry.
pub struct JokeRecord {
    pub text: String,
    pub source: JokeOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl JokeRecord {
    /// Builds a record for a joke relayed from the remote joke API.
    pub fn from_api(setup: &str, punchline: &str) -> Self {
        Self {
            text: render_joke_text(setup, punchline),
            source: JokeOrigin::Api,
            user_id: None,
        }
    }

    /// Builds a record for a joke submitted by a chat user.
    pub fn from_user(setup: &str, punchline: &str, user_id: i64) -> Self {
        Self {
            text: render_joke_text(setup, punchline),
            source: JokeOrigin::User,
            user_id: Some(user_id),
        }
    }

    /// Decodes one stored line leniently.
    ///
    /// Only a string `text` field is required; a missing or unknown `source`
    /// falls back to `api` and a non-integer `user_id` is dropped.
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = object.get("text")?.as_str()?.to_string();
        let source = object
            .get("source")
            .cloned()
            .and_then(|raw| serde_json::from_value::<JokeOrigin>(raw).ok())
            .unwrap_or_default();
        let user_id = object.get("user_id").and_then(Value::as_i64);
        Some(Self {
            text,
            source,
            user_id,
        })
    }
}

fn render_joke_text(setup: &str, punchline: &str) -> String {
    format!("{setup} - {punchline}")
}
