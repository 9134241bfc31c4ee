//! Slash-command, callback-data, and submission parsing.

const SAVE_INDEX_PREFIX: &str = "save_joke:";
const SAVE_FOUND_PREFIX: &str = "save_found:";
const ADD_JOKE_DATA: &str = "add_joke";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Jokes,
    BestJokes,
    FindJoke,
    Unknown { command: String },
}

impl BotCommand {
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Jokes => "jokes",
            Self::BestJokes => "best_jokes",
            Self::FindJoke => "find_joke",
            Self::Unknown { command } => command.as_str(),
        }
    }
}

/// Parses a `/command` message. Plain text returns `None`.
///
/// A `@botname` suffix is accepted and ignored, as are trailing arguments.
pub fn parse_bot_command(text: &str) -> Option<BotCommand> {
    let first = text.trim().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }
    let command = match name.to_ascii_lowercase().as_str() {
        "start" => BotCommand::Start,
        "help" => BotCommand::Help,
        "jokes" => BotCommand::Jokes,
        "best_jokes" => BotCommand::BestJokes,
        "find_joke" => BotCommand::FindJoke,
        _ => BotCommand::Unknown {
            command: name.to_string(),
        },
    };
    Some(command)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Inline-button payloads understood by the dispatcher.
pub enum CallbackAction {
    /// Save the joke at this zero-based index of the cached batch.
    SaveIndex(usize),
    /// Save the keyword-search hit with this id.
    SaveFound(u64),
    AddJoke,
    Unknown(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        let data = data.trim();
        if let Some(hit_id) = data
            .strip_prefix(SAVE_FOUND_PREFIX)
            .and_then(|raw| raw.parse::<u64>().ok())
        {
            return Self::SaveFound(hit_id);
        }
        if data == ADD_JOKE_DATA {
            return Self::AddJoke;
        }
        if let Some(index) = data
            .strip_prefix(SAVE_INDEX_PREFIX)
            .and_then(|raw| raw.parse::<usize>().ok())
        {
            return Self::SaveIndex(index);
        }
        Self::Unknown(data.to_string())
    }

    pub fn callback_data(&self) -> String {
        match self {
            Self::SaveIndex(index) => format!("{SAVE_INDEX_PREFIX}{index}"),
            Self::SaveFound(hit_id) => format!("{SAVE_FOUND_PREFIX}{hit_id}"),
            Self::AddJoke => ADD_JOKE_DATA.to_string(),
            Self::Unknown(raw) => raw.clone(),
        }
    }
}

/// Splits a `Setup - Punchline` submission on the first `" - "`.
///
/// Both halves are trimmed and must be non-empty.
pub fn parse_custom_joke(text: &str) -> Option<(String, String)> {
    let (setup, punchline) = text.split_once(" - ")?;
    let setup = setup.trim();
    let punchline = punchline.trim();
    if setup.is_empty() || punchline.is_empty() {
        return None;
    }
    Some((setup.to_string(), punchline.to_string()))
}
