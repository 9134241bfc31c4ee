//! User-facing reply text and keyboards.

use jokebot_core::truncate_chars;
use jokebot_source::Joke;
use jokebot_store::JokeRecord;

use crate::commands::CallbackAction;
use crate::events::InlineButton;

/// Message-size ceiling applied to the saved-jokes listing.
pub const SAVED_JOKES_MAX_CHARS: usize = 4_000;

pub(crate) const KEYWORD_PROMPT: &str = "Please enter a keyword to search:";
pub(crate) const EMPTY_KEYWORD: &str = "Please enter a valid keyword.";
pub(crate) const CUSTOM_JOKE_PROMPT: &str = "Send your joke in format:\nSetup - Punchline";
pub(crate) const CUSTOM_JOKE_FORMAT_ERROR: &str = "Invalid format. Please use: Setup - Punchline";
pub(crate) const CUSTOM_JOKE_SAVED: &str = "Your joke has been saved!";
pub(crate) const CUSTOM_JOKE_SAVE_FAILED: &str =
    "Sorry, I couldn't save your joke right now. Please try again later.";
pub(crate) const CUSTOM_JOKE_ANONYMOUS: &str =
    "I couldn't tell who sent this joke, so it was not saved.";
pub(crate) const BATCH_EMPTY: &str = "Couldn't fetch any jokes. Please try again later.";
pub(crate) const NO_SAVED_JOKES: &str = "No saved jokes yet. Be the first to add one!";
pub(crate) const JOKE_SAVED: &str = "Joke saved successfully!";
pub(crate) const JOKE_SAVE_FAILED: &str = "Couldn't save the joke. Please try again later.";
pub(crate) const STALE_BATCH_SELECTION: &str =
    "That joke is no longer available. Use /jokes to get a fresh batch.";
pub(crate) const STALE_FOUND_SELECTION: &str =
    "That joke is no longer available. Use /find_joke to search again.";
pub(crate) const UNKNOWN_CALLBACK: &str = "This button is no longer supported.";

pub fn welcome_text(batch_size: usize) -> String {
    [
        "ദ്ദി •⩊• )".to_string(),
        String::new(),
        "Hi! I'm JokesBot".to_string(),
        "Available commands:".to_string(),
        format!("/jokes - Get {batch_size} random jokes"),
        "/best_jokes - Show saved jokes".to_string(),
        "/find_joke - Search joke by keyword".to_string(),
    ]
    .join("\n")
}

pub(crate) fn unknown_command_text(command: &str, batch_size: usize) -> String {
    format!(
        "Unknown command `/{command}`.\n\n{}",
        welcome_text(batch_size)
    )
}

pub(crate) fn render_batch(jokes: &[Joke]) -> String {
    let mut text = "Here are your jokes:".to_string();
    for (index, joke) in jokes.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", index + 1, joke.text()));
    }
    text
}

/// Telegram rejects keyboard rows wider than eight buttons.
const BATCH_BUTTONS_PER_ROW: usize = 4;

/// Numbered save buttons in rows, then an "Add Your Own" row.
pub(crate) fn batch_keyboard(count: usize) -> Vec<Vec<InlineButton>> {
    let numbers = (0..count)
        .map(|index| {
            InlineButton::new(
                (index + 1).to_string(),
                CallbackAction::SaveIndex(index).callback_data(),
            )
        })
        .collect::<Vec<_>>();
    let mut rows = numbers
        .chunks(BATCH_BUTTONS_PER_ROW)
        .map(<[InlineButton]>::to_vec)
        .collect::<Vec<_>>();
    rows.push(vec![InlineButton::new(
        "Add Your Own",
        CallbackAction::AddJoke.callback_data(),
    )]);
    rows
}

pub(crate) fn searching_text(keyword: &str) -> String {
    format!("Searching for jokes with '{keyword}'...")
}

pub(crate) fn found_text(joke: &Joke) -> String {
    format!("Found joke:\n\n{}", joke.text())
}

pub(crate) fn found_keyboard(hit_id: u64) -> Vec<Vec<InlineButton>> {
    vec![vec![InlineButton::new(
        "Save Joke",
        CallbackAction::SaveFound(hit_id).callback_data(),
    )]]
}

pub(crate) fn not_found_text(keyword: &str) -> String {
    format!("No jokes found containing '{keyword}'. Try another word.")
}

/// Numbered listing of saved jokes, cut to at most `max_chars` characters.
pub fn render_saved_jokes(records: &[JokeRecord], max_chars: usize) -> String {
    let body = records
        .iter()
        .enumerate()
        .map(|(index, record)| format!("{}. {}", index + 1, record.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&format!("🌟 Top Saved Jokes 🌟\n\n{body}"), max_chars)
}
