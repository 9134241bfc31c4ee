use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use jokebot_core::write_text_atomic;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TELEGRAM_STATE_SCHEMA_VERSION;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Health counters for the most recent poll cycle.
pub(super) struct TelegramTransportHealth {
    pub(super) updated_unix_ms: u64,
    pub(super) cycle_duration_ms: u64,
    pub(super) failure_streak: usize,
    pub(super) last_cycle_received: usize,
    pub(super) last_cycle_handled: usize,
    pub(super) last_cycle_ignored: usize,
    pub(super) last_cycle_failed: usize,
    pub(super) total_handled: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TelegramBotState {
    schema_version: u32,
    #[serde(default)]
    next_update_offset: Option<u64>,
    #[serde(default)]
    health: TelegramTransportHealth,
}

impl Default for TelegramBotState {
    fn default() -> Self {
        Self {
            schema_version: TELEGRAM_STATE_SCHEMA_VERSION,
            next_update_offset: None,
            health: TelegramTransportHealth::default(),
        }
    }
}

pub(super) struct TelegramStateStore {
    path: PathBuf,
    state: TelegramBotState,
}

impl TelegramStateStore {
    pub(super) fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read state file {}", path.display()))?;
            serde_json::from_str::<TelegramBotState>(&raw).with_context(|| {
                format!("failed to parse telegram state file {}", path.display())
            })?
        } else {
            TelegramBotState::default()
        };

        if state.schema_version != TELEGRAM_STATE_SCHEMA_VERSION {
            bail!(
                "unsupported telegram state schema: expected {}, found {}",
                TELEGRAM_STATE_SCHEMA_VERSION,
                state.schema_version
            );
        }
        Ok(Self { path, state })
    }

    pub(super) fn next_update_offset(&self) -> u64 {
        self.state.next_update_offset.unwrap_or(0)
    }

    /// Acknowledges `update_id`; returns false when the offset did not move.
    pub(super) fn acknowledge_update(&mut self, update_id: u64) -> bool {
        let next = update_id.saturating_add(1);
        if next <= self.next_update_offset() {
            return false;
        }
        self.state.next_update_offset = Some(next);
        true
    }

    pub(super) fn transport_health(&self) -> &TelegramTransportHealth {
        &self.state.health
    }

    pub(super) fn update_transport_health(&mut self, value: TelegramTransportHealth) -> bool {
        if self.state.health == value {
            return false;
        }
        self.state.health = value;
        true
    }

    pub(super) fn save(&self) -> Result<()> {
        let mut payload =
            serde_json::to_string_pretty(&self.state).context("failed to serialize state")?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload)
            .with_context(|| format!("failed to write state file {}", self.path.display()))?;
        Ok(())
    }
}

/// Append-only audit trail of inbound updates or handled outcomes, one JSON
/// object per line.
pub(super) struct JsonlEventLog {
    path: PathBuf,
    file: File,
}

impl JsonlEventLog {
    pub(super) fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open event log {}", path.display()))?;
        Ok(Self { path, file })
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the event and its trailing newline in one call.
    pub(super) fn append(&mut self, event: &Value) -> Result<()> {
        let mut line = serde_json::to_vec(event).context("failed to encode log event")?;
        line.push(b'\n');
        self.file
            .write_all(&line)
            .with_context(|| format!("failed to append to {}", self.path.display()))
    }
}
