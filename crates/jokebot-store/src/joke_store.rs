use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::record::JokeRecord;

#[derive(Debug, Error)]
/// Failures surfaced by [`JokeStore`] writes.
pub enum JokeStoreError {
    #[error("failed to {action} joke store {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode joke record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Line-delimited JSON log of saved jokes.
///
/// Assumes a single writer process; there is no file locking.
#[derive(Debug, Clone)]
pub struct JokeStore {
    path: PathBuf,
}

impl JokeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory and an empty log if they are missing.
    pub fn ensure_exists(&self) -> Result<(), JokeStoreError> {
        self.create_parent_dir()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error("create", source))?;
        Ok(())
    }

    /// Appends one record as a single JSON line.
    ///
    /// Errors are logged here and returned so the caller can tell the user;
    /// nothing is retried.
    pub fn append(&self, record: &JokeRecord) -> Result<(), JokeStoreError> {
        let result = self.append_line(record);
        match &result {
            Ok(()) => debug!(
                path = %self.path.display(),
                source = record.source.as_str(),
                "appended joke record"
            ),
            Err(err) => error!(path = %self.path.display(), error = %err, "failed to save joke"),
        }
        result
    }

    fn append_line(&self, record: &JokeRecord) -> Result<(), JokeStoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.create_parent_dir()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error("open", source))?;
        // One write call per record keeps a torn write confined to this line.
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error("write", source))?;
        file.flush().map_err(|source| self.io_error("flush", source))?;
        Ok(())
    }

    /// Reads every well-formed record in file order.
    ///
    /// Missing file yields an empty list. Lines that are not JSON objects with
    /// a string `text` field are skipped with a warning. A read error stops
    /// the scan and returns what was loaded so far.
    pub fn load_all(&self) -> Vec<JokeRecord> {
        if !self.path.exists() {
            return Vec::new();
        }
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "failed to open joke store");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    error!(
                        path = %self.path.display(),
                        line = index + 1,
                        error = %err,
                        "failed to read joke store"
                    );
                    break;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => match JokeRecord::from_value(&value) {
                    Some(record) => records.push(record),
                    None => warn!(
                        path = %self.path.display(),
                        line = index + 1,
                        "skipping joke record without text"
                    ),
                },
                Err(err) => warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    error = %err,
                    "skipping invalid JSON line"
                ),
            }
        }
        records
    }

    fn create_parent_dir(&self) -> Result<(), JokeStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| JokeStoreError::Io {
                    action: "create directory for",
                    path: self.path.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    fn io_error(&self, action: &'static str, source: std::io::Error) -> JokeStoreError {
        JokeStoreError::Io {
            action,
            path: self.path.clone(),
            source,
        }
    }
}
