//! Persisted "next refinement index" used by single-step sessions.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const COUNTER_KEY: &str = "nextRefinementIndex";

#[derive(Debug, Error)]
enum PersistenceError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("state file {path} is not a JSON object")]
    Corrupt { path: PathBuf },
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// JSON state file holding the counter under [`COUNTER_KEY`].
///
/// Every failure is recovered: reads fall back to `1`, writes are logged and dropped.
/// Other keys in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct CounterStore {
    path: PathBuf,
}

impl CounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> u32 {
        match self.read_state().await {
            Ok(Some(state)) => match state.get(COUNTER_KEY).and_then(parse_counter) {
                Some(value) => value,
                None => {
                    debug!(path = %self.path.display(), "no usable counter stored; starting at 1");
                    1
                }
            },
            Ok(None) => 1,
            Err(err) => {
                warn!(error = %err, "counter state unavailable; starting at 1");
                1
            }
        }
    }

    pub async fn save(&self, value: u32) {
        if let Err(err) = self.write_counter(value).await {
            warn!(error = %err, value, "failed to persist refinement counter");
        }
    }

    pub async fn reset(&self) -> u32 {
        self.save(1).await;
        1
    }

    async fn read_state(&self) -> Result<Option<Map<String, Value>>, PersistenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            _ => Err(PersistenceError::Corrupt {
                path: self.path.clone(),
            }),
        }
    }

    async fn write_counter(&self, value: u32) -> Result<(), PersistenceError> {
        let mut state = self.read_state().await.ok().flatten().unwrap_or_default();
        state.insert(COUNTER_KEY.to_string(), Value::from(value));
        let encoded = serde_json::to_string_pretty(&Value::Object(state))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistenceError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, encoded)
            .await
            .map_err(|source| PersistenceError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Accepts a positive integer stored either as a number or as a numeric string.
fn parse_counter(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(parsed).ok().filter(|v| *v >= 1)
}

#[cfg(test)]
#[path = "tests/counter_store_tests.rs"]
mod tests;
