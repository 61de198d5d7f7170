//! Snapshot storage.
//!
//! A snapshot is the JSON form of [`GameState`] wrapped in standard Base64.
//! Plain JSON is accepted on load as well. Nothing read from disk is trusted
//! until it passes the validator, and a snapshot that cannot be repaired
//! comes back as the initial state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chronos_core::{sanitize, validate_integrity, GameState};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How a loaded snapshot came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreKind {
    Intact,
    Repaired,
    Reset,
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub state: GameState,
    pub kind: RestoreKind,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn save(&self, state: &GameState) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        fs::write(&self.path, encode_snapshot(state)?).map_err(|source| self.io_error(source))?;
        info!(
            target: "chronos_session.persistence",
            path = %self.path.display(),
            turn = state.turn_count,
            "snapshot saved"
        );
        Ok(())
    }

    /// Reads the snapshot; a missing file yields the initial state.
    pub fn load(&self) -> Result<Restored, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Restored {
                    state: GameState::initial(),
                    kind: RestoreKind::Missing,
                })
            }
            Err(source) => return Err(self.io_error(source)),
        };
        let restored = decode_snapshot(&raw);
        info!(
            target: "chronos_session.persistence",
            path = %self.path.display(),
            kind = ?restored.kind,
            "snapshot loaded"
        );
        Ok(restored)
    }

    pub fn clear(&self) -> Result<(), PersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

pub fn encode_snapshot(state: &GameState) -> Result<String, serde_json::Error> {
    Ok(STANDARD.encode(serde_json::to_vec(state)?))
}

/// Decodes Base64 or plain JSON, then validates, then sanitizes, then gives
/// up and resets. Loading flags are always cleared.
pub fn decode_snapshot(raw: &str) -> Restored {
    let raw = raw.trim();
    let json = STANDARD
        .decode(raw)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string());

    let Ok(value) = serde_json::from_str::<Value>(&json) else {
        warn!(target: "chronos_session.persistence", "snapshot is not JSON; resetting");
        return finish(GameState::initial(), RestoreKind::Reset);
    };

    if let Ok(state) = serde_json::from_value::<GameState>(value.clone()) {
        if validate_integrity(&state) {
            return finish(state, RestoreKind::Intact);
        }
    }
    match sanitize(value) {
        Some(state) => {
            warn!(target: "chronos_session.persistence", "snapshot repaired");
            finish(state, RestoreKind::Repaired)
        }
        None => {
            warn!(target: "chronos_session.persistence", "snapshot unrecoverable; resetting");
            finish(GameState::initial(), RestoreKind::Reset)
        }
    }
}

fn finish(state: GameState, kind: RestoreKind) -> Restored {
    Restored {
        state: GameState {
            is_loading: false,
            image_loading: false,
            ..state
        },
        kind,
    }
}
