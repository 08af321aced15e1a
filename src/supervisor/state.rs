//! Restart bookkeeping persisted across process runs (`bot_state.json`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Why the last run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    /// Stopped by a termination signal.
    Graceful,
    /// The run loop failed.
    Interrupted,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::Graceful => write!(f, "graceful"),
            ShutdownReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorState {
    /// RFC 3339 time of the last save.
    #[serde(default)]
    pub last_update: Option<String>,
    /// Number of saves so far. Never reset.
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default)]
    pub shutdown_reason: Option<ShutdownReason>,
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state, starting from zero when the file is missing or broken.
    pub fn load(&self) -> SupervisorState {
        if !self.path.exists() {
            info!("No state file at {:?}, starting fresh", self.path);
            return SupervisorState::default();
        }

        let parsed = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read: {e}"))
            .and_then(|json| {
                serde_json::from_str(&json).map_err(|e| format!("Failed to parse: {e}"))
            });

        match parsed {
            Ok(state) => state,
            Err(e) => {
                warn!("State file {:?} unusable: {e}", self.path);
                SupervisorState::default()
            }
        }
    }

    /// Record a lifecycle transition, bumping the restart counter.
    pub fn save(&self, reason: ShutdownReason) -> Result<SupervisorState, String> {
        let previous = self.load();
        let state = SupervisorState {
            last_update: Some(chrono::Local::now().to_rfc3339()),
            restart_count: previous.restart_count + 1,
            shutdown_reason: Some(reason),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| format!("Failed to create dir: {e}"))?;
        }

        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| format!("Failed to serialize: {e}"))?;
        std::fs::write(&self.path, json).map_err(|e| format!("Failed to write: {e}"))?;

        info!(
            "💾 Saved state (restart_count: {}, reason: {})",
            state.restart_count, reason
        );
        Ok(state)
    }
}
