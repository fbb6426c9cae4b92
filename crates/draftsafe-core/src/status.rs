//! Observable save status.

use crate::clock::Millis;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Phase of the remote save state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

/// Snapshot of where a document stands relative to its remote copy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatus {
    #[serde(rename = "status")]
    pub state: SaveState,
    /// Epoch milliseconds of the last successful remote save.
    pub last_saved: Option<Millis>,
    pub error: Option<String>,
    pub has_unsaved_changes: bool,
}

impl SaveStatus {
    pub fn is_saving(&self) -> bool {
        self.state == SaveState::Saving
    }

    pub fn is_error(&self) -> bool {
        self.state == SaveState::Error
    }

    /// One-line description for a status bar.
    pub fn summary(&self) -> String {
        match self.state {
            SaveState::Saving => "Saving...".to_string(),
            SaveState::Saved => match self.last_saved.and_then(format_time) {
                Some(at) => format!("Saved {}", at),
                None => "Saved".to_string(),
            },
            SaveState::Error => format!("Error: {}", self.error.as_deref().unwrap_or("")),
            SaveState::Idle if self.has_unsaved_changes => "Unsaved changes".to_string(),
            SaveState::Idle => "All changes saved".to_string(),
        }
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

fn format_time(ms: Millis) -> Option<String> {
    Local
        .timestamp_millis_opt(ms as i64)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
}
