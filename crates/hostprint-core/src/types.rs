//! # Domain Types
//!
//! Records exchanged between the host file index, the printer and the
//! sync controller.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  IndexEntry     │   │ LocalFileRecord │   │DeviceFileRecord │       │
//! │  │  ─────────────  │──►│  ─────────────  │   │  ─────────────  │       │
//! │  │  date           │   │  modified       │   │  path           │       │
//! │  │  path, name     │   │  path           │   │  display        │       │
//! │  │  display        │   │  alias          │   └─────────────────┘       │
//! │  │  type_path      │   │  name           │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ SyncState: Idle → Needed → Launching → Active → Complete → Idle  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are snapshots: they are rebuilt on every query and never cached
//! across operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Host File Index Entry
// =============================================================================

/// One raw entry as reported by the host file index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Last modification time.
    pub date: DateTime<Utc>,

    /// Storage path relative to the local storage root (e.g. `prints/cube.gcode`).
    pub path: String,

    /// Raw storage name (file name component).
    pub name: String,

    /// Human-facing name; may carry a leading `/`.
    pub display: String,

    /// Type hierarchy, e.g. `["machinecode", "gcode"]`. Folders carry `["folder"]`.
    pub type_path: Vec<String>,
}

impl IndexEntry {
    /// Returns true for machine-code files (not folders, not models).
    pub fn is_gcode(&self) -> bool {
        self.type_path.iter().any(|t| t == "gcode")
    }
}

// =============================================================================
// Local File Record
// =============================================================================

/// A host file as seen by one catalog query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileRecord {
    /// Last modification time.
    pub modified: DateTime<Utc>,

    /// Storage path used to select the file for printing.
    pub path: String,

    /// Root-relative alias, always starting with `/` (e.g. `/cube_1a2b3c.gcode`).
    pub alias: String,

    /// Raw storage name.
    pub name: String,
}

impl LocalFileRecord {
    /// Alias without its leading separator, as written below the host directory.
    pub fn alias_file_name(&self) -> &str {
        self.alias.trim_start_matches('/')
    }
}

// =============================================================================
// Device File Record
// =============================================================================

/// A file on printer storage, as reported by the device listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFileRecord {
    /// Storage path on the device (e.g. `HOST/cube_1a2b3c.gcode`).
    pub path: String,

    /// Display name reported by the device (e.g. `/cube_1a2b3c.gcode`).
    pub display: String,
}

impl DeviceFileRecord {
    /// Returns true if this file lives in the given host directory.
    pub fn is_in_directory(&self, directory: &str) -> bool {
        self.path.trim_start_matches('/').starts_with(directory)
    }
}

// =============================================================================
// Sync State
// =============================================================================

/// State of the launcher sync state machine.
///
/// ## Transitions
/// ```text
/// Idle ──► Needed ──► Launching ──► Active ──► Complete ──► Idle
///   ▲        ▲            │                        │
///   │        └────────────┘ (forced on connect)    │
///   └──────────────────────────────────────────────┘ (file list refreshed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Nothing to do.
    #[default]
    Idle,
    /// A sync should run once the printer is available.
    Needed,
    /// Waiting for printer storage to become ready.
    Launching,
    /// A reconciliation pass is running.
    Active,
    /// A pass finished; waiting for the file list refresh it caused.
    Complete,
}

impl SyncState {
    /// Returns true if a file change should schedule a sync from this state.
    pub fn accepts_file_changes(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Needed)
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Idle => write!(f, "Idle"),
            SyncState::Needed => write!(f, "Needed"),
            SyncState::Launching => write!(f, "Launching"),
            SyncState::Active => write!(f, "Active"),
            SyncState::Complete => write!(f, "Complete"),
        }
    }
}

// =============================================================================
// Pass Report
// =============================================================================

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Device paths a delete was issued for.
    pub deleted: Vec<String>,

    /// Aliases a transfer was issued for.
    pub copied: Vec<String>,

    /// Error that cut the pass short, if any.
    pub error: Option<String>,

    /// When the pass reached `Complete`.
    pub completed_at: DateTime<Utc>,
}

impl PassReport {
    /// Returns true if the device already matched the host.
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty() && self.copied.is_empty() && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_state_default_is_idle() {
        assert_eq!(SyncState::default(), SyncState::Idle);
        assert_eq!(SyncState::Launching.to_string(), "Launching");
    }

    #[test]
    fn test_accepts_file_changes() {
        assert!(SyncState::Idle.accepts_file_changes());
        assert!(SyncState::Needed.accepts_file_changes());
        assert!(!SyncState::Launching.accepts_file_changes());
        assert!(!SyncState::Active.accepts_file_changes());
        assert!(!SyncState::Complete.accepts_file_changes());
    }

    #[test]
    fn test_device_file_directory() {
        let file = DeviceFileRecord {
            path: "HOST/cube_1a2b3c.gcode".into(),
            display: "/cube_1a2b3c.gcode".into(),
        };
        assert!(file.is_in_directory("HOST/"));
        assert!(!file.is_in_directory("OTHER/"));

        let rooted = DeviceFileRecord {
            path: "/HOST/cube_1a2b3c.gcode".into(),
            display: "/cube_1a2b3c.gcode".into(),
        };
        assert!(rooted.is_in_directory("HOST/"));
    }

    #[test]
    fn test_index_entry_is_gcode() {
        let mut entry = IndexEntry {
            date: Utc::now(),
            path: "a/cube.gcode".into(),
            name: "cube.gcode".into(),
            display: "cube.gcode".into(),
            type_path: vec!["machinecode".into(), "gcode".into()],
        };
        assert!(entry.is_gcode());

        entry.type_path = vec!["folder".into()];
        assert!(!entry.is_gcode());
    }
}
