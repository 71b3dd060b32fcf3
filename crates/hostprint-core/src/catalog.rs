//! # Catalog Ordering
//!
//! Turns raw host file index entries into [`LocalFileRecord`]s ordered
//! newest first, and computes the delete/copy plan of a reconciliation
//! pass.
//!
//! ## Reconciliation Plan
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  device HOST/ files          newest N local files                       │
//! │  ┌──────────────┐            ┌──────────────┐                           │
//! │  │ /a_111.gcode │            │ /a_111.gcode │  ← kept (in both)         │
//! │  │ /old_222.gc… │ ─ delete   │ /new_333.gc… │  ─ copy                   │
//! │  └──────────────┘            └──────────────┘                           │
//! │                                                                         │
//! │  remaining = device − to_delete   (logical, not re-listed)              │
//! │  to_copy   = newest whose alias ∉ remaining                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::naming::short_name;
use crate::types::{DeviceFileRecord, IndexEntry, LocalFileRecord};

/// Builds the catalog from index entries.
///
/// Keeps machine-code files only, sorts newest first (stable, so equal
/// timestamps keep index order) and truncates to `limit` when given.
pub fn latest_files<I>(entries: I, limit: Option<usize>) -> Vec<LocalFileRecord>
where
    I: IntoIterator<Item = IndexEntry>,
{
    let mut records: Vec<LocalFileRecord> = entries
        .into_iter()
        .filter(IndexEntry::is_gcode)
        .map(to_record)
        .collect();

    records.sort_by(|a, b| b.modified.cmp(&a.modified));

    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}

/// Root-relative alias for a display name.
pub fn alias_for(display: &str) -> String {
    let display = display.strip_prefix('/').unwrap_or(display);
    format!("/{}", short_name(display))
}

fn to_record(entry: IndexEntry) -> LocalFileRecord {
    LocalFileRecord {
        alias: alias_for(&entry.display),
        modified: entry.date,
        path: entry.path,
        name: entry.name,
    }
}

// =============================================================================
// Reconciliation Plan
// =============================================================================

/// Delete and copy decisions for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Device alias files no longer backed by a newest host file.
    pub to_delete: Vec<DeviceFileRecord>,

    /// Newest host files with no alias left on the device.
    pub to_copy: Vec<LocalFileRecord>,
}

impl SyncPlan {
    /// Compares device alias files against the newest host files.
    ///
    /// `device_files` must already be limited to the host directory.
    pub fn compute(device_files: &[DeviceFileRecord], newest: &[LocalFileRecord]) -> Self {
        let wanted: HashSet<&str> = newest.iter().map(|f| f.alias.as_str()).collect();

        let (to_delete, remaining): (Vec<&DeviceFileRecord>, Vec<&DeviceFileRecord>) =
            device_files
                .iter()
                .partition(|f| !wanted.contains(f.display.as_str()));

        let present: HashSet<&str> = remaining.iter().map(|f| f.display.as_str()).collect();

        let to_copy = newest
            .iter()
            .filter(|f| !present.contains(f.alias.as_str()))
            .cloned()
            .collect();

        SyncPlan {
            to_delete: to_delete.into_iter().cloned().collect(),
            to_copy,
        }
    }

    /// Returns true if nothing needs to change on the device.
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_copy.is_empty()
    }
}
