//! # Printer Collaborator
//!
//! The printer is an external collaborator: connection lifecycle, state
//! queries, storage listing and a fire-and-forget command channel.
//!
//! ## Command Channel Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  host ──send([M30 a, M28 b, M117 …, M118 …, M29])──► printer queue       │
//! │        ◄──────────── Ok(()) = queued, NOT executed ────────────          │
//! │                                                                         │
//! │  • No per-command acknowledgement reaches the caller                    │
//! │  • Order is preserved within one batch                                  │
//! │  • Err only means the batch never left the host (not connected,         │
//! │    queue closed); drift on the device is fixed by the next pass         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use hostprint_core::{DeviceCommand, DeviceFileRecord};
use serde::{Deserialize, Serialize};

use crate::error::LauncherResult;

/// Sentinel port value that lets the printer layer pick a port itself.
pub const AUTO_PORT: &str = "AUTO";

/// Ports and baud rates the printer layer can currently connect with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Serial ports that exist and can be opened.
    pub ports: Vec<String>,

    /// Supported baud rates.
    pub baudrates: Vec<u32>,
}

impl ConnectionOptions {
    /// Returns true if `port` is among the connectable ports.
    pub fn has_port(&self, port: &str) -> bool {
        self.ports.iter().any(|p| p == port)
    }
}

/// Printer connection and command channel.
///
/// Implemented by the host application; all methods must return promptly.
pub trait Printer: Send + Sync {
    /// True once a connection is open and the firmware answered.
    fn is_operational(&self) -> bool;

    /// True when removable storage is mounted and listable.
    fn is_sd_ready(&self) -> bool;

    /// True while a print job runs.
    fn is_printing(&self) -> bool;

    /// Ports and baud rates the printer layer considers connectable.
    fn connection_options(&self) -> LauncherResult<ConnectionOptions>;

    /// Starts opening a connection. Returns before the firmware answers.
    fn connect(&self, port: &str, baudrate: u32) -> LauncherResult<()>;

    /// Lists storage files, refreshing from the device.
    fn sd_files(&self) -> LauncherResult<Vec<DeviceFileRecord>>;

    /// Queues raw command lines in order.
    fn send(&self, lines: &[String]) -> LauncherResult<()>;

    /// Selects a host file, optionally starting it right away.
    fn select_file(&self, path: &str, start_print: bool) -> LauncherResult<()>;

    /// Starts printing the selected file.
    fn start_print(&self) -> LauncherResult<()>;
}

/// Renders `commands` and queues them as one batch.
///
/// Nothing is sent if any command fails to render.
pub fn send_commands(printer: &dyn Printer, commands: &[DeviceCommand]) -> LauncherResult<()> {
    let lines = commands
        .iter()
        .map(DeviceCommand::to_line)
        .collect::<Result<Vec<_>, _>>()?;
    printer.send(&lines)
}
