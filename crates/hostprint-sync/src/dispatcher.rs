//! # Action Dispatcher
//!
//! Maps action lines echoed by the printer back to host files.
//!
//! ```text
//! printer menu ─► select /HOST/cube_1a2b3c.gcode
//!                    │ file content: M118 A1 action:start_file prints/cube.gcode
//!                    ▼
//! host ◄── "//action:start_file prints/cube.gcode"
//!                    │ handle_action("start_file prints/cube.gcode")
//!                    ▼
//! newest host file whose path contains "prints/cube.gcode" ─► select + print
//! ```
//!
//! Matching is a plain substring test, so a fragment can match files in
//! several directories; the newest one wins.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalog::LocalCatalog;
use crate::device::Printer;

/// Starts host prints requested from the printer menu.
pub struct ActionDispatcher {
    printer: Arc<dyn Printer>,
    catalog: LocalCatalog,
    action_command: String,
}

impl ActionDispatcher {
    /// Creates a dispatcher answering to `action_command`.
    pub fn new(printer: Arc<dyn Printer>, catalog: LocalCatalog, action_command: impl Into<String>) -> Self {
        ActionDispatcher {
            printer,
            catalog,
            action_command: action_command.into(),
        }
    }

    /// Handles one inbound action line (`<name> <path fragment>`).
    pub fn handle_action(&self, line: &str) {
        let line = line.trim();
        let (name, fragment) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        if name != self.action_command {
            debug!(action = %name, "Ignoring foreign action");
            return;
        }

        let fragment = fragment.trim();
        if fragment.is_empty() {
            warn!(action = %name, "Action carries no file name");
            return;
        }

        let files = self.catalog.latest_files(None);
        let Some(file) = files.iter().find(|f| f.path.contains(fragment)) else {
            warn!(fragment = %fragment, candidates = files.len(), "No host file matches action");
            return;
        };

        info!(fragment = %fragment, path = %file.path, "Starting host print");
        let started = self
            .printer
            .select_file(&file.path, false)
            .and_then(|_| self.printer.start_print());
        if let Err(e) = started {
            warn!(error = %e, path = %file.path, "Failed to start host print");
        }
    }

    /// Selects the newest host file without printing it.
    pub fn select_newest(&self) {
        let Some(file) = self.catalog.latest_files(Some(1)).into_iter().next() else {
            debug!("No host files to select");
            return;
        };

        debug!(path = %file.path, "Selecting newest host file");
        if let Err(e) = self.printer.select_file(&file.path, false) {
            warn!(error = %e, path = %file.path, "Failed to select newest host file");
        }
    }
}
