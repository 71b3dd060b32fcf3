//! # Device Commands
//!
//! Printer-directed side effects, rendered as Marlin G-code lines.
//!
//! | Command            | G-code                          |
//! |--------------------|---------------------------------|
//! | display message    | `M117 <text>`                   |
//! | begin transfer     | `M28 <path>`                    |
//! | end transfer       | `M29`                           |
//! | delete file        | `M30 <path>`                    |
//! | action trigger     | `M118 A1 action:<name> <arg>`   |
//!
//! Between `M28` and `M29` the printer writes every received line into the
//! target file instead of executing it, which is how an alias file gets its
//! trigger line as content.

use crate::error::{CoreError, CoreResult};

/// A single command line for the printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Show a message on the printer display.
    DisplayMessage(String),
    /// Start writing received lines into a storage file.
    BeginTransfer(String),
    /// Stop writing the current storage file.
    EndTransfer,
    /// Delete a storage file.
    DeleteFile(String),
    /// Make the printer echo an action line back to the host.
    Action { name: String, payload: String },
}

impl DeviceCommand {
    /// Display message command.
    pub fn display(text: impl Into<String>) -> Self {
        DeviceCommand::DisplayMessage(text.into())
    }

    /// Action trigger command.
    pub fn action(name: impl Into<String>, payload: impl Into<String>) -> Self {
        DeviceCommand::Action {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Renders the command as one G-code line.
    ///
    /// Fails if an argument would break the line or a path is empty.
    pub fn to_line(&self) -> CoreResult<String> {
        let line = match self {
            DeviceCommand::DisplayMessage(text) => format!("M117 {}", single_line(text)?),
            DeviceCommand::BeginTransfer(path) => format!("M28 {}", device_path("M28", path)?),
            DeviceCommand::EndTransfer => "M29".to_string(),
            DeviceCommand::DeleteFile(path) => format!("M30 {}", device_path("M30", path)?),
            DeviceCommand::Action { name, payload } => format!(
                "M118 A1 action:{} {}",
                single_line(name)?,
                single_line(payload)?
            ),
        };
        Ok(line)
    }
}

fn single_line(text: &str) -> CoreResult<&str> {
    if text.contains(['\n', '\r']) {
        return Err(CoreError::MultilineArgument(text.to_string()));
    }
    Ok(text)
}

fn device_path<'a>(command: &'static str, path: &'a str) -> CoreResult<&'a str> {
    let path = single_line(path)?;
    if path.trim().is_empty() {
        return Err(CoreError::EmptyPath { command });
    }
    Ok(path)
}
