//! # hostprint-sync: Autoconnect and Launcher Sync Runtime
//!
//! This crate connects to a 3D printer as soon as its serial port shows up,
//! and mirrors the newest host files onto the printer's storage as small
//! alias files, so host prints can be started from the printer's own menu.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Launcher Architecture                            │
//! │                                                                         │
//! │   host app adapter ── PrinterEvent / action line ──┐                    │
//! │                                                    ▼                    │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   EventRouter (own Tokio task)                   │  │
//! │  └───────┬──────────────────────┬───────────────────────┬───────────┘  │
//! │          ▼                      ▼                       ▼              │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────┐    │
//! │  │ ConnectionRetry│  │  SyncController    │  │  ActionDispatcher  │    │
//! │  │ Controller     │  │                    │  │                    │    │
//! │  │ bounded connect│  │ Idle → … → Complete│  │ action line →      │    │
//! │  │ attempts       │  │ reconciliation pass│  │ select + print     │    │
//! │  └───────┬────────┘  └─────────┬──────────┘  └─────────┬──────────┘    │
//! │          │   RetryTimer        │   LocalCatalog        │               │
//! │          ▼                     ▼                       ▼               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ Printer (trait)      FileIndex (trait)      SettingsStore (trait)│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  STATUS: LauncherEventEmitter (transitions, pass reports)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`router`] - Event routing and the router task handle
//! - [`controller`] - Sync state machine and reconciliation pass
//! - [`connection`] - Bounded autoconnect
//! - [`dispatcher`] - Inbound action handling
//! - [`catalog`] - Host file index access
//! - [`device`] - Printer collaborator trait
//! - [`timer`] - Retry timer primitive
//! - [`config`] - Launcher configuration (TOML + env)
//! - [`error`] - Launcher error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hostprint_sync::{EventRouter, LauncherConfig, PrinterEvent};
//!
//! let config = LauncherConfig::load_or_default(None);
//! let settings = Arc::new(config.serial.clone());
//!
//! let handle = EventRouter::new(printer, file_index, settings, config).spawn();
//! handle.publish(PrinterEvent::Connected).await?;
//! handle.action("start_file prints/cube.gcode").await?;
//!
//! let status = handle.status().await?;
//! println!("Sync state: {}", status.state);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod connection;
pub mod controller;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod router;
pub mod timer;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::{FileIndex, LocalCatalog};
pub use config::{LauncherConfig, SerialSettings, SettingsStore};
pub use connection::{ConnectionAttemptBudget, ConnectionRetryController};
pub use controller::{LauncherEventEmitter, NoOpEmitter, SyncController};
pub use device::{ConnectionOptions, Printer, AUTO_PORT};
pub use dispatcher::ActionDispatcher;
pub use error::{LauncherError, LauncherResult};
pub use router::{EventRouter, FileChange, LauncherStatus, PrinterEvent, RouterHandle};
pub use timer::{RetryPolicy, RetryTimer, Tick};
