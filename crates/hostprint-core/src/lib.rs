//! # hostprint-core: Pure Launcher Logic
//!
//! This crate holds the deterministic pieces of host-file launcher sync:
//! everything that can be decided without touching a printer, a file index
//! or a clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        hostprint Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              hostprint-sync (controllers, timers)               │   │
//! │  │   EventRouter ──► SyncController / ConnectionRetryController    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ hostprint-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  naming   │  │  catalog  │  │   gcode   │  │   │
//! │  │   │ SyncState │  │ short_name│  │  newest-  │  │ M28 / M29 │  │   │
//! │  │   │  records  │  │  + hash   │  │  first    │  │ M30 / M117│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DEVICE • NO TIMERS • PURE FUNCTIONS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records and the sync state enum
//! - [`naming`] - Short alias names for printer storage
//! - [`catalog`] - Ordering and filtering of host file index entries
//! - [`gcode`] - Device commands and their G-code rendering
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use hostprint_core::naming::short_name;
//!
//! let alias = short_name("Benchy (0.2mm).gcode");
//! assert!(alias.starts_with("benchy_0_2mm_"));
//! assert!(alias.ends_with(".gcode"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod gcode;
pub mod naming;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult};
pub use gcode::DeviceCommand;
pub use naming::short_name;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Directory on printer storage that holds alias files.
pub const DEFAULT_HOST_DIRECTORY: &str = "HOST/";

/// Action name embedded in alias files and echoed back by the printer.
pub const DEFAULT_ACTION_COMMAND: &str = "start_file";

/// Number of newest host files mirrored as aliases.
pub const DEFAULT_MAX_HOST_FILES: usize = 5;
