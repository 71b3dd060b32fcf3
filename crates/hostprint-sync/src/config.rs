//! # Launcher Configuration
//!
//! Configuration management for autoconnect and launcher sync.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HOSTPRINT_SERIAL_PORT=/dev/ttyACM0                                 │
//! │     HOSTPRINT_AUTOCONNECT=true                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/hostprint/launcher.toml (Linux)                          │
//! │     ~/Library/Application Support/org.hostprint.launcher/… (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     start_file, HOST/, 5 files, 40s connect window                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [launcher]
//! action_command = "start_file"
//! host_directory = "HOST/"
//! max_host_files = 5
//!
//! [connection]
//! max_wait_secs = 40
//!
//! [sync]
//! max_attempts = 20
//! retry_interval_ms = 2000
//! settle_secs = 10
//!
//! [serial]
//! autoconnect = true
//! port = "AUTO"
//! baudrate = 115200
//! detection_first_timeout_secs = 10.0
//! ```
//!
//! The `[serial]` table is one possible backing for [`SettingsStore`]; a
//! host application may instead read these keys from its own settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use hostprint_core::{DEFAULT_ACTION_COMMAND, DEFAULT_HOST_DIRECTORY, DEFAULT_MAX_HOST_FILES};

use crate::device::AUTO_PORT;
use crate::error::{LauncherError, LauncherResult};

// =============================================================================
// Settings Store
// =============================================================================

/// Read-only key-value access to serial connection settings.
///
/// Getters are fallible so a malformed value aborts only the connection
/// cycle that reads it.
pub trait SettingsStore: Send + Sync {
    /// `serial.autoconnect`
    fn autoconnect(&self) -> bool;

    /// `serial.port`, possibly `"AUTO"`.
    fn serial_port(&self) -> LauncherResult<String>;

    /// `serial.baudrate`
    fn baudrate(&self) -> LauncherResult<u32>;

    /// `serial.timeout.detectionFirst`, in seconds.
    fn detection_first_timeout(&self) -> LauncherResult<f64>;
}

// =============================================================================
// Launcher Settings
// =============================================================================

/// Alias file layout on printer storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherSettings {
    /// Action name written into alias files and matched on the way back.
    #[serde(default = "default_action_command")]
    pub action_command: String,

    /// Storage directory holding alias files, with trailing `/`.
    #[serde(default = "default_host_directory")]
    pub host_directory: String,

    /// Number of newest host files mirrored on the printer.
    #[serde(default = "default_max_host_files")]
    pub max_host_files: usize,
}

fn default_action_command() -> String {
    DEFAULT_ACTION_COMMAND.to_string()
}

fn default_host_directory() -> String {
    DEFAULT_HOST_DIRECTORY.to_string()
}

fn default_max_host_files() -> usize {
    DEFAULT_MAX_HOST_FILES
}

impl Default for LauncherSettings {
    fn default() -> Self {
        LauncherSettings {
            action_command: default_action_command(),
            host_directory: default_host_directory(),
            max_host_files: default_max_host_files(),
        }
    }
}

// =============================================================================
// Connection Settings
// =============================================================================

/// Autoconnect retry window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Total time to keep retrying after a port shows up (seconds).
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
}

fn default_max_wait() -> u64 {
    40
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings {
            max_wait_secs: default_max_wait(),
        }
    }
}

impl ConnectionSettings {
    /// Returns the retry window.
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Launch retry and settling timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Storage readiness checks before a launch gives up.
    #[serde(default = "default_sync_attempts")]
    pub max_attempts: u32,

    /// Delay between storage readiness checks (milliseconds).
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,

    /// Wait after transfer commands before reporting (seconds).
    #[serde(default = "default_settle")]
    pub settle_secs: u64,
}

fn default_sync_attempts() -> u32 {
    20
}

fn default_retry_interval() -> u64 {
    2000
}

fn default_settle() -> u64 {
    10
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_attempts: default_sync_attempts(),
            retry_interval_ms: default_retry_interval(),
            settle_secs: default_settle(),
        }
    }
}

impl SyncSettings {
    /// Returns the delay between readiness checks.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Returns the settling interval.
    pub fn settle_interval(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

// =============================================================================
// Serial Settings
// =============================================================================

/// Serial connection keys, usable as a [`SettingsStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Connect automatically when the configured port appears.
    #[serde(default)]
    pub autoconnect: bool,

    /// Serial port path or `"AUTO"`.
    #[serde(default = "default_port")]
    pub port: Option<String>,

    /// Baud rate.
    #[serde(default = "default_baudrate")]
    pub baudrate: Option<u32>,

    /// First-detection timeout, used as the connect retry period (seconds).
    #[serde(default = "default_detection_first")]
    pub detection_first_timeout_secs: Option<f64>,
}

fn default_port() -> Option<String> {
    Some(AUTO_PORT.to_string())
}

fn default_baudrate() -> Option<u32> {
    Some(115_200)
}

fn default_detection_first() -> Option<f64> {
    Some(10.0)
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            autoconnect: false,
            port: default_port(),
            baudrate: default_baudrate(),
            detection_first_timeout_secs: default_detection_first(),
        }
    }
}

impl SettingsStore for SerialSettings {
    fn autoconnect(&self) -> bool {
        self.autoconnect
    }

    fn serial_port(&self) -> LauncherResult<String> {
        self.port
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or(LauncherError::MissingSetting { key: "serial.port" })
    }

    fn baudrate(&self) -> LauncherResult<u32> {
        self.baudrate
            .filter(|b| *b > 0)
            .ok_or(LauncherError::MissingSetting { key: "serial.baudrate" })
    }

    fn detection_first_timeout(&self) -> LauncherResult<f64> {
        self.detection_first_timeout_secs
            .ok_or(LauncherError::MissingSetting {
                key: "serial.timeout.detectionFirst",
            })
    }
}

// =============================================================================
// Main Launcher Configuration
// =============================================================================

/// Complete launcher configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Alias layout.
    #[serde(default)]
    pub launcher: LauncherSettings,

    /// Autoconnect window.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Launch retry timings.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Serial connection keys.
    #[serde(default)]
    pub serial: SerialSettings,
}

impl LauncherConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves defaults, then `launcher.toml`, then `HOSTPRINT_*`
    /// variables, and validates the result.
    ///
    /// A missing file is not an error; the defaults stand in for it.
    pub fn load(config_path: Option<PathBuf>) -> LauncherResult<Self> {
        let path = config_path.or_else(Self::default_config_path);
        let mut config = match path {
            Some(path) => Self::read_file(&path)?.unwrap_or_default(),
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        match Self::load(config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Launcher config rejected, falling back to defaults");
                Self::default()
            }
        }
    }

    /// Writes the config as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> LauncherResult<()> {
        let Some(path) = config_path.or_else(Self::default_config_path) else {
            return Err(LauncherError::ConfigSaveFailed(
                "no config directory on this platform".into(),
            ));
        };

        let write = |path: &Path, contents: String| -> std::io::Result<()> {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, contents)
        };
        write(&path, toml::to_string_pretty(self)?)
            .map_err(|e| LauncherError::ConfigSaveFailed(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Launcher config written");
        Ok(())
    }

    fn read_file(path: &Path) -> LauncherResult<Option<Self>> {
        if !path.is_file() {
            debug!(path = %path.display(), "No launcher config file");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        info!(path = %path.display(), "Launcher config file read");
        Ok(Some(config))
    }

    /// Validates the configuration.
    ///
    /// Serial keys are not checked here; they are read lazily through
    /// [`SettingsStore`] and may be fixed while the process runs.
    pub fn validate(&self) -> LauncherResult<()> {
        let action = &self.launcher.action_command;
        if action.is_empty() || action.contains(char::is_whitespace) {
            return Err(LauncherError::InvalidConfig(format!(
                "action_command must be a single non-empty word, got: '{}'",
                action
            )));
        }

        let dir = &self.launcher.host_directory;
        if dir.is_empty() || !dir.ends_with('/') || dir.starts_with('/') {
            return Err(LauncherError::InvalidConfig(format!(
                "host_directory must be relative and end with '/', got: '{}'",
                dir
            )));
        }

        if self.launcher.max_host_files == 0 {
            return Err(LauncherError::InvalidConfig(
                "max_host_files must be greater than 0".into(),
            ));
        }

        if self.sync.max_attempts == 0 || self.sync.retry_interval_ms == 0 {
            return Err(LauncherError::InvalidConfig(
                "sync.max_attempts and sync.retry_interval_ms must be greater than 0".into(),
            ));
        }

        if self.connection.max_wait_secs == 0 {
            return Err(LauncherError::InvalidConfig(
                "connection.max_wait_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(action) = std::env::var("HOSTPRINT_ACTION_COMMAND") {
            debug!(action = %action, "Overriding action command from environment");
            self.launcher.action_command = action;
        }

        if let Ok(dir) = std::env::var("HOSTPRINT_HOST_DIRECTORY") {
            self.launcher.host_directory = dir;
        }

        if let Ok(max) = std::env::var("HOSTPRINT_MAX_HOST_FILES") {
            match max.parse::<usize>() {
                Ok(n) => self.launcher.max_host_files = n,
                Err(_) => warn!(value = %max, "Ignoring malformed HOSTPRINT_MAX_HOST_FILES"),
            }
        }

        if let Ok(flag) = std::env::var("HOSTPRINT_AUTOCONNECT") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.serial.autoconnect = true,
                "0" | "false" | "no" | "off" => self.serial.autoconnect = false,
                _ => warn!(value = %flag, "Unknown autoconnect flag in environment"),
            }
        }

        if let Ok(port) = std::env::var("HOSTPRINT_SERIAL_PORT") {
            debug!(port = %port, "Overriding serial port from environment");
            self.serial.port = Some(port);
        }

        if let Ok(baud) = std::env::var("HOSTPRINT_BAUDRATE") {
            match baud.parse::<u32>() {
                Ok(b) => self.serial.baudrate = Some(b),
                Err(_) => warn!(value = %baud, "Ignoring malformed HOSTPRINT_BAUDRATE"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "hostprint", "launcher")
            .map(|dirs| dirs.config_dir().join("launcher.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the action command name.
    pub fn action_command(&self) -> &str {
        &self.launcher.action_command
    }

    /// Returns the alias directory on printer storage.
    pub fn host_directory(&self) -> &str {
        &self.launcher.host_directory
    }

    /// Device path an alias file is written to (e.g. `/HOST/cube_1a2b3c.gcode`).
    pub fn alias_path(&self, alias_file_name: &str) -> String {
        format!("/{}{}", self.launcher.host_directory, alias_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that read or write `HOSTPRINT_*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 6] = [
        "HOSTPRINT_ACTION_COMMAND",
        "HOSTPRINT_HOST_DIRECTORY",
        "HOSTPRINT_MAX_HOST_FILES",
        "HOSTPRINT_AUTOCONNECT",
        "HOSTPRINT_SERIAL_PORT",
        "HOSTPRINT_BAUDRATE",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = LauncherConfig::default();
        assert_eq!(config.action_command(), "start_file");
        assert_eq!(config.host_directory(), "HOST/");
        assert_eq!(config.launcher.max_host_files, 5);
        assert_eq!(config.connection.max_wait(), Duration::from_secs(40));
        assert_eq!(config.sync.max_attempts, 20);
        assert_eq!(config.sync.retry_interval(), Duration::from_secs(2));
        assert_eq!(config.sync.settle_interval(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = LauncherConfig::default();

        config.launcher.action_command = "start file".into();
        assert!(config.validate().is_err());

        config = LauncherConfig::default();
        config.launcher.host_directory = "HOST".into();
        assert!(config.validate().is_err());

        config = LauncherConfig::default();
        config.launcher.max_host_files = 0;
        assert!(config.validate().is_err());

        config = LauncherConfig::default();
        config.sync.retry_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LauncherConfig = toml::from_str(
            r#"
            [launcher]
            max_host_files = 3

            [serial]
            autoconnect = true
            port = "/dev/ttyACM0"
            "#,
        )
        .unwrap();

        assert_eq!(config.launcher.max_host_files, 3);
        assert_eq!(config.action_command(), "start_file");
        assert!(config.serial.autoconnect());
        assert_eq!(config.serial.serial_port().unwrap(), "/dev/ttyACM0");
        assert_eq!(config.serial.baudrate().unwrap(), 115_200);
    }

    #[test]
    fn test_serial_settings_reject_missing_values() {
        let settings = SerialSettings {
            autoconnect: true,
            port: Some("  ".into()),
            baudrate: Some(0),
            detection_first_timeout_secs: None,
        };
        assert!(settings.serial_port().unwrap_err().is_config_error());
        assert!(settings.baudrate().is_err());
        assert!(settings.detection_first_timeout().is_err());
    }

    #[test]
    fn test_alias_path() {
        let config = LauncherConfig::default();
        assert_eq!(
            config.alias_path("cube_1a2b3c.gcode"),
            "/HOST/cube_1a2b3c.gcode"
        );
    }

    #[test]
    fn test_toml_round_trip_sections() {
        let toml_str = toml::to_string_pretty(&LauncherConfig::default()).unwrap();
        assert!(toml_str.contains("[launcher]"));
        assert!(toml_str.contains("[serial]"));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("launcher.toml");

        let mut config = LauncherConfig::default();
        config.launcher.max_host_files = 3;
        config.serial.autoconnect = true;
        config.serial.port = Some("/dev/ttyACM0".into());
        config.save(Some(path.clone())).unwrap();

        let loaded = LauncherConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.launcher.max_host_files, 3);
        assert!(loaded.serial.autoconnect);
        assert_eq!(loaded.serial.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(loaded.sync.settle_secs, 10);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = tempfile::tempdir().unwrap();

        let loaded = LauncherConfig::load(Some(dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded.launcher.max_host_files, 5);
        assert_eq!(loaded.host_directory(), "HOST/");
        assert!(!loaded.serial.autoconnect);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher.toml");
        std::fs::write(
            &path,
            "[launcher]\nmax_host_files = 3\n\n[serial]\nbaudrate = 250000\n",
        )
        .unwrap();

        std::env::set_var("HOSTPRINT_MAX_HOST_FILES", "4");
        std::env::set_var("HOSTPRINT_BAUDRATE", "fast");
        std::env::set_var("HOSTPRINT_AUTOCONNECT", "on");
        let loaded = LauncherConfig::load(Some(path));
        clear_env();

        let loaded = loaded.unwrap();
        assert_eq!(loaded.launcher.max_host_files, 4);
        assert_eq!(loaded.serial.baudrate, Some(250_000));
        assert!(loaded.serial.autoconnect);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher.toml");
        std::fs::write(&path, "[launcher]\nhost_directory = \"HOST\"\nmax_host_files = 2\n").unwrap();

        assert!(LauncherConfig::load(Some(path.clone()))
            .unwrap_err()
            .is_config_error());
        let fallback = LauncherConfig::load_or_default(Some(path));
        assert_eq!(fallback.host_directory(), "HOST/");
        assert_eq!(fallback.launcher.max_host_files, 5);
    }

    #[test]
    fn test_unparseable_file_falls_back_to_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher.toml");
        std::fs::write(&path, "[launcher\nmax_host_files = ").unwrap();

        assert!(LauncherConfig::load(Some(path.clone())).is_err());
        assert_eq!(LauncherConfig::load_or_default(Some(path)).launcher.max_host_files, 5);
    }
}
