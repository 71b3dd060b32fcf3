//! # Event Router
//!
//! Single entry point for printer lifecycle events and inbound actions.
//!
//! ## Routing Table
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────────┐
//! │ PrinterEvent                 │ Handled by                               │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ ConnectionsAutoRefreshed     │ connection.ports_refreshed               │
//! │ Connected                    │ connection.cancel, select newest file,   │
//! │                              │ then sync.on_connected                   │
//! │ PrintDone                    │ sync.on_print_done                       │
//! │ UpdatedFiles                 │ sync.on_files_changed                    │
//! │ FileChanged(_)               │ sync.on_files_changed                    │
//! ├──────────────────────────────┼──────────────────────────────────────────┤
//! │ action line                  │ dispatcher.handle_action                 │
//! └──────────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! [`EventRouter::spawn`] moves the router onto its own task, so events are
//! handled one at a time in arrival order.

use std::sync::Arc;

use hostprint_core::{PassReport, SyncState};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::catalog::{FileIndex, LocalCatalog};
use crate::config::{LauncherConfig, SettingsStore};
use crate::connection::{ConnectionAttemptBudget, ConnectionRetryController};
use crate::controller::{LauncherEventEmitter, NoOpEmitter, SyncController};
use crate::device::Printer;
use crate::dispatcher::ActionDispatcher;
use crate::error::{LauncherError, LauncherResult};

/// Queue depth of the router task.
const ROUTER_CHANNEL_SIZE: usize = 64;

// =============================================================================
// Events
// =============================================================================

/// Host file change reported by the file index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileChange {
    Uploaded,
    Added,
    Removed,
    Moved,
}

/// Printer lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterEvent {
    /// The serial port list was rescanned.
    ConnectionsAutoRefreshed { ports: Vec<String> },
    /// A printer connection is up.
    Connected,
    /// A print job finished.
    PrintDone,
    /// The host file list was refreshed.
    UpdatedFiles,
    /// A single host file changed.
    FileChanged(FileChange),
}

/// Snapshot of the launcher for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherStatus {
    /// Current sync state.
    pub state: SyncState,

    /// Running autoconnect cycle, if any.
    pub connection: Option<ConnectionAttemptBudget>,

    /// Most recent reconciliation pass.
    pub last_pass: Option<PassReport>,
}

// =============================================================================
// Event Router
// =============================================================================

/// Routes events to the controllers.
#[derive(Clone)]
pub struct EventRouter {
    connection: ConnectionRetryController,
    sync: SyncController,
    dispatcher: Arc<ActionDispatcher>,
}

impl EventRouter {
    /// Creates a router with no event emitter.
    pub fn new(
        printer: Arc<dyn Printer>,
        index: Arc<dyn FileIndex>,
        settings: Arc<dyn SettingsStore>,
        config: LauncherConfig,
    ) -> Self {
        Self::with_emitter(printer, index, settings, config, Arc::new(NoOpEmitter))
    }

    /// Creates a router with a custom event emitter.
    pub fn with_emitter(
        printer: Arc<dyn Printer>,
        index: Arc<dyn FileIndex>,
        settings: Arc<dyn SettingsStore>,
        config: LauncherConfig,
        emitter: Arc<dyn LauncherEventEmitter>,
    ) -> Self {
        let catalog = LocalCatalog::new(index);
        let config = Arc::new(config);

        let connection = ConnectionRetryController::new(
            Arc::clone(&printer),
            settings,
            config.connection.max_wait(),
        );
        let dispatcher = Arc::new(ActionDispatcher::new(
            Arc::clone(&printer),
            catalog.clone(),
            config.action_command(),
        ));
        let sync = SyncController::new(printer, catalog, config, emitter);

        EventRouter {
            connection,
            sync,
            dispatcher,
        }
    }

    /// Sync controller, for direct queries.
    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    /// Connection controller, for direct queries.
    pub fn connection(&self) -> &ConnectionRetryController {
        &self.connection
    }

    /// Handles one event.
    pub async fn handle(&self, event: PrinterEvent) {
        debug!(?event, "Routing printer event");
        match event {
            PrinterEvent::ConnectionsAutoRefreshed { ports } => {
                self.connection.ports_refreshed(&ports).await;
            }
            PrinterEvent::Connected => {
                self.connection.cancel().await;
                self.dispatcher.select_newest();
                self.sync.on_connected().await;
            }
            PrinterEvent::PrintDone => self.sync.on_print_done().await,
            PrinterEvent::UpdatedFiles => self.sync.on_files_changed("file list refreshed").await,
            PrinterEvent::FileChanged(change) => {
                let reason = match change {
                    FileChange::Uploaded => "file uploaded",
                    FileChange::Added => "file added",
                    FileChange::Removed => "file removed",
                    FileChange::Moved => "file moved",
                };
                self.sync.on_files_changed(reason).await;
            }
        }
    }

    /// Handles one inbound action line.
    pub fn action(&self, line: &str) {
        self.dispatcher.handle_action(line);
    }

    /// Current status snapshot.
    pub async fn status(&self) -> LauncherStatus {
        LauncherStatus {
            state: self.sync.state().await,
            connection: self.connection.budget().await,
            last_pass: self.sync.last_pass().await,
        }
    }

    /// Stops every timer. A running pass still finishes.
    pub async fn stop(&self) {
        self.connection.cancel().await;
        self.sync.shutdown().await;
    }

    /// Moves the router onto its own task.
    pub fn spawn(self) -> RouterHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(ROUTER_CHANNEL_SIZE);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            self.run(cmd_rx, shutdown_rx).await;
        });

        RouterHandle {
            cmd_tx,
            shutdown_tx,
        }
    }

    /// Main router loop.
    async fn run(self, mut cmd_rx: mpsc::Receiver<RouterCommand>, mut shutdown_rx: mpsc::Receiver<()>) {
        info!("Event router started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Event router shutting down");
                    self.stop().await;
                    break;
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(RouterCommand::Event(event)) => self.handle(event).await,
                        Some(RouterCommand::Action(line)) => self.action(&line),
                        Some(RouterCommand::Status(reply)) => {
                            let _ = reply.send(self.status().await);
                        }
                        None => {
                            self.stop().await;
                            break;
                        }
                    }
                }
            }
        }
    }
}

// =============================================================================
// Router Handle
// =============================================================================

/// Commands for the router task.
#[derive(Debug)]
enum RouterCommand {
    Event(PrinterEvent),
    Action(String),
    Status(oneshot::Sender<LauncherStatus>),
}

/// Handle for feeding a spawned [`EventRouter`].
#[derive(Clone)]
pub struct RouterHandle {
    cmd_tx: mpsc::Sender<RouterCommand>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RouterHandle {
    /// Queues a printer event.
    pub async fn publish(&self, event: PrinterEvent) -> LauncherResult<()> {
        self.cmd_tx
            .send(RouterCommand::Event(event))
            .await
            .map_err(|_| LauncherError::ShuttingDown)
    }

    /// Queues an inbound action line.
    pub async fn action(&self, line: impl Into<String>) -> LauncherResult<()> {
        self.cmd_tx
            .send(RouterCommand::Action(line.into()))
            .await
            .map_err(|_| LauncherError::ShuttingDown)
    }

    /// Asks the router task for a status snapshot.
    pub async fn status(&self) -> LauncherResult<LauncherStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(RouterCommand::Status(reply_tx))
            .await
            .map_err(|_| LauncherError::ShuttingDown)?;
        reply_rx
            .await
            .map_err(|_| LauncherError::ChannelError("Status reply dropped".into()))
    }

    /// Signals the router to stop its timers and exit.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SerialSettings;
    use crate::device::ConnectionOptions;
    use hostprint_core::{DeviceFileRecord, IndexEntry};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Offline {
        connects: AtomicU32,
    }

    impl Printer for Offline {
        fn is_operational(&self) -> bool {
            false
        }
        fn is_sd_ready(&self) -> bool {
            false
        }
        fn is_printing(&self) -> bool {
            false
        }
        fn connection_options(&self) -> LauncherResult<ConnectionOptions> {
            Ok(ConnectionOptions::default())
        }
        fn connect(&self, _port: &str, _baudrate: u32) -> LauncherResult<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn sd_files(&self) -> LauncherResult<Vec<DeviceFileRecord>> {
            Err(LauncherError::NotConnected)
        }
        fn send(&self, _lines: &[String]) -> LauncherResult<()> {
            Err(LauncherError::NotConnected)
        }
        fn select_file(&self, _path: &str, _start_print: bool) -> LauncherResult<()> {
            Err(LauncherError::NotConnected)
        }
        fn start_print(&self) -> LauncherResult<()> {
            Err(LauncherError::NotConnected)
        }
    }

    struct NoFiles;

    impl FileIndex for NoFiles {
        fn list_local(&self) -> LauncherResult<Vec<IndexEntry>> {
            Ok(Vec::new())
        }
    }

    fn router(printer: &Arc<Offline>, autoconnect: bool) -> EventRouter {
        let settings = SerialSettings {
            autoconnect,
            ..SerialSettings::default()
        };
        EventRouter::new(
            printer.clone(),
            Arc::new(NoFiles),
            Arc::new(settings),
            LauncherConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_cancels_autoconnect() {
        let printer = Arc::new(Offline::default());
        let router = router(&printer, true);

        router
            .handle(PrinterEvent::ConnectionsAutoRefreshed {
                ports: vec!["/dev/ttyACM0".into()],
            })
            .await;
        assert!(router.status().await.connection.is_some());

        router.handle(PrinterEvent::Connected).await;
        let status = router.status().await;
        assert!(status.connection.is_none());
        assert_eq!(status.state, SyncState::Launching);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(printer.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_events_share_policy() {
        let printer = Arc::new(Offline::default());
        let router = router(&printer, false);

        router.handle(PrinterEvent::FileChanged(FileChange::Moved)).await;
        assert_eq!(router.sync().state().await, SyncState::Needed);

        router.handle(PrinterEvent::UpdatedFiles).await;
        assert_eq!(router.sync().state().await, SyncState::Needed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_round_trip_and_shutdown() {
        let printer = Arc::new(Offline::default());
        let handle = router(&printer, false).spawn();

        handle.publish(PrinterEvent::UpdatedFiles).await.unwrap();
        handle.action("start_file cube").await.unwrap();
        let status = handle.status().await.unwrap();
        assert_eq!(status.state, SyncState::Needed);

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(
            handle.publish(PrinterEvent::PrintDone).await,
            Err(LauncherError::ShuttingDown)
        ));
    }
}
