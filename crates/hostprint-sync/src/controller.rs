//! # Sync Controller
//!
//! Keeps the alias files in the printer's `HOST/` directory in line with
//! the newest host files.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Connected ─────────────────────┐ (forced)                             │
//! │                                  ▼                                      │
//! │  ┌──────┐ files changed   ┌────────┐  launch   ┌───────────┐            │
//! │  │ Idle │────────────────►│ Needed │──────────►│ Launching │            │
//! │  └──────┘  (deferred if   └────────┘           └─────┬─────┘            │
//! │     ▲       not ready)       ▲  PrintDone            │ storage ready    │
//! │     │                        │  / files changed      ▼  (≤ 20 × 2s)     │
//! │     │ file list       ┌──────────┐  pass done  ┌────────┐               │
//! │     └─────────────────│ Complete │◄────────────│ Active │               │
//! │       refreshed       └──────────┘             └────────┘               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reconciliation Pass
//! ```text
//! M117 Updating host files
//! M30 HOST/<stale>            one per device alias not among the newest N
//! M28 /HOST/<alias>           ┐
//! M117 Starting host print... │ one batch per newest file
//! M118 A1 action:start_file … │ missing on the device
//! M29                         ┘
//! (settle 10s)
//! M117 <n> host files updated  |  M117 Host files were OK
//! ```
//!
//! All state lives in one `SyncMachine` behind one async mutex, and every
//! state change goes through `SyncController::transition`. Launch timers
//! only decide *when* to reconcile; the pass itself runs in its own task so
//! aborting a timer can never park the machine in `Active`.

use std::sync::Arc;

use chrono::Utc;
use hostprint_core::catalog::SyncPlan;
use hostprint_core::{DeviceCommand, PassReport, SyncState};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::LocalCatalog;
use crate::config::LauncherConfig;
use crate::device::{send_commands, Printer};
use crate::error::LauncherResult;
use crate::timer::{RetryPolicy, RetryTimer, Tick};

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives sync notifications (e.g. for a UI).
pub trait LauncherEventEmitter: Send + Sync {
    /// Called after every state change.
    fn emit_transition(&self, from: SyncState, to: SyncState, reason: &str);

    /// Called when a reconciliation pass finished.
    fn emit_pass(&self, report: &PassReport);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl LauncherEventEmitter for NoOpEmitter {
    fn emit_transition(&self, _from: SyncState, _to: SyncState, _reason: &str) {}
    fn emit_pass(&self, _report: &PassReport) {}
}

// =============================================================================
// Machine State
// =============================================================================

/// Everything guarded by the controller lock.
#[derive(Default)]
struct SyncMachine {
    state: SyncState,

    /// Set on launch, cleared by the tick that starts the pass.
    waiting: bool,

    /// Storage readiness checks left for the current launch.
    attempts_left: u32,

    /// A pass task is running, whatever the current state says.
    pass_in_flight: bool,

    /// Periodic launch timer.
    timer: Option<RetryTimer>,

    /// One-shot launch fallback.
    fallback: Option<RetryTimer>,

    last_pass: Option<PassReport>,
}

struct SyncInner {
    printer: Arc<dyn Printer>,
    catalog: LocalCatalog,
    config: Arc<LauncherConfig>,
    emitter: Arc<dyn LauncherEventEmitter>,
    machine: Mutex<SyncMachine>,
}

// =============================================================================
// Sync Controller
// =============================================================================

/// Launcher sync state machine.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<SyncInner>,
}

impl SyncController {
    /// Creates a controller in `Idle`.
    pub fn new(
        printer: Arc<dyn Printer>,
        catalog: LocalCatalog,
        config: Arc<LauncherConfig>,
        emitter: Arc<dyn LauncherEventEmitter>,
    ) -> Self {
        SyncController {
            inner: Arc::new(SyncInner {
                printer,
                catalog,
                config,
                emitter,
                machine: Mutex::new(SyncMachine::default()),
            }),
        }
    }

    /// Current state.
    pub async fn state(&self) -> SyncState {
        self.inner.machine.lock().await.state
    }

    /// Report of the most recent pass.
    pub async fn last_pass(&self) -> Option<PassReport> {
        self.inner.machine.lock().await.last_pass.clone()
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

    /// Printer connected: force a sync.
    pub async fn on_connected(&self) {
        let mut m = self.inner.machine.lock().await;
        self.transition(&mut m, SyncState::Needed, "printer connected");
        self.launch_locked(&mut m);
    }

    /// Print job finished: run a deferred sync if the printer is free.
    pub async fn on_print_done(&self) {
        let mut m = self.inner.machine.lock().await;
        if m.state == SyncState::Needed && self.device_ready() {
            self.launch_locked(&mut m);
        } else {
            debug!(state = %m.state, "Print done, no sync pending");
        }
    }

    /// Host file list refreshed or a host file was uploaded, added,
    /// removed or moved.
    pub async fn on_files_changed(&self, reason: &str) {
        let mut m = self.inner.machine.lock().await;
        match m.state {
            SyncState::Complete => {
                self.transition(&mut m, SyncState::Idle, reason);
            }
            state if state.accepts_file_changes() && self.device_ready() => {
                if state != SyncState::Needed {
                    self.transition(&mut m, SyncState::Needed, reason);
                }
                self.launch_locked(&mut m);
            }
            SyncState::Idle => {
                self.transition(&mut m, SyncState::Needed, "printer busy, sync deferred");
            }
            state => {
                debug!(state = %state, reason, "File change ignored while syncing");
            }
        }
    }

    /// Aborts launch timers. A running pass still finishes.
    pub async fn shutdown(&self) {
        let mut m = self.inner.machine.lock().await;
        m.timer = None;
        m.fallback = None;
        m.waiting = false;
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn transition(&self, m: &mut SyncMachine, to: SyncState, reason: &str) {
        let from = m.state;
        m.state = to;
        info!(from = %from, to = %to, reason, "Sync state changed");
        self.inner.emitter.emit_transition(from, to, reason);
    }

    fn device_ready(&self) -> bool {
        let printer = &self.inner.printer;
        printer.is_operational() && printer.is_sd_ready() && !printer.is_printing()
    }

    /// `Needed` → `Launching`; arms the storage readiness timers.
    fn launch_locked(&self, m: &mut SyncMachine) -> bool {
        if m.state != SyncState::Needed {
            debug!(state = %m.state, "Launch refused");
            return false;
        }

        let settings = &self.inner.config.sync;
        let policy = match RetryPolicy::new(settings.retry_interval(), settings.max_attempts) {
            Ok(policy) => policy,
            Err(e) => {
                warn!(error = %e, "Launch refused");
                return false;
            }
        };

        let replaced = [m.timer.take(), m.fallback.take()];
        for old in replaced.iter().flatten().filter(|t| !t.is_finished()) {
            debug!(timer = old.name(), "Replacing launch timer");
        }
        drop(replaced);
        m.waiting = true;
        m.attempts_left = policy.max_attempts;
        self.transition(m, SyncState::Launching, "waiting for printer storage");

        let this = self.clone();
        m.timer = Some(RetryTimer::spawn("sync-launch", policy, true, move |_| {
            let this = this.clone();
            async move { this.launch_tick().await }
        }));

        let this = self.clone();
        m.fallback = Some(RetryTimer::once("sync-fallback", policy.interval, async move {
            this.launch_tick().await;
        }));

        true
    }

    /// One storage readiness check.
    async fn launch_tick(&self) -> Tick {
        let mut m = self.inner.machine.lock().await;
        if !(m.attempts_left > 0 && m.waiting) {
            return Tick::Stop;
        }
        m.attempts_left -= 1;

        if m.pass_in_flight {
            debug!(attempts_left = m.attempts_left, "Previous pass still running");
            if m.attempts_left == 0 {
                info!("Previous pass outlasted the launch window, launch abandoned");
            }
            return Tick::Continue;
        }
        if !self.inner.printer.is_sd_ready() {
            debug!(attempts_left = m.attempts_left, "Printer storage not ready");
            if m.attempts_left == 0 {
                info!("Printer storage never became ready, launch abandoned");
            }
            return Tick::Continue;
        }

        m.waiting = false;
        drop(m);

        let this = self.clone();
        tokio::spawn(async move { this.reconcile().await });
        Tick::Stop
    }

    // =========================================================================
    // Reconciliation Pass
    // =========================================================================

    async fn reconcile(&self) {
        {
            let mut m = self.inner.machine.lock().await;
            if m.state != SyncState::Launching || m.pass_in_flight {
                debug!(state = %m.state, "Reconciliation not started");
                return;
            }
            m.pass_in_flight = true;
            self.transition(&mut m, SyncState::Active, "reconciling host files");
        }

        let mut deleted = Vec::new();
        let mut copied = Vec::new();
        let printer = &self.inner.printer;

        let error = if !printer.is_operational() || printer.is_printing() {
            info!("Printer offline or printing, skipping reconciliation");
            None
        } else {
            match self.exchange(&mut deleted, &mut copied).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(error = %e, retryable = e.is_retryable(), "Reconciliation pass cut short");
                    Some(e.to_string())
                }
            }
        };

        let report = PassReport {
            deleted,
            copied,
            error,
            completed_at: Utc::now(),
        };

        let mut m = self.inner.machine.lock().await;
        m.pass_in_flight = false;
        if m.state == SyncState::Active {
            self.transition(&mut m, SyncState::Complete, "reconciliation finished");
        } else {
            info!(state = %m.state, "State moved on during reconciliation");
        }
        m.last_pass = Some(report.clone());
        drop(m);

        info!(
            deleted = report.deleted.len(),
            copied = report.copied.len(),
            "Reconciliation pass done"
        );
        self.inner.emitter.emit_pass(&report);
    }

    /// Issues the device commands of one pass.
    async fn exchange(&self, deleted: &mut Vec<String>, copied: &mut Vec<String>) -> LauncherResult<()> {
        let printer = self.inner.printer.as_ref();
        let config = &self.inner.config;

        send_commands(printer, &[DeviceCommand::display("Updating host files")])?;

        let on_device: Vec<_> = printer
            .sd_files()?
            .into_iter()
            .filter(|f| f.is_in_directory(config.host_directory()))
            .collect();
        let newest = self
            .inner
            .catalog
            .latest_files(Some(config.launcher.max_host_files));

        let plan = SyncPlan::compute(&on_device, &newest);
        debug!(
            on_device = on_device.len(),
            newest = newest.len(),
            delete = plan.to_delete.len(),
            copy = plan.to_copy.len(),
            "Reconciliation plan"
        );

        for file in &plan.to_delete {
            info!(path = %file.path, "Deleting stale alias");
            send_commands(printer, &[DeviceCommand::DeleteFile(file.path.clone())])?;
            deleted.push(file.path.clone());
        }

        if plan.to_copy.is_empty() {
            send_commands(printer, &[DeviceCommand::display("Host files were OK")])?;
            return Ok(());
        }

        for file in &plan.to_copy {
            let target = config.alias_path(file.alias_file_name());
            info!(alias = %target, source = %file.path, "Writing alias");
            send_commands(
                printer,
                &[
                    DeviceCommand::BeginTransfer(target),
                    DeviceCommand::display("Starting host print..."),
                    DeviceCommand::action(config.action_command(), file.path.clone()),
                    DeviceCommand::EndTransfer,
                ],
            )?;
            copied.push(file.alias.clone());
        }

        tokio::time::sleep(config.sync.settle_interval()).await;
        send_commands(
            printer,
            &[DeviceCommand::display(format!("{} host files updated", copied.len()))],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileIndex;
    use crate::device::ConnectionOptions;
    use hostprint_core::{DeviceFileRecord, IndexEntry};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct Bench {
        ready: AtomicBool,
        printing: AtomicBool,
        lines: StdMutex<Vec<String>>,
    }

    impl Bench {
        fn new(ready: bool) -> Arc<Self> {
            Arc::new(Bench {
                ready: AtomicBool::new(ready),
                printing: AtomicBool::new(false),
                lines: StdMutex::new(Vec::new()),
            })
        }
    }

    impl Printer for Bench {
        fn is_operational(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }
        fn is_sd_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }
        fn is_printing(&self) -> bool {
            self.printing.load(Ordering::SeqCst)
        }
        fn connection_options(&self) -> LauncherResult<ConnectionOptions> {
            Ok(ConnectionOptions::default())
        }
        fn connect(&self, _port: &str, _baudrate: u32) -> LauncherResult<()> {
            Ok(())
        }
        fn sd_files(&self) -> LauncherResult<Vec<DeviceFileRecord>> {
            Ok(Vec::new())
        }
        fn send(&self, lines: &[String]) -> LauncherResult<()> {
            self.lines.lock().unwrap().extend_from_slice(lines);
            Ok(())
        }
        fn select_file(&self, _path: &str, _start_print: bool) -> LauncherResult<()> {
            Ok(())
        }
        fn start_print(&self) -> LauncherResult<()> {
            Ok(())
        }
    }

    struct Empty;

    impl FileIndex for Empty {
        fn list_local(&self) -> LauncherResult<Vec<IndexEntry>> {
            Ok(Vec::new())
        }
    }

    struct OneFile;

    impl FileIndex for OneFile {
        fn list_local(&self) -> LauncherResult<Vec<IndexEntry>> {
            Ok(vec![IndexEntry {
                date: Utc::now(),
                path: "prints/cube.gcode".into(),
                name: "cube.gcode".into(),
                display: "cube.gcode".into(),
                type_path: vec!["machinecode".into(), "gcode".into()],
            }])
        }
    }

    fn controller(printer: &Arc<Bench>) -> SyncController {
        SyncController::new(
            printer.clone(),
            LocalCatalog::new(Arc::new(Empty)),
            Arc::new(LauncherConfig::default()),
            Arc::new(NoOpEmitter),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_change_deferred_while_offline() {
        let printer = Bench::new(false);
        let ctl = controller(&printer);

        ctl.on_files_changed("file added").await;
        assert_eq!(ctl.state().await, SyncState::Needed);

        ctl.on_print_done().await;
        assert_eq!(ctl.state().await, SyncState::Needed);

        printer.ready.store(true, Ordering::SeqCst);
        ctl.on_print_done().await;
        assert_ne!(ctl.state().await, SyncState::Needed);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ctl.state().await, SyncState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_sync_reports_ok_and_completes() {
        let printer = Bench::new(true);
        let ctl = controller(&printer);

        ctl.on_connected().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(ctl.state().await, SyncState::Complete);
        assert_eq!(
            *printer.lines.lock().unwrap(),
            vec!["M117 Updating host files", "M117 Host files were OK"]
        );
        assert!(ctl.last_pass().await.unwrap().is_noop());

        ctl.on_files_changed("file list refreshed").await;
        assert_eq!(ctl.state().await, SyncState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_printing_pass_skips_commands() {
        let printer = Bench::new(true);
        printer.printing.store(true, Ordering::SeqCst);
        let ctl = controller(&printer);

        ctl.on_connected().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(ctl.state().await, SyncState::Complete);
        assert!(printer.lines.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_gives_up_when_storage_never_ready() {
        let printer = Bench::new(false);
        let ctl = controller(&printer);

        ctl.on_connected().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ctl.state().await, SyncState::Launching);

        printer.ready.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ctl.state().await, SyncState::Launching);
        assert!(printer.lines.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_abandoned_while_previous_pass_runs() {
        let printer = Bench::new(true);
        let mut config = LauncherConfig::default();
        config.sync.max_attempts = 2;
        config.sync.retry_interval_ms = 1_000;
        let ctl = SyncController::new(
            printer.clone(),
            LocalCatalog::new(Arc::new(OneFile)),
            Arc::new(config),
            Arc::new(NoOpEmitter),
        );

        // First pass copies one alias, then settles for 10s.
        ctl.on_connected().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ctl.state().await, SyncState::Active);

        // Both launch checks of the second cycle land inside that pass.
        ctl.on_connected().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(ctl.state().await, SyncState::Launching);
        let lines = printer.lines.lock().unwrap();
        let passes = lines
            .iter()
            .filter(|l| *l == "M117 Updating host files")
            .count();
        assert_eq!(passes, 1);
        assert_eq!(lines.last().map(String::as_str), Some("M117 1 host files updated"));
    }
}
