//! # Connection Retry Controller
//!
//! Opens the serial connection once the configured port shows up, retrying
//! on a bounded schedule.
//!
//! ## Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ConnectionsAutoRefreshed{ports}                                        │
//! │     │ autoconnect off / no ports ─────────────────────────► ignore      │
//! │     ▼                                                                   │
//! │  read port + baudrate, query connectable ports                          │
//! │     │ port ≠ AUTO and not (connectable ∧ refreshed) ──────► ignore      │
//! │     │ malformed setting / query failure ──────────► log, ignore         │
//! │     ▼                                                                   │
//! │  budget = ceil(max_wait / detectionFirst), replace live timer           │
//! │     │                                                                   │
//! │     ▼  every period (first tick after one period)                       │
//! │  ┌──────────────────────────────────────────┐                           │
//! │  │ not operational? ─► connect(port, baud)  │── attempts == budget ─► ■ │
//! │  └──────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  Connected ──► cancel()  (timer aborted, budget discarded)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SettingsStore;
use crate::device::{Printer, AUTO_PORT};
use crate::error::{LauncherError, LauncherResult};
use crate::timer::{RetryPolicy, RetryTimer, Tick};

/// Progress of the current connection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAttemptBudget {
    /// Ticks run so far.
    pub attempts_made: u32,

    /// Ticks allowed for this cycle.
    pub attempts_allowed: u32,

    /// Delay between ticks.
    pub period: Duration,
}

impl ConnectionAttemptBudget {
    /// Returns true once every allowed attempt ran.
    pub fn is_exhausted(&self) -> bool {
        self.attempts_made >= self.attempts_allowed
    }
}

/// Resolved target of one connection cycle.
#[derive(Debug, Clone)]
struct ConnectTarget {
    port: String,
    baudrate: u32,
    policy: RetryPolicy,
}

#[derive(Default)]
struct ConnectionSlot {
    /// Bumped on every new cycle or cancel; stale ticks compare against it.
    generation: u64,
    budget: Option<ConnectionAttemptBudget>,
    timer: Option<RetryTimer>,
}

struct ConnectionInner {
    printer: Arc<dyn Printer>,
    settings: Arc<dyn SettingsStore>,
    max_wait: Duration,
    slot: Mutex<ConnectionSlot>,
}

/// Bounded autoconnect driver.
#[derive(Clone)]
pub struct ConnectionRetryController {
    inner: Arc<ConnectionInner>,
}

impl ConnectionRetryController {
    /// Creates a controller that keeps retrying for at most `max_wait`.
    pub fn new(printer: Arc<dyn Printer>, settings: Arc<dyn SettingsStore>, max_wait: Duration) -> Self {
        ConnectionRetryController {
            inner: Arc::new(ConnectionInner {
                printer,
                settings,
                max_wait,
                slot: Mutex::new(ConnectionSlot::default()),
            }),
        }
    }

    /// Handles a refreshed serial port list.
    pub async fn ports_refreshed(&self, ports: &[String]) {
        if !self.inner.settings.autoconnect() {
            debug!("Autoconnect disabled, ignoring port refresh");
            return;
        }
        if ports.is_empty() {
            debug!("Port refresh reported no ports");
            return;
        }

        match self.resolve_target(ports) {
            Ok(Some(target)) => self.start_cycle(target).await,
            Ok(None) => debug!(?ports, "Configured port not available"),
            Err(e) => warn!(error = %e, "Autoconnect cycle aborted"),
        }
    }

    /// Stops any running cycle.
    pub async fn cancel(&self) {
        let mut slot = self.inner.slot.lock().await;
        slot.generation += 1;
        let had_timer = slot.timer.take().is_some();
        if slot.budget.take().is_some() || had_timer {
            info!("Autoconnect cycle cancelled");
        }
    }

    /// Progress of the running cycle, if any.
    pub async fn budget(&self) -> Option<ConnectionAttemptBudget> {
        self.inner.slot.lock().await.budget
    }

    fn resolve_target(&self, ports: &[String]) -> LauncherResult<Option<ConnectTarget>> {
        let settings = &self.inner.settings;
        let port = settings.serial_port()?;
        let baudrate = settings.baudrate()?;

        let options = self.inner.printer.connection_options()?;
        if port != AUTO_PORT {
            let refreshed = ports.iter().any(|p| *p == port);
            if !(options.has_port(&port) && refreshed) {
                return Ok(None);
            }
        }

        let period_secs = settings.detection_first_timeout()?;
        let period = Duration::try_from_secs_f64(period_secs)
            .ok()
            .filter(|p| !p.is_zero())
            .ok_or_else(|| {
                LauncherError::InvalidConfig(format!(
                    "serial.timeout.detectionFirst must be a positive number of seconds, got {}",
                    period_secs
                ))
            })?;
        let policy = RetryPolicy::covering(self.inner.max_wait, period)?;

        Ok(Some(ConnectTarget {
            port,
            baudrate,
            policy,
        }))
    }

    async fn start_cycle(&self, target: ConnectTarget) {
        let mut slot = self.inner.slot.lock().await;
        slot.generation += 1;
        if let Some(old) = slot.timer.take() {
            debug!(timer = old.name(), "Replacing running autoconnect timer");
        }
        slot.budget = Some(ConnectionAttemptBudget {
            attempts_made: 0,
            attempts_allowed: target.policy.max_attempts,
            period: target.policy.interval,
        });

        info!(
            port = %target.port,
            baudrate = target.baudrate,
            attempts = target.policy.max_attempts,
            period_ms = target.policy.interval.as_millis() as u64,
            window_secs = target.policy.span().as_secs(),
            "Starting autoconnect cycle"
        );

        let inner = Arc::clone(&self.inner);
        let generation = slot.generation;
        let policy = target.policy;
        slot.timer = Some(RetryTimer::spawn("autoconnect", policy, false, move |attempt| {
            let inner = Arc::clone(&inner);
            let port = target.port.clone();
            let baudrate = target.baudrate;
            async move { inner.attempt(generation, &port, baudrate, attempt).await }
        }));
    }
}

impl ConnectionInner {
    async fn attempt(&self, generation: u64, port: &str, baudrate: u32, attempt: u32) -> Tick {
        let mut slot = self.slot.lock().await;
        if slot.generation != generation {
            return Tick::Stop;
        }

        if self.printer.is_operational() {
            debug!(attempt, "Printer already operational");
        } else {
            info!(port = %port, baudrate, attempt, "Connecting to printer");
            if let Err(e) = self.printer.connect(port, baudrate) {
                warn!(error = %e, retryable = e.is_retryable(), attempt, "Connect attempt failed");
            }
        }

        let Some(budget) = slot.budget.as_mut() else {
            return Tick::Stop;
        };
        budget.attempts_made = attempt;

        if budget.is_exhausted() {
            info!(attempts = attempt, "Autoconnect budget used up");
            slot.budget = None;
            return Tick::Stop;
        }
        Tick::Continue
    }
}
