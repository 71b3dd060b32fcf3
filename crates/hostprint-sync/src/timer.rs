//! # Retry Timer
//!
//! Bounded, repeating scheduled actions backed by tokio tasks.
//!
//! ## Tick Schedule
//! ```text
//! run_first = true:    tick ── interval ── tick ── interval ── tick …
//!                      t=0                 t=i                 t=2i
//!
//! run_first = false:   ── interval ── tick ── interval ── tick …
//!                                     t=i                 t=2i
//!
//! Stops after max_attempts ticks, or as soon as a tick returns Tick::Stop.
//! ```
//!
//! A [`RetryTimer`] owns its task: dropping or replacing it aborts the task
//! at its next await point. Work that must not be cut short belongs in a
//! separately spawned task.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::error::{LauncherError, LauncherResult};

/// Interval and attempt budget for a [`RetryTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between ticks.
    pub interval: Duration,

    /// Maximum number of ticks.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy; `interval` must be non-zero.
    pub fn new(interval: Duration, max_attempts: u32) -> LauncherResult<Self> {
        if interval.is_zero() {
            return Err(LauncherError::InvalidConfig(
                "retry interval must be greater than zero".into(),
            ));
        }
        Ok(RetryPolicy {
            interval,
            max_attempts,
        })
    }

    /// Policy whose attempts span `total` at the given period: `ceil(total / period)`.
    pub fn covering(total: Duration, period: Duration) -> LauncherResult<Self> {
        let mut policy = Self::new(period, 0)?;
        let ratio = total.as_secs_f64() / period.as_secs_f64();
        policy.max_attempts = ratio.ceil().clamp(1.0, u32::MAX as f64) as u32;
        Ok(policy)
    }

    /// Total time the policy can keep retrying.
    pub fn span(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Per-tick decision returned by a timer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Keep ticking while the budget lasts.
    Continue,
    /// Stop the timer now.
    Stop,
}

/// A running retry loop. Aborted on drop.
#[derive(Debug)]
pub struct RetryTimer {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl RetryTimer {
    /// Spawns a repeating timer.
    ///
    /// `tick` receives the 1-based attempt number.
    pub fn spawn<F, Fut>(name: &'static str, policy: RetryPolicy, run_first: bool, mut tick: F) -> Self
    where
        F: FnMut(u32) -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let start = if run_first {
                Instant::now()
            } else {
                Instant::now() + policy.interval
            };
            let mut ticker = interval_at(start, policy.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for attempt in 1..=policy.max_attempts {
                ticker.tick().await;
                debug!(timer = name, attempt, max = policy.max_attempts, "Retry tick");

                if tick(attempt).await == Tick::Stop {
                    debug!(timer = name, attempt, "Retry timer stopped");
                    return;
                }
            }

            debug!(timer = name, "Retry budget exhausted");
        });

        RetryTimer { name, handle }
    }

    /// Spawns a one-shot action after `delay`.
    pub fn once<Fut>(name: &'static str, delay: Duration, action: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(timer = name, "One-shot timer fired");
            action.await;
        });

        RetryTimer { name, handle }
    }

    /// Timer name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true once the loop ended or was aborted.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Aborts the timer.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            debug!(timer = self.name, "Retry timer cancelled");
            self.handle.abort();
        }
    }
}
