//! Periodic and on-demand sync scheduling
//!
//! The Scheduler owns the only task that runs sync cycles, so at most one
//! cycle is ever in flight.
//!
//! ## Triggers
//!
//! - **Periodic**: every `check_interval` (at least one second), first tick
//!   after `startup_delay`. Ticks that fall during a running cycle are
//!   dropped, not queued.
//! - **Manual**: [`SchedulerHandle::refresh_now`]. Ignored while a cycle is
//!   running or another request is pending. A manual run restarts the
//!   periodic countdown.
//!
//! ## Event Flow
//!
//! 1. Trigger fires
//! 2. Snapshot the tracked records from the watch channel
//! 3. `SyncEngine::sync()`
//! 4. Publish [`ScheduleStatus`] and emit a [`SchedulerEvent`]
//!
//! Events go through a bounded channel. When it is full the event is
//! dropped and a warning is logged; the scheduler never blocks on its
//! consumers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::DdnsConfig;
use crate::engine::SyncEngine;
use crate::error::Result;
use crate::types::{SyncResult, SyncSummary, TrackedRecord};

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Interval tick (including the first run after startup)
    Periodic,
    /// [`SchedulerHandle::refresh_now`]
    Manual,
}

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A cycle produced per-record results
    CycleCompleted {
        trigger: Trigger,
        results: Vec<SyncResult>,
        finished_at: DateTime<Utc>,
    },

    /// A cycle failed before processing records
    CycleFailed { trigger: Trigger, error: String },
}

/// Observable scheduler state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleStatus {
    /// When the last cycle finished
    pub last_run: Option<DateTime<Utc>>,
    /// When the next periodic cycle is due
    pub next_run: Option<DateTime<Utc>>,
    /// Whether a cycle is in progress
    pub running: bool,
    /// Counts of the last successful cycle
    pub last_summary: Option<SyncSummary>,
}

/// Scheduler timing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub check_interval: Duration,
    pub startup_delay: Duration,
    pub event_channel_capacity: usize,
}

impl SchedulerConfig {
    /// Timing taken from a [`DdnsConfig`]
    pub fn from_config(config: &DdnsConfig) -> Self {
        Self {
            check_interval: Duration::from_secs(config.check_interval_secs),
            startup_delay: Duration::from_secs(config.startup_delay_secs),
            event_channel_capacity: config.event_channel_capacity,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_config(&DdnsConfig::default())
    }
}

/// Cloneable control handle for a running [`Scheduler`]
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    refresh_tx: mpsc::Sender<()>,
    status_rx: watch::Receiver<ScheduleStatus>,
    running: Arc<AtomicBool>,
}

impl SchedulerHandle {
    /// Request an immediate cycle
    ///
    /// Returns `false` without doing anything when a cycle is running or a
    /// request is already pending.
    pub fn refresh_now(&self) -> bool {
        if self.running.load(Ordering::SeqCst) {
            debug!("Refresh requested during a running cycle, ignoring");
            return false;
        }

        match self.refresh_tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Refresh already pending, ignoring");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Refresh requested but the scheduler has stopped");
                false
            }
        }
    }

    /// Current scheduler state
    pub fn status(&self) -> ScheduleStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch scheduler state changes
    pub fn subscribe_status(&self) -> watch::Receiver<ScheduleStatus> {
        self.status_rx.clone()
    }
}

/// Runs sync cycles on a timer and on demand
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`]
/// 2. Start with [`Scheduler::run()`] (or `run_with_shutdown`)
/// 3. Runs until the shutdown signal; a cycle in progress is cancelled
///    between records and its results are still emitted
pub struct Scheduler {
    engine: Arc<SyncEngine>,
    records: watch::Receiver<Vec<TrackedRecord>>,
    config: SchedulerConfig,
    refresh_rx: mpsc::Receiver<()>,
    status_tx: watch::Sender<ScheduleStatus>,
    running: Arc<AtomicBool>,
    event_tx: mpsc::Sender<SchedulerEvent>,
}

/// Shortest accepted period; `tokio::time::interval` rejects zero
const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, handle, event_receiver)
    pub fn new(
        engine: Arc<SyncEngine>,
        records: watch::Receiver<Vec<TrackedRecord>>,
        mut config: SchedulerConfig,
    ) -> (Self, SchedulerHandle, mpsc::Receiver<SchedulerEvent>) {
        config.check_interval = config.check_interval.max(MIN_CHECK_INTERVAL);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (status_tx, status_rx) = watch::channel(ScheduleStatus::default());
        let running = Arc::new(AtomicBool::new(false));

        let handle = SchedulerHandle {
            refresh_tx,
            status_rx,
            running: running.clone(),
        };

        let scheduler = Self {
            engine,
            records,
            config,
            refresh_rx,
            status_tx,
            running,
            event_tx,
        };

        (scheduler, handle, event_rx)
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run until `shutdown_rx` resolves (or Ctrl-C when `None`)
    ///
    /// A dropped sender counts as a shutdown signal.
    pub async fn run_with_shutdown(
        mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        let mut shutdown: ShutdownSignal = match shutdown_rx {
            Some(rx) => Box::pin(async move {
                let _ = rx.await;
            }),
            None => Box::pin(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }),
        };

        self.engine.reset_cancel();

        let period = self.config.check_interval;
        let first = Instant::now() + self.config.startup_delay;
        let mut interval = tokio::time::interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut next_deadline = first;
        self.publish_next_run(next_deadline);

        info!(
            "Scheduler started (interval {}s, startup delay {}s)",
            period.as_secs(),
            self.config.startup_delay.as_secs()
        );

        loop {
            let trigger = tokio::select! {
                _ = shutdown.as_mut() => {
                    info!("Shutdown signal received");
                    break;
                }
                tick = interval.tick() => {
                    next_deadline = tick + period;
                    Trigger::Periodic
                }
                Some(()) = self.refresh_rx.recv() => Trigger::Manual,
            };

            let stopped = self.run_cycle(trigger, &mut shutdown).await;

            let now = Instant::now();
            if trigger == Trigger::Manual {
                next_deadline = now + period;
            }
            // Ticks that fell during the cycle are dropped, not fired late
            while next_deadline <= now {
                next_deadline += period;
            }
            interval.reset_at(next_deadline);
            self.publish_next_run(next_deadline);

            if stopped {
                break;
            }
        }

        self.status_tx.send_modify(|status| status.next_run = None);
        info!("Scheduler stopped");
        Ok(())
    }

    /// Run one cycle; returns `true` when shutdown was requested meanwhile
    async fn run_cycle(&mut self, trigger: Trigger, shutdown: &mut ShutdownSignal) -> bool {
        self.running.store(true, Ordering::SeqCst);
        self.status_tx.send_modify(|status| status.running = true);

        let records = self.records.borrow().clone();
        debug!("Starting {:?} cycle for {} records", trigger, records.len());

        let engine = self.engine.clone();
        let cycle = engine.sync(&records, None);
        tokio::pin!(cycle);

        let mut stopping = false;
        let outcome = loop {
            tokio::select! {
                outcome = &mut cycle => break outcome,
                _ = shutdown.as_mut(), if !stopping => {
                    info!("Shutdown requested, cancelling the running cycle");
                    engine.cancel();
                    stopping = true;
                }
            }
        };

        let finished_at = Utc::now();
        let summary = match outcome {
            Ok(results) => {
                let summary = SyncSummary::from(results.as_slice());
                info!("{:?} cycle finished: {}", trigger, summary);
                self.emit_event(SchedulerEvent::CycleCompleted {
                    trigger,
                    results,
                    finished_at,
                });
                Some(summary)
            }
            Err(e) => {
                error!("{:?} cycle failed: {}", trigger, e);
                self.emit_event(SchedulerEvent::CycleFailed {
                    trigger,
                    error: e.to_string(),
                });
                None
            }
        };

        // Requests that slipped in during the cycle are coalesced into it
        while self.refresh_rx.try_recv().is_ok() {}
        self.running.store(false, Ordering::SeqCst);

        self.status_tx.send_modify(|status| {
            status.running = false;
            status.last_run = Some(finished_at);
            if summary.is_some() {
                status.last_summary = summary;
            }
        });

        stopping
    }

    fn publish_next_run(&self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let next_run = chrono::Duration::from_std(remaining)
            .ok()
            .map(|remaining| Utc::now() + remaining);
        self.status_tx.send_modify(|status| status.next_run = next_run);
    }

    /// Emit a scheduler event
    fn emit_event(&self, event: SchedulerEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "Event channel full, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }
}
