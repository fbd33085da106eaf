//! Two-phase keep-alive scheduler for the platform connector.
//!
//! The connector needs a regular "platform tick" from the moment the
//! session object exists. The host's own per-frame callback only starts
//! once its load sequence has finished, and that load sequence includes
//! the session's initialization. The scheduler bridges the gap:
//!
//! ```text
//!  start()                 first on_frame()
//!    │  fallback timer (20 ms) │  one signal per frame
//!    ├──●──●──●──●──●──●──●──●─┼──■──■──■──■──■── …
//!    │        Loading          │      FrameDriven
//! ```
//!
//! The first [`KeepAliveScheduler::on_frame`] cancels the fallback timer
//! exactly once; from then on the host's frame callback is the only
//! source of keep-alive signals.
//!
//! # Integration
//!
//! ```ignore
//! let mut keep_alive = KeepAliveScheduler::start(
//!     KeepAliveConfig::default(),
//!     move || { let _ = bridge.send(Request::PlatformTick); },
//! );
//! // … later, from the host's per-frame callback:
//! keep_alive.on_frame();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant as TokioInstant, MissedTickBehavior};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Receives keep-alive signals.
///
/// Implemented for any `Fn()` closure, which is how the session layer
/// plugs in "send `platform-tick` to the connector".
pub trait KeepAlive: Send + Sync + 'static {
    /// Emits one keep-alive signal. Must not block.
    fn keep_alive(&self);
}

impl<F> KeepAlive for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn keep_alive(&self) {
        self()
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the keep-alive scheduler.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval of the fallback timer used until the first frame.
    /// Default: 20 ms.
    pub fallback_interval: Duration,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            fallback_interval: Duration::from_millis(20),
        }
    }
}

impl KeepAliveConfig {
    /// Shortest accepted fallback interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);
    /// Longest accepted fallback interval.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(1);

    /// Creates a config with a specific fallback interval.
    pub fn with_interval(fallback_interval: Duration) -> Self {
        Self { fallback_interval }
    }

    /// Clamps the fallback interval to
    /// [`MIN_INTERVAL`](Self::MIN_INTERVAL)..=[`MAX_INTERVAL`](Self::MAX_INTERVAL).
    ///
    /// Called automatically by [`KeepAliveScheduler::start`].
    pub fn validated(mut self) -> Self {
        let clamped = self
            .fallback_interval
            .clamp(Self::MIN_INTERVAL, Self::MAX_INTERVAL);
        if clamped != self.fallback_interval {
            warn!(
                requested_ms = self.fallback_interval.as_secs_f64() * 1000.0,
                clamped_ms = clamped.as_secs_f64() * 1000.0,
                "fallback_interval out of range, clamping"
            );
            self.fallback_interval = clamped;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Phase and metrics
// ---------------------------------------------------------------------------

/// Which source is currently producing keep-alive signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAlivePhase {
    /// The fallback timer is running; no frame has been seen yet.
    Loading,
    /// The host's frame callback drives the signal.
    FrameDriven,
    /// Torn down; no further signals.
    Stopped,
}

/// Counts of signals emitted by each source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepAliveMetrics {
    /// Signals emitted by the fallback timer.
    pub fallback_ticks: u64,
    /// Signals emitted from `on_frame`.
    pub frame_ticks: u64,
}

impl KeepAliveMetrics {
    /// All signals emitted so far.
    pub fn total(&self) -> u64 {
        self.fallback_ticks + self.frame_ticks
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Drives the keep-alive signal across the load-time gap.
///
/// Dropping the scheduler cancels the fallback timer.
pub struct KeepAliveScheduler {
    config: KeepAliveConfig,
    sink: Arc<dyn KeepAlive>,
    /// `Some` exactly while the fallback timer is live. Taking it is the
    /// one-shot cancellation.
    fallback: Option<JoinHandle<()>>,
    fallback_ticks: Arc<AtomicU64>,
    frame_ticks: u64,
    phase: KeepAlivePhase,
}

impl KeepAliveScheduler {
    /// Starts the fallback timer. The first signal fires one interval
    /// after this call.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: KeepAliveConfig, sink: impl KeepAlive) -> Self {
        let config = config.validated();
        let sink: Arc<dyn KeepAlive> = Arc::new(sink);
        let fallback_ticks = Arc::new(AtomicU64::new(0));

        let fallback = tokio::spawn(run_fallback(
            config.fallback_interval,
            Arc::clone(&sink),
            Arc::clone(&fallback_ticks),
        ));

        debug!(
            interval_ms = config.fallback_interval.as_secs_f64() * 1000.0,
            "keep-alive fallback timer started"
        );

        Self {
            config,
            sink,
            fallback: Some(fallback),
            fallback_ticks,
            frame_ticks: 0,
            phase: KeepAlivePhase::Loading,
        }
    }

    /// Host per-frame callback.
    ///
    /// The first call cancels the fallback timer; every call emits one
    /// signal. Does nothing once the scheduler is stopped.
    pub fn on_frame(&mut self) {
        match self.phase {
            KeepAlivePhase::Stopped => return,
            KeepAlivePhase::Loading => {
                self.cancel_fallback();
                self.phase = KeepAlivePhase::FrameDriven;
                debug!(
                    fallback_ticks = self.fallback_ticks.load(Ordering::Relaxed),
                    "first frame, keep-alive now frame-driven"
                );
            }
            KeepAlivePhase::FrameDriven => {}
        }

        self.frame_ticks += 1;
        trace!(frame = self.frame_ticks, "keep-alive (frame)");
        self.sink.keep_alive();
    }

    /// Cancels the fallback timer. Returns `true` only for the call that
    /// actually cancelled it; later calls are no-ops.
    pub fn cancel_fallback(&mut self) -> bool {
        match self.fallback.take() {
            Some(handle) => {
                handle.abort();
                debug!("keep-alive fallback timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Stops all keep-alive signalling. Safe to call multiple times.
    pub fn stop(&mut self) {
        if self.phase != KeepAlivePhase::Stopped {
            self.cancel_fallback();
            self.phase = KeepAlivePhase::Stopped;
            debug!(frames = self.frame_ticks, "keep-alive stopped");
        }
    }

    /// Current phase.
    pub fn phase(&self) -> KeepAlivePhase {
        self.phase
    }

    /// Whether the fallback timer is still live.
    pub fn is_fallback_active(&self) -> bool {
        self.fallback.is_some()
    }

    /// Snapshot of signal counts.
    pub fn metrics(&self) -> KeepAliveMetrics {
        KeepAliveMetrics {
            fallback_ticks: self.fallback_ticks.load(Ordering::Relaxed),
            frame_ticks: self.frame_ticks,
        }
    }

    /// The validated configuration in use.
    pub fn config(&self) -> &KeepAliveConfig {
        &self.config
    }
}

impl Drop for KeepAliveScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.fallback.take() {
            handle.abort();
        }
    }
}

/// Fallback timer loop. Runs until aborted.
async fn run_fallback(
    period: Duration,
    sink: Arc<dyn KeepAlive>,
    ticks: Arc<AtomicU64>,
) {
    let mut interval = time::interval_at(TokioInstant::now() + period, period);
    // A stalled runtime shouldn't produce a burst of catch-up signals.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(tick = n, "keep-alive (fallback)");
        sink.keep_alive();
    }
}
