//! Health/readiness state machine for the resident model
//!
//! One instance exists per server process. Transitions follow
//! `Unloaded -> Loading -> {Ready | Failed}` with a `Ready <-> Degraded`
//! cycle driven by the dispatcher's prediction outcomes. `Failed` is
//! terminal; the external orchestrator owns restart policy.
//!
//! Reads are lock-free atomic snapshots. Transitions are serialized behind
//! a single mutex so there is exactly one writer at a time.

use crate::config::DegradedConfig;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Lifecycle state of the resident model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    Degraded,
    Failed,
}

impl ModelState {
    fn as_u8(self) -> u8 {
        match self {
            ModelState::Unloaded => 0,
            ModelState::Loading => 1,
            ModelState::Ready => 2,
            ModelState::Degraded => 3,
            ModelState::Failed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ModelState::Unloaded,
            1 => ModelState::Loading,
            2 => ModelState::Ready,
            3 => ModelState::Degraded,
            _ => ModelState::Failed,
        }
    }
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Unloaded => write!(f, "unloaded"),
            ModelState::Loading => write!(f, "loading"),
            ModelState::Ready => write!(f, "ready"),
            ModelState::Degraded => write!(f, "degraded"),
            ModelState::Failed => write!(f, "failed"),
        }
    }
}

/// Tracks consecutive prediction failures within a sliding window
#[derive(Debug)]
struct DegradeTracker {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Concurrency-safe owner of the process-wide [`ModelState`]
#[derive(Debug)]
pub struct HealthState {
    state: AtomicU8,
    tracker: Mutex<DegradeTracker>,
    threshold: u32,
    window: Duration,
}

impl HealthState {
    /// Create a new state machine in the `Unloaded` state
    pub fn new(config: &DegradedConfig) -> Self {
        Self {
            state: AtomicU8::new(ModelState::Unloaded.as_u8()),
            tracker: Mutex::new(DegradeTracker {
                consecutive_failures: 0,
                last_failure: None,
            }),
            threshold: config.threshold,
            window: Duration::from_secs(config.window_seconds),
        }
    }

    /// Lock-free snapshot of the current state
    pub fn snapshot(&self) -> ModelState {
        ModelState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Liveness: healthy unless the model has terminally failed
    pub fn is_live(&self) -> bool {
        self.snapshot() != ModelState::Failed
    }

    /// Readiness: only `Ready` receives new traffic; `Degraded` does not
    pub fn is_ready(&self) -> bool {
        self.snapshot() == ModelState::Ready
    }

    /// Whether the model holds loaded parameters (`Ready` or `Degraded`)
    pub fn is_loaded(&self) -> bool {
        matches!(self.snapshot(), ModelState::Ready | ModelState::Degraded)
    }

    /// Enter `Loading` at process start
    pub fn begin_loading(&self) {
        let tracker = self.lock_tracker();
        if self.snapshot() == ModelState::Unloaded {
            info!("model state: unloaded -> loading");
            self.store(ModelState::Loading);
        }
        drop(tracker);
    }

    /// Record a successful `load()`
    pub fn mark_ready(&self) {
        let tracker = self.lock_tracker();
        if self.snapshot() == ModelState::Loading {
            info!("model state: loading -> ready");
            self.store(ModelState::Ready);
        }
        drop(tracker);
    }

    /// Record a fatal load failure; the state never leaves `Failed`
    pub fn mark_failed(&self, reason: &str) {
        let tracker = self.lock_tracker();
        let current = self.snapshot();
        if current != ModelState::Failed {
            warn!("model state: {} -> failed: {}", current, reason);
            self.store(ModelState::Failed);
        }
        drop(tracker);
    }

    /// Record a successful prediction outcome.
    ///
    /// Clears the failure streak and restores `Ready` from `Degraded`.
    pub fn record_success(&self) {
        let mut tracker = self.lock_tracker();
        tracker.consecutive_failures = 0;
        tracker.last_failure = None;

        if self.snapshot() == ModelState::Degraded {
            info!("model state: degraded -> ready");
            self.store(ModelState::Ready);
        }
    }

    /// Record a failed prediction outcome.
    ///
    /// Enters `Degraded` once the consecutive-failure streak within the
    /// sliding window reaches the configured threshold.
    pub fn record_failure(&self) {
        let mut tracker = self.lock_tracker();

        let now = Instant::now();
        match tracker.last_failure {
            Some(last) if now.duration_since(last) > self.window => {
                // The streak fell out of the window; this failure starts a new one.
                tracker.consecutive_failures = 1;
            }
            _ => tracker.consecutive_failures += 1,
        }
        tracker.last_failure = Some(now);

        if tracker.consecutive_failures >= self.threshold && self.snapshot() == ModelState::Ready {
            warn!(
                "model state: ready -> degraded after {} consecutive prediction failures",
                tracker.consecutive_failures
            );
            self.store(ModelState::Degraded);
        }
    }

    fn lock_tracker(&self) -> std::sync::MutexGuard<'_, DegradeTracker> {
        // A poisoned lock means a panicking writer; the tracker holds only
        // counters, so continuing with its last value is sound.
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(&self, state: ModelState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}
