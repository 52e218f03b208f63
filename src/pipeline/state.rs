//! Pipeline lifecycle state, shutdown flag and shared counters.
//!
//! [`PipelineState`] tracks whether the worker threads are up.
//! [`ShutdownFlag`] is the single "pipeline is stopping" signal shared by the
//! caller and both workers.  [`PipelineStats`] holds atomic counters each
//! stage bumps as it moves (or drops) data; [`StatsSnapshot`] is a plain
//! copy for reporting.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use serde::Serialize;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// Lifecycle of a [`Pipeline`](super::Pipeline).
///
/// ```text
/// Stopped ──start()──▶ Running ──stop() / drop──▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// No worker threads; `add_frame` is rejected.
    #[default]
    Stopped,

    /// Both workers are spawned and the channels are open.
    Running,
}

impl PipelineState {
    /// ```
    /// use welch_noise::pipeline::PipelineState;
    ///
    /// assert!(PipelineState::Running.is_running());
    /// assert!(!PipelineState::Stopped.is_running());
    /// ```
    pub fn is_running(&self) -> bool {
        matches!(self, PipelineState::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Stopped => "Stopped",
            PipelineState::Running => "Running",
        }
    }
}

// ---------------------------------------------------------------------------
// ShutdownFlag
// ---------------------------------------------------------------------------

/// Shared cancellation flag. Once triggered it stays set.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// PipelineStats
// ---------------------------------------------------------------------------

/// Counters shared between the caller thread and the workers.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub frames: AtomicU64,
    pub segments_emitted: AtomicU64,
    pub segments_dropped: AtomicU64,
    pub periodograms: AtomicU64,
    pub periodograms_dropped: AtomicU64,
    pub estimates: AtomicU64,
    pub estimates_dropped: AtomicU64,
}

/// Cheap-to-clone handle to [`PipelineStats`].
pub type SharedStats = Arc<PipelineStats>;

impl PipelineStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            frames: get(&self.frames),
            segments_emitted: get(&self.segments_emitted),
            segments_dropped: get(&self.segments_dropped),
            periodograms: get(&self.periodograms),
            periodograms_dropped: get(&self.periodograms_dropped),
            estimates: get(&self.estimates),
            estimates_dropped: get(&self.estimates_dropped),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Frames accepted by `add_frame`.
    pub frames: u64,
    /// Segments handed to the periodogram worker.
    pub segments_emitted: u64,
    /// Segments lost because the handoff failed.
    pub segments_dropped: u64,
    /// Periodograms handed to the noise integrator.
    pub periodograms: u64,
    pub periodograms_dropped: u64,
    /// Estimates placed in the result slot.
    pub estimates: u64,
    pub estimates_dropped: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_stopped() {
        assert_eq!(PipelineState::default(), PipelineState::Stopped);
        assert_eq!(PipelineState::Running.label(), "Running");
    }

    #[test]
    fn shutdown_flag_is_shared_between_clones() {
        let flag = ShutdownFlag::new();
        let other = flag.clone();
        assert!(!other.is_set());
        flag.trigger();
        assert!(other.is_set());
    }

    #[test]
    fn snapshot_reflects_bumps() {
        let stats = PipelineStats::default();
        PipelineStats::bump(&stats.frames);
        PipelineStats::bump(&stats.frames);
        PipelineStats::bump(&stats.segments_dropped);

        let snap = stats.snapshot();
        assert_eq!(snap.frames, 2);
        assert_eq!(snap.segments_dropped, 1);
        assert_eq!(snap.estimates, 0);
    }
}
