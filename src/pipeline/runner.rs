//! Pipeline owner: channels, worker threads and the caller-facing API.
//!
//! [`Pipeline`] owns the three single-slot channels, the shutdown flag and
//! both worker threads.  The caller drives it from its ingestion thread:
//!
//! ```text
//! add_frame ─▶ SegmentAccumulator ─▶ [segments] ─▶ periodogram thread
//!                                                    │
//!            get_result ◀─ [results] ◀─ noise thread ◀─ [periodograms]
//! ```
//!
//! `start` drains and reopens every channel and spawns the workers; `stop`
//! raises the shutdown flag, closes and drains every channel and joins the
//! workers.  A stopped pipeline rejects frames immediately.

use std::fmt;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{ConfigError, PipelineConfig};
use crate::dsp::{
    make_window, NoiseEstimate, NoiseFloor, Periodogram, PeriodogramEstimator, Segment, Window,
};

use super::accumulator::{FrameStatus, SegmentAccumulator};
use super::channel::{BoundedChannel, HandoffError};
use super::state::{PipelineState, SharedStats, ShutdownFlag, StatsSnapshot};
use super::worker::{noise_integrator, periodogram_worker, StageLinks};

/// Upper bound on every blocking offer/poll in the pipeline.
pub const HANDOFF_TIMEOUT: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors returned to the ingestion thread.
#[derive(Debug)]
pub enum PipelineError {
    /// The frame does not carry one sample per channel.
    FrameLength { expected: usize, got: usize },
    /// `add_frame` was called while the pipeline is stopped.
    NotRunning,
    /// A due segment could not be handed to the periodogram stage.
    Handoff(HandoffError),
    /// A worker thread could not be spawned.
    Spawn(std::io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::FrameLength { expected, got } => {
                write!(f, "frame has {got} samples, expected {expected}")
            }
            PipelineError::NotRunning => write!(f, "pipeline is not running"),
            PipelineError::Handoff(e) => write!(f, "segment handoff failed: {e}"),
            PipelineError::Spawn(e) => write!(f, "failed to spawn worker: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Handoff(e) => Some(e),
            PipelineError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HandoffError> for PipelineError {
    fn from(e: HandoffError) -> Self {
        PipelineError::Handoff(e)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Real-time Welch noise-floor pipeline.
///
/// ```rust,no_run
/// use welch_noise::config::PipelineConfig;
/// use welch_noise::pipeline::Pipeline;
///
/// let config = PipelineConfig {
///     seg_length: 100,
///     seg_overlap: 50,
///     frame_size: 2,
///     ..PipelineConfig::default()
/// };
/// let mut pipeline = Pipeline::new(config).unwrap();
/// pipeline.start().unwrap();
///
/// for i in 0..1_000 {
///     let x = (i as f64 * 0.1).sin();
///     let _ = pipeline.add_frame(&[x, -x]);
///     if pipeline.result_available() {
///         println!("noise floor: {:?}", pipeline.get_result());
///     }
/// }
/// pipeline.stop();
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    window: Window,
    accumulator: SegmentAccumulator,
    segments: BoundedChannel<Segment>,
    periodograms: BoundedChannel<Periodogram>,
    results: BoundedChannel<NoiseEstimate>,
    shutdown: ShutdownFlag,
    workers: Vec<JoinHandle<()>>,
    state: PipelineState,
    last_result: Option<NoiseEstimate>,
    stats: SharedStats,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("last_result", &self.last_result)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validate `config` and build a stopped pipeline.
    ///
    /// An out-of-range overlap is clamped to 0 and a window of the wrong
    /// length is replaced by a rectangular one; neither is an error.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when `seg_length <= 1` or `frame_size == 0`.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let window = make_window(config.seg_length, config.window.as_deref());

        let segments = BoundedChannel::new();
        let periodograms = BoundedChannel::new();
        let results = BoundedChannel::new();
        for ch in [&segments as &dyn Closable, &periodograms, &results] {
            ch.close_now();
        }

        let stats = SharedStats::default();
        let accumulator = SegmentAccumulator::new(
            config.seg_length,
            config.seg_overlap,
            config.frame_size,
            segments.clone(),
            HANDOFF_TIMEOUT,
            stats.clone(),
        );

        log::info!(
            "pipeline: seg_length={} seg_overlap={} frame_size={}",
            config.seg_length,
            config.seg_overlap,
            config.frame_size
        );

        Ok(Self {
            config,
            window,
            accumulator,
            segments,
            periodograms,
            results,
            shutdown: ShutdownFlag::new(),
            workers: Vec::new(),
            state: PipelineState::Stopped,
            last_result: None,
            stats,
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Reset the channels and spawn both workers.  No-op while running.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Spawn`] if the OS refuses a thread; the pipeline is
    /// left stopped.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.state.is_running() {
            return Ok(());
        }

        self.segments.reset();
        self.periodograms.reset();
        self.results.reset();
        self.shutdown = ShutdownFlag::new();

        let spectral = StageLinks {
            input: self.segments.clone(),
            output: self.periodograms.clone(),
            shutdown: self.shutdown.clone(),
            timeout: HANDOFF_TIMEOUT,
            stats: self.stats.clone(),
        };
        let estimator = PeriodogramEstimator::new(self.config.frame_size, self.window.clone());
        let spawned = thread::Builder::new()
            .name("welch-periodogram".into())
            .spawn(move || periodogram_worker(spectral, estimator));
        self.push_worker(spawned)?;

        let integrating = StageLinks {
            input: self.periodograms.clone(),
            output: self.results.clone(),
            shutdown: self.shutdown.clone(),
            timeout: HANDOFF_TIMEOUT,
            stats: self.stats.clone(),
        };
        let noise = NoiseFloor::new(
            self.config.noise_scale,
            self.config.sample_rate,
            self.config.noise_estimate_fraction,
        );
        let spawned = thread::Builder::new()
            .name("welch-noise".into())
            .spawn(move || noise_integrator(integrating, noise));
        self.push_worker(spawned)?;

        self.state = PipelineState::Running;
        log::info!("pipeline: started");
        Ok(())
    }

    fn push_worker(&mut self, spawned: std::io::Result<JoinHandle<()>>) -> Result<(), PipelineError> {
        match spawned {
            Ok(handle) => {
                self.workers.push(handle);
                Ok(())
            }
            Err(e) => {
                self.shutdown_and_join();
                Err(PipelineError::Spawn(e))
            }
        }
    }

    /// Signal shutdown, drain every channel and join both workers.
    /// No-op while stopped.
    pub fn stop(&mut self) {
        if !self.state.is_running() {
            return;
        }
        self.shutdown_and_join();
        self.state = PipelineState::Stopped;
        log::info!("pipeline: stopped");
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.trigger();
        for ch in [&self.segments as &dyn Closable, &self.periodograms, &self.results] {
            ch.close_now();
            ch.drain_now();
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("pipeline: worker thread panicked");
            }
        }

        // A worker may have slipped one item in between close and join.
        for ch in [&self.segments as &dyn Closable, &self.periodograms, &self.results] {
            ch.drain_now();
        }
    }

    // -----------------------------------------------------------------------
    // Ingestion / results
    // -----------------------------------------------------------------------

    /// Feed one frame (one sample per channel).
    ///
    /// Returns within [`HANDOFF_TIMEOUT`] regardless of downstream load.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NotRunning`]: the pipeline is stopped.
    /// - [`PipelineError::FrameLength`]: wrong number of samples.
    /// - [`PipelineError::Handoff`]: a due segment was dropped.
    pub fn add_frame(&mut self, frame: &[f64]) -> Result<FrameStatus, PipelineError> {
        if !self.state.is_running() || self.shutdown.is_set() {
            return Err(PipelineError::NotRunning);
        }
        self.accumulator.add_frame(frame)
    }

    /// `true` when a new estimate is waiting.  Never blocks.
    pub fn result_available(&self) -> bool {
        self.results.has_pending()
    }

    /// Consume a pending estimate if there is one, otherwise return the last
    /// one seen.  `None` until the first estimate arrives.  Never blocks.
    pub fn get_result(&mut self) -> Option<NoiseEstimate> {
        if let Some(estimate) = self.results.try_take() {
            self.last_result = Some(estimate);
        }
        self.last_result
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The validated configuration (overlap already clamped).
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The window in effect.
    pub fn window(&self) -> &[f64] {
        &self.window
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Type-erased close/drain so the three differently-typed channels can be
/// handled in one loop.
trait Closable {
    fn close_now(&self);
    fn drain_now(&self);
}

impl<T> Closable for BoundedChannel<T> {
    fn close_now(&self) {
        self.close();
    }

    fn drain_now(&self) {
        self.drain();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
