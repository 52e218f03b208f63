//! Real-time segmentation and the background spectral stages.
//!
//! # Architecture
//!
//! ```text
//! caller thread                 welch-periodogram           welch-noise
//! ─────────────                 ─────────────────           ───────────
//! add_frame(frame)
//!   └─ SegmentAccumulator
//!        │ every hop frames
//!        ▼
//!   [segments: cap 1] ─────────▶ PeriodogramEstimator
//!                                  │
//!                                  ▼
//!                         [periodograms: cap 1] ─────────▶ NoiseFloor
//!                                                            │
//!   get_result() ◀──────────────────────── [results: cap 1] ◀┘
//! ```
//!
//! Every offer and poll waits at most [`HANDOFF_TIMEOUT`].  A unit that
//! cannot be handed over is dropped, never retried.  The [`ShutdownFlag`]
//! is checked around every poll so `stop` completes within one timeout.

pub mod accumulator;
pub mod channel;
pub mod runner;
pub mod state;
pub mod worker;

pub use accumulator::{FrameStatus, SegmentAccumulator};
pub use channel::{BoundedChannel, HandoffError};
pub use runner::{Pipeline, PipelineError, HANDOFF_TIMEOUT};
pub use state::{PipelineState, PipelineStats, SharedStats, ShutdownFlag, StatsSnapshot};
