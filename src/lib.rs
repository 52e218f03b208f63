//! Real-time Welch noise-floor estimation.
//!
//! Frames of synchronized multi-channel samples are fed into a
//! [`pipeline::Pipeline`] from a real-time thread.  Overlapping segments are
//! handed through single-slot, timeout-bounded channels to two background
//! threads that compute a channel-averaged periodogram and reduce its
//! high-frequency tail to one noise-floor estimate per segment.
//!
//! * [`config`]: pipeline knobs and `settings.toml` persistence.
//! * [`dsp`]: windows, periodogram folding, noise-floor reduction.
//! * [`pipeline`]: accumulator, channels, workers and the `Pipeline` owner.
//! * [`input`]: little-endian `f32` recordings for offline runs.

pub mod config;
pub mod dsp;
pub mod input;
pub mod pipeline;
