//! Spectral algorithms: windowing, periodogram folding and noise-floor
//! reduction.
//!
//! # Pipeline
//!
//! ```text
//! Segment → PeriodogramEstimator → Periodogram → NoiseFloor → NoiseEstimate
//! ```
//!
//! Everything here is single-threaded and allocation-light; the threading
//! lives in [`crate::pipeline`].

pub mod noise;
pub mod periodogram;
pub mod segment;
pub mod window;

pub use noise::NoiseFloor;
pub use periodogram::{PeriodogramEstimator, SpectrumError};
pub use segment::{NoiseEstimate, Periodogram, Segment};
pub use window::{make_window, Window};
