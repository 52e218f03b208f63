//! Segment → averaged one-sided periodogram.
//!
//! # Steps per channel
//!
//! ```text
//! samples → demean → × window → real FFT → packed half-complex
//!         → |X|² folded to one side → × 1/Σw² → ÷ channels → accumulate
//! ```
//!
//! # Packed half-complex layout
//!
//! The forward transform of an `n`-point real signal is stored in `n` reals:
//!
//! | index        | even `n`        | odd `n`               |
//! |--------------|-----------------|-----------------------|
//! | `0`          | `Re[0]`         | `Re[0]`               |
//! | `1`          | `Re[n/2]`       | `Im[(n-1)/2]`         |
//! | `2k`, `2k+1` | `Re[k]`,`Im[k]` | `Re[k]`,`Im[k]`       |
//!
//! `realfft` returns `n/2 + 1` complex bins; [`pack_half_complex`] re-packs
//! them into this layout and [`packed_to_periodogram`] folds it into the
//! one-sided estimate.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use thiserror::Error;

use super::segment::{Periodogram, Segment};
use super::window::{power_scale, Window};

// ---------------------------------------------------------------------------
// SpectrumError
// ---------------------------------------------------------------------------

/// Failures while turning a segment into a periodogram.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpectrumError {
    /// The segment does not have the shape the estimator was built for.
    #[error(
        "segment shape {got_channels}x{got_len} does not match estimator {channels}x{seg_length}"
    )]
    Shape {
        channels: usize,
        seg_length: usize,
        got_channels: usize,
        got_len: usize,
    },

    /// The FFT backend rejected the buffers.
    #[error("FFT failed: {0}")]
    Fft(String),
}

impl From<realfft::FftError> for SpectrumError {
    fn from(e: realfft::FftError) -> Self {
        SpectrumError::Fft(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// Number of one-sided bins for an `n`-point segment.
pub fn periodogram_len(n: usize) -> usize {
    n / 2 + 1
}

/// Subtract the mean of `samples` and multiply by `window` into `out`.
pub fn demean_and_window(samples: &[f64], window: &[f64], out: &mut [f64]) {
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    for ((o, &x), &w) in out.iter_mut().zip(samples).zip(window) {
        *o = (x - mean) * w;
    }
}

/// Re-pack `n/2 + 1` complex bins of an `n`-point real FFT into the packed
/// half-complex layout (`packed.len() == n`).
pub fn pack_half_complex(bins: &[Complex<f64>], packed: &mut [f64]) {
    let n = packed.len();
    let half = n / 2;
    debug_assert_eq!(bins.len(), half + 1);

    packed[0] = bins[0].re;
    if n % 2 == 0 {
        packed[1] = bins[half].re;
        for k in 1..half {
            packed[2 * k] = bins[k].re;
            packed[2 * k + 1] = bins[k].im;
        }
    } else {
        packed[1] = bins[half].im;
        for k in 1..half {
            packed[2 * k] = bins[k].re;
            packed[2 * k + 1] = bins[k].im;
        }
        packed[2 * half] = bins[half].re;
    }
}

/// Fold a packed half-complex spectrum into a one-sided periodogram.
///
/// Every bin except DC (and Nyquist for even lengths) is doubled so the
/// one-sided sum carries the energy of the full spectrum.
pub fn packed_to_periodogram(spectrum: &[f64], scale: f64, out: &mut [f64]) {
    let n = spectrum.len();
    let last = periodogram_len(n) - 1;
    debug_assert_eq!(out.len(), last + 1);

    if n % 2 == 1 {
        for (i, p) in out.iter_mut().enumerate() {
            let mut v = spectrum[2 * i].powi(2);
            if i == last {
                v += spectrum[1].powi(2);
            } else if i != 0 {
                v += spectrum[2 * i + 1].powi(2);
            }
            if i != 0 {
                v *= 2.0;
            }
            *p = v * scale;
        }
    } else {
        for (i, p) in out.iter_mut().enumerate() {
            let mut v = if i == last {
                spectrum[1].powi(2)
            } else {
                spectrum[2 * i].powi(2)
            };
            if i > 0 && i < last {
                v += spectrum[2 * i + 1].powi(2);
                v *= 2.0;
            }
            *p = v * scale;
        }
    }
}

// ---------------------------------------------------------------------------
// PeriodogramEstimator
// ---------------------------------------------------------------------------

/// Computes one cross-channel averaged periodogram per segment.
///
/// Owns the FFT plan and its work buffers; each call returns a freshly
/// allocated [`Periodogram`] so the result can be moved downstream.
pub struct PeriodogramEstimator {
    seg_length: usize,
    channels: usize,
    window: Window,
    scale: f64,
    fft: Arc<dyn RealToComplex<f64>>,
    signal: Vec<f64>,
    spectrum: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    packed: Vec<f64>,
    channel_psd: Vec<f64>,
}

impl std::fmt::Debug for PeriodogramEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodogramEstimator")
            .field("seg_length", &self.seg_length)
            .field("channels", &self.channels)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl PeriodogramEstimator {
    /// Plan an estimator for `channels × window.len()` segments.
    pub fn new(channels: usize, window: Window) -> Self {
        let seg_length = window.len();
        let fft = RealFftPlanner::<f64>::new().plan_fft_forward(seg_length);
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        let scale = power_scale(&window);

        Self {
            seg_length,
            channels,
            window,
            scale,
            fft,
            signal: vec![0.0; seg_length],
            spectrum,
            scratch,
            packed: vec![0.0; seg_length],
            channel_psd: vec![0.0; periodogram_len(seg_length)],
        }
    }

    /// Periodogram scale `1 / Σ window²`.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Compute the channel-averaged periodogram of `segment`.
    ///
    /// # Errors
    ///
    /// [`SpectrumError::Shape`] when the segment does not match the
    /// estimator; [`SpectrumError::Fft`] if the transform fails.
    pub fn estimate(&mut self, segment: &Segment) -> Result<Periodogram, SpectrumError> {
        if segment.channels() != self.channels || segment.seg_length() != self.seg_length {
            return Err(SpectrumError::Shape {
                channels: self.channels,
                seg_length: self.seg_length,
                got_channels: segment.channels(),
                got_len: segment.seg_length(),
            });
        }

        let mut result = vec![0.0; periodogram_len(self.seg_length)];
        let weight = 1.0 / self.channels as f64;

        for channel in segment.iter_channels() {
            demean_and_window(channel, &self.window, &mut self.signal);
            self.fft
                .process_with_scratch(&mut self.signal, &mut self.spectrum, &mut self.scratch)?;
            pack_half_complex(&self.spectrum, &mut self.packed);
            packed_to_periodogram(&self.packed, self.scale, &mut self.channel_psd);

            for (acc, &p) in result.iter_mut().zip(&self.channel_psd) {
                *acc += p * weight;
            }
        }

        Ok(Periodogram::new(result))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
