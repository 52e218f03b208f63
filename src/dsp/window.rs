//! Segment weighting windows.
//!
//! [`make_window`] resolves the window a pipeline will use for its whole
//! lifetime.  A caller-supplied window is used verbatim when its length
//! matches the segment length; otherwise the pipeline falls back to a
//! rectangular window instead of failing.
//!
//! # Example
//!
//! ```rust
//! use welch_noise::dsp::window::make_window;
//!
//! let w = make_window(8, None); // Hamming
//! assert!((w[0] - 0.08).abs() < 1e-12);
//!
//! let w = make_window(8, Some(&[1.0, 2.0][..])); // wrong length → all ones
//! assert!(w.iter().all(|&v| v == 1.0));
//! ```

use std::f64::consts::PI;
use std::sync::Arc;

/// Immutable window shared read-only by every periodogram computation.
pub type Window = Arc<[f64]>;

/// Hamming window `w[i] = 0.54 − 0.46·cos(2π·i/(n−1))`.
///
/// `n` must be greater than 1.
pub fn hamming(n: usize) -> Vec<f64> {
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

/// Rectangular window (all ones).
pub fn rectangular(n: usize) -> Vec<f64> {
    vec![1.0; n]
}

/// Resolve the window for a segment length.
///
/// * `None` → Hamming.
/// * wrong length → rectangular.
/// * otherwise the requested weights, unchanged.
pub fn make_window(seg_length: usize, requested: Option<&[f64]>) -> Window {
    match requested {
        None => hamming(seg_length).into(),
        Some(w) if w.len() != seg_length => {
            log::warn!(
                "window length {} does not match segment length {seg_length}; using rectangular window",
                w.len()
            );
            rectangular(seg_length).into()
        }
        Some(w) => Arc::from(w),
    }
}

/// Periodogram scale `1 / Σ w[i]²`.
pub fn power_scale(window: &[f64]) -> f64 {
    1.0 / window.iter().map(|w| w * w).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hamming_is_symmetric_with_known_endpoints() {
        let w = hamming(9);
        assert_relative_eq!(w[0], 0.08, epsilon = 1e-12);
        assert_relative_eq!(w[8], 0.08, epsilon = 1e-12);
        assert_relative_eq!(w[4], 1.0, epsilon = 1e-12);
        for i in 0..9 {
            assert_relative_eq!(w[i], w[8 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn absent_window_defaults_to_hamming() {
        let w = make_window(16, None);
        assert_eq!(w.len(), 16);
        assert_eq!(&w[..], &hamming(16)[..]);
    }

    #[test]
    fn mismatched_window_falls_back_to_rectangular() {
        let w = make_window(10, Some(&[0.5; 7][..]));
        assert_eq!(w.len(), 10);
        assert!(w.iter().all(|&v| v == 1.0));
        assert_relative_eq!(power_scale(&w), 1.0 / 10.0);
    }

    #[test]
    fn matching_window_is_used_verbatim() {
        let requested = [0.1, 0.2, 0.3, 0.4];
        let w = make_window(4, Some(&requested[..]));
        assert_eq!(&w[..], &requested[..]);
    }

    #[test]
    fn power_scale_of_hamming() {
        let w = hamming(8);
        let expected = 1.0 / w.iter().map(|v| v * v).sum::<f64>();
        assert_relative_eq!(power_scale(&w), expected);
    }
}
