//! Periodogram → scalar noise-floor estimate.
//!
//! The noise floor is taken from the high-frequency tail of the periodogram:
//! the last `floor(L · fraction)` bins are averaged, then converted to a
//! calibrated magnitude with
//!
//! ```text
//! noise = noise_scale · sqrt(tail_mean · sample_rate / 2)
//! ```

use super::segment::{NoiseEstimate, Periodogram};

/// Reduces periodograms to noise-floor estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseFloor {
    noise_scale: f64,
    sample_rate: f64,
    fraction: f64,
}

impl NoiseFloor {
    pub fn new(noise_scale: f64, sample_rate: f64, fraction: f64) -> Self {
        Self {
            noise_scale,
            sample_rate,
            fraction,
        }
    }

    /// Number of tail bins averaged for a periodogram of `len` bins.
    ///
    /// May be zero for very short periodograms or tiny fractions; never
    /// exceeds `len`.
    pub fn tail_len(&self, len: usize) -> usize {
        let n = (len as f64 * self.fraction).floor();
        if n.is_nan() || n < 0.0 {
            0
        } else {
            (n as usize).min(len)
        }
    }

    /// Mean of the tail bins, or the last bin alone when the tail is empty.
    pub fn tail_mean(&self, periodogram: &Periodogram) -> f64 {
        let bins = periodogram.bins();
        let Some(&last) = bins.last() else {
            return 0.0;
        };

        match self.tail_len(bins.len()) {
            0 => last,
            n => bins[bins.len() - n..].iter().sum::<f64>() / n as f64,
        }
    }

    /// Calibrated noise-floor magnitude for `periodogram`.
    pub fn estimate(&self, periodogram: &Periodogram) -> NoiseEstimate {
        let average = self.tail_mean(periodogram);
        self.noise_scale * (average * self.sample_rate / 2.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn psd(bins: &[f64]) -> Periodogram {
        Periodogram::new(bins.to_vec())
    }

    #[test]
    fn averages_upper_fraction_of_bins() {
        let nf = NoiseFloor::new(1.0, 2.0, 0.5);
        // L = 5 → floor(2.5) = 2 → mean(4, 6) = 5
        let p = psd(&[100.0, 50.0, 10.0, 4.0, 6.0]);
        assert_eq!(nf.tail_len(5), 2);
        assert_relative_eq!(nf.tail_mean(&p), 5.0);
        // sqrt(5 · 2 / 2) = sqrt(5)
        assert_relative_eq!(nf.estimate(&p), 5.0_f64.sqrt());
    }

    #[test]
    fn noise_scale_multiplies_result() {
        let p = psd(&[0.0, 8.0, 8.0]);
        let base = NoiseFloor::new(1.0, 100.0, 1.0).estimate(&p);
        let scaled = NoiseFloor::new(4.5, 100.0, 1.0).estimate(&p);
        assert_relative_eq!(scaled, 4.5 * base);
    }

    #[test]
    fn degenerate_fraction_uses_last_bin() {
        let nf = NoiseFloor::new(1.0, 2.0, 0.1);
        let p = psd(&[9.0, 7.0, 3.0]);
        // floor(3 · 0.1) = 0
        assert_eq!(nf.tail_len(3), 0);
        assert_relative_eq!(nf.tail_mean(&p), 3.0);
        assert_relative_eq!(nf.estimate(&p), 3.0_f64.sqrt());
    }

    #[test]
    fn oversized_fraction_is_capped_at_full_periodogram() {
        let nf = NoiseFloor::new(1.0, 2.0, 3.0);
        let p = psd(&[1.0, 2.0, 3.0]);
        assert_eq!(nf.tail_len(3), 3);
        assert_relative_eq!(nf.tail_mean(&p), 2.0);
    }

    #[test]
    fn empty_periodogram_is_zero() {
        let nf = NoiseFloor::new(1.0, 2.0, 0.5);
        assert_eq!(nf.estimate(&psd(&[])), 0.0);
    }
}
