//! Segment and periodogram values handed between pipeline stages.

/// The most recent `seg_length` frames for every channel, oldest first.
///
/// Stored channel-major: channel `c` occupies
/// `samples[c * seg_length .. (c + 1) * seg_length]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    samples: Vec<f64>,
    seg_length: usize,
}

impl Segment {
    /// Wrap channel-major `samples`.
    ///
    /// # Panics
    ///
    /// Panics if `seg_length == 0` or `samples.len()` is not a multiple of
    /// `seg_length`.
    pub fn new(samples: Vec<f64>, seg_length: usize) -> Self {
        assert!(seg_length > 0, "segment length must be > 0");
        assert_eq!(
            samples.len() % seg_length,
            0,
            "segment samples must fill whole channels"
        );
        Self {
            samples,
            seg_length,
        }
    }

    /// Number of channels (the pipeline's frame size).
    pub fn channels(&self) -> usize {
        self.samples.len() / self.seg_length
    }

    /// Number of samples per channel.
    pub fn seg_length(&self) -> usize {
        self.seg_length
    }

    /// Samples of channel `c`, oldest first.
    pub fn channel(&self, c: usize) -> &[f64] {
        &self.samples[c * self.seg_length..(c + 1) * self.seg_length]
    }

    /// Iterate over channels in order.
    pub fn iter_channels(&self) -> std::slice::ChunksExact<'_, f64> {
        self.samples.chunks_exact(self.seg_length)
    }

    /// Copy out as one `Vec` per channel.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter_channels().map(<[f64]>::to_vec).collect()
    }
}

/// One-sided power spectral density of a segment, averaged over channels.
///
/// Holds `seg_length / 2 + 1` bins, DC first.
#[derive(Debug, Clone, PartialEq)]
pub struct Periodogram {
    bins: Vec<f64>,
}

impl Periodogram {
    pub fn new(bins: Vec<f64>) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn into_bins(self) -> Vec<f64> {
        self.bins
    }
}

/// Final per-segment output: a calibrated noise-floor magnitude.
pub type NoiseEstimate = f64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_sliced_channel_major() {
        let seg = Segment::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3);
        assert_eq!(seg.channels(), 2);
        assert_eq!(seg.channel(0), &[1.0, 2.0, 3.0]);
        assert_eq!(seg.channel(1), &[4.0, 5.0, 6.0]);
        assert_eq!(seg.to_rows(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    #[should_panic(expected = "segment samples must fill whole channels")]
    fn ragged_samples_panic() {
        let _ = Segment::new(vec![1.0, 2.0, 3.0], 2);
    }

    #[test]
    fn segment_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Segment>();
        assert_send::<Periodogram>();
    }
}
