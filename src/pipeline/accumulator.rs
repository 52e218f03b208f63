//! Sliding-window segment accumulator.
//!
//! Every channel has a fixed-capacity circular buffer of `seg_length`
//! samples.  New frames **overwrite** the oldest samples so the most recent
//! `seg_length` frames are always available.  Once the buffers first fill,
//! and every `seg_length - seg_overlap` frames after that, the buffers are
//! copied out in chronological order into a fresh [`Segment`] and offered to
//! the periodogram stage.
//!
//! This runs on the caller's ingestion thread: it never does spectral work
//! and never waits longer than the handoff timeout.

use std::time::Duration;

use super::channel::BoundedChannel;
use super::runner::PipelineError;
use super::state::{PipelineStats, SharedStats};
use crate::dsp::Segment;

/// Outcome of a successful [`SegmentAccumulator::add_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was stored; no segment is due yet.
    Buffered,
    /// The frame completed a segment, which was handed downstream.
    Emitted,
}

/// Per-channel circular buffers plus the emission countdown.
pub struct SegmentAccumulator {
    seg_length: usize,
    hop: usize,
    frame_size: usize,
    /// Channel-major: channel `c` owns `data[c * seg_length ..][..seg_length]`.
    data: Vec<f64>,
    /// Index of the *next* write position (wraps around `seg_length`).
    position: usize,
    /// Frames left until the next emission.
    remaining: usize,
    output: BoundedChannel<Segment>,
    timeout: Duration,
    stats: SharedStats,
}

impl std::fmt::Debug for SegmentAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentAccumulator")
            .field("seg_length", &self.seg_length)
            .field("hop", &self.hop)
            .field("frame_size", &self.frame_size)
            .field("position", &self.position)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

impl SegmentAccumulator {
    /// Create an empty accumulator that offers segments to `output`.
    ///
    /// Expects a validated configuration: `seg_length > 1`,
    /// `seg_overlap < seg_length`, `frame_size > 0`.
    pub fn new(
        seg_length: usize,
        seg_overlap: usize,
        frame_size: usize,
        output: BoundedChannel<Segment>,
        timeout: Duration,
        stats: SharedStats,
    ) -> Self {
        debug_assert!(seg_length > 1 && seg_overlap < seg_length && frame_size > 0);
        Self {
            seg_length,
            hop: seg_length - seg_overlap,
            frame_size,
            data: vec![0.0; frame_size * seg_length],
            position: 0,
            remaining: seg_length,
            output,
            timeout,
            stats,
        }
    }

    /// Store one frame; emit a segment if one is due.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::FrameLength`]: `frame.len() != frame_size`; the
    ///   accumulator is left untouched.
    /// - [`PipelineError::Handoff`]: a segment was due but could not be
    ///   handed over in time.  The segment is lost; the countdown still
    ///   advances.
    pub fn add_frame(&mut self, frame: &[f64]) -> Result<FrameStatus, PipelineError> {
        if frame.len() != self.frame_size {
            return Err(PipelineError::FrameLength {
                expected: self.frame_size,
                got: frame.len(),
            });
        }

        for (c, &sample) in frame.iter().enumerate() {
            self.data[c * self.seg_length + self.position] = sample;
        }
        self.position = (self.position + 1) % self.seg_length;
        self.remaining -= 1;
        PipelineStats::bump(&self.stats.frames);

        if self.remaining > 0 {
            return Ok(FrameStatus::Buffered);
        }

        self.remaining += self.hop;
        let segment = self.snapshot();

        match self.output.offer(segment, self.timeout) {
            Ok(()) => {
                PipelineStats::bump(&self.stats.segments_emitted);
                Ok(FrameStatus::Emitted)
            }
            Err(e) => {
                PipelineStats::bump(&self.stats.segments_dropped);
                log::warn!("accumulator: segment dropped ({e})");
                Err(PipelineError::Handoff(e))
            }
        }
    }

    /// Copy the buffers out oldest-first.
    ///
    /// The oldest sample sits at `position`, the slot the next write would
    /// overwrite.
    fn snapshot(&self) -> Segment {
        let mut samples = Vec::with_capacity(self.data.len());
        for channel in self.data.chunks_exact(self.seg_length) {
            samples.extend_from_slice(&channel[self.position..]);
            samples.extend_from_slice(&channel[..self.position]);
        }
        Segment::new(samples, self.seg_length)
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn seg_length(&self) -> usize {
        self.seg_length
    }

    /// Frames between consecutive emissions (`seg_length - seg_overlap`).
    pub fn hop(&self) -> usize {
        self.hop
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
