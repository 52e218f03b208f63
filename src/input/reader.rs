//! Little-endian `f32` recordings.
//!
//! A recording is a flat file of `f32` samples for `frame_size` channels.
//! Two layouts are supported:
//!
//! * channels first: `[channels][samples]`, what `ndarray.tofile()` writes
//!   for a `(channels, samples)` array;
//! * interleaved: `[samples][channels]`, one frame after another.
//!
//! Samples are widened to `f64` on load.

use std::path::Path;

use thiserror::Error;

/// Errors while loading a recording.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read recording: {0}")]
    Io(#[from] std::io::Error),

    #[error("recording is {0} bytes, not a whole number of f32 samples")]
    TruncatedSample(usize),

    #[error("{samples} samples cannot be split into frames of {frame_size}")]
    RaggedFrames { samples: usize, frame_size: usize },

    #[error("recording holds no samples")]
    Empty,

    #[error("frame size must be greater than 0")]
    ZeroFrameSize,
}

/// A multi-channel recording held in memory, channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// `channels[c][t]`
    channels: Vec<Vec<f64>>,
}

impl Recording {
    /// Load a recording from `path`.
    ///
    /// # Errors
    ///
    /// See [`InputError`].
    pub fn load(
        path: impl AsRef<Path>,
        frame_size: usize,
        channels_first: bool,
    ) -> Result<Self, InputError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_le_bytes(&bytes, frame_size, channels_first)
    }

    /// Decode little-endian `f32` bytes.
    pub fn from_le_bytes(
        bytes: &[u8],
        frame_size: usize,
        channels_first: bool,
    ) -> Result<Self, InputError> {
        if frame_size == 0 {
            return Err(InputError::ZeroFrameSize);
        }
        if bytes.len() % 4 != 0 {
            return Err(InputError::TruncatedSample(bytes.len()));
        }

        let samples: Vec<f64> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect();

        if samples.is_empty() {
            return Err(InputError::Empty);
        }
        if samples.len() % frame_size != 0 {
            return Err(InputError::RaggedFrames {
                samples: samples.len(),
                frame_size,
            });
        }

        let length = samples.len() / frame_size;
        let channels = if channels_first {
            samples.chunks_exact(length).map(<[f64]>::to_vec).collect()
        } else {
            (0..frame_size)
                .map(|c| samples.iter().skip(c).step_by(frame_size).copied().collect())
                .collect()
        };

        Ok(Self { channels })
    }

    /// Number of channels.
    pub fn frame_size(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples of one channel.
    pub fn channel(&self, c: usize) -> &[f64] {
        &self.channels[c]
    }

    /// Iterate frames in time order; each frame holds one sample per channel.
    pub fn frames(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.len()).map(move |t| self.channels.iter().map(|ch| ch[t]).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
