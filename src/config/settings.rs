//! Pipeline configuration, validation and TOML persistence.
//!
//! [`PipelineConfig`] carries exactly the knobs the pipeline recognises.
//! [`Settings`] wraps it together with the [`InputConfig`] used by the
//! command-line driver and is what `settings.toml` holds:
//!
//! ```toml
//! [pipeline]
//! seg_length = 100
//! seg_overlap = 50
//! frame_size = 1
//! noise_scale = 1.0
//! sample_rate = 100.0
//! noise_estimate_fraction = 0.5
//!
//! [input]
//! channels_first = true
//! realtime = false
//! ```

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Configuration values the pipeline cannot be built from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("seg_length must be greater than 1 (got {0})")]
    SegLengthTooShort(usize),

    #[error("frame_size must be greater than 0")]
    EmptyFrame,
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Segmentation, windowing and noise-floor calibration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Samples per channel in one segment (> 1).
    pub seg_length: usize,
    /// Samples shared by consecutive segments (`< seg_length`, else 0).
    pub seg_overlap: usize,
    /// Channels per frame (> 0).
    pub frame_size: usize,
    /// Custom window weights; `None` selects Hamming.  A window whose length
    /// differs from `seg_length` is replaced by a rectangular window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<Vec<f64>>,
    /// Calibration multiplier applied to the final estimate.
    pub noise_scale: f64,
    /// Sample rate of the frame stream in Hz.
    pub sample_rate: f64,
    /// Fraction of the highest-frequency bins averaged for the noise floor.
    pub noise_estimate_fraction: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seg_length: 100,
            seg_overlap: 50,
            frame_size: 1,
            window: None,
            noise_scale: 1.0,
            sample_rate: 100.0,
            noise_estimate_fraction: 0.5,
        }
    }
}

impl PipelineConfig {
    /// Check hard limits and clamp a bad overlap to 0.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::SegLengthTooShort`]: `seg_length <= 1`.
    /// - [`ConfigError::EmptyFrame`]: `frame_size == 0`.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.seg_length <= 1 {
            return Err(ConfigError::SegLengthTooShort(self.seg_length));
        }
        if self.frame_size == 0 {
            return Err(ConfigError::EmptyFrame);
        }
        if self.seg_overlap >= self.seg_length {
            log::warn!(
                "seg_overlap {} is not below seg_length {}; using 0",
                self.seg_overlap,
                self.seg_length
            );
            self.seg_overlap = 0;
        }
        Ok(self)
    }

    /// Bins per periodogram (`seg_length / 2 + 1`).
    pub fn periodogram_len(&self) -> usize {
        self.seg_length / 2 + 1
    }
}

// ---------------------------------------------------------------------------
// InputConfig
// ---------------------------------------------------------------------------

/// How the command-line driver reads and paces a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// `true`: samples are stored channel by channel (`[channels][samples]`).
    /// `false`: samples are interleaved frame by frame.
    pub channels_first: bool,
    /// Sleep `1 / sample_rate` between frames to mimic a live source.
    pub realtime: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            channels_first: true,
            realtime: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Top-level settings document, serialised as `settings.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pipeline: PipelineConfig,
    pub input: InputConfig,
}

impl Settings {
    /// Load from the platform-appropriate `settings.toml`.
    ///
    /// Returns defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path; defaults when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("{} not found; using default settings", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Save to the platform-appropriate `settings.toml`.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn validation_rejects_short_segments_and_empty_frames() {
        let cfg = PipelineConfig {
            seg_length: 1,
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.validated(), Err(ConfigError::SegLengthTooShort(1)));

        let cfg = PipelineConfig {
            frame_size: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.validated(), Err(ConfigError::EmptyFrame));
    }

    #[test]
    fn validation_clamps_overlap() {
        let cfg = PipelineConfig {
            seg_length: 10,
            seg_overlap: 10,
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.validated().unwrap().seg_overlap, 0);

        let cfg = PipelineConfig {
            seg_length: 10,
            seg_overlap: 9,
            ..PipelineConfig::default()
        };
        assert_eq!(cfg.validated().unwrap().seg_overlap, 9);
    }

    #[test]
    fn default_values() {
        let s = Settings::default();
        assert_eq!(s.pipeline.seg_length, 100);
        assert_eq!(s.pipeline.seg_overlap, 50);
        assert_eq!(s.pipeline.frame_size, 1);
        assert!(s.pipeline.window.is_none());
        assert_eq!(s.pipeline.noise_estimate_fraction, 0.5);
        assert_eq!(s.pipeline.periodogram_len(), 51);
        assert!(s.input.channels_first);
        assert!(!s.input.realtime);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.toml");

        let mut s = Settings::default();
        s.pipeline.seg_length = 4;
        s.pipeline.seg_overlap = 1;
        s.pipeline.frame_size = 2746;
        s.pipeline.window = Some(vec![0.5, 1.0, 1.0, 0.5]);
        s.pipeline.noise_scale = 4.509888;
        s.input.channels_first = false;

        s.save_to(&path).expect("save");
        let loaded = Settings::load_from(&path).expect("load");
        assert_eq!(loaded, s);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let loaded = Settings::load_from(&dir.path().join("missing.toml")).expect("load");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[pipeline]\nframe_size = 3\nsample_rate = 250.0\n").unwrap();

        let loaded = Settings::load_from(&path).expect("load");
        assert_eq!(loaded.pipeline.frame_size, 3);
        assert_eq!(loaded.pipeline.sample_rate, 250.0);
        assert_eq!(loaded.pipeline.seg_length, 100);
        assert_eq!(loaded.input, InputConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[pipeline\nseg_length = ").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }
}
