//! Configuration module.
//!
//! Provides [`PipelineConfig`] (the pipeline's knobs), [`InputConfig`]
//! (recording layout and pacing for the driver), [`Settings`] (the TOML
//! document holding both) and [`AppPaths`] for the default settings location.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{ConfigError, InputConfig, PipelineConfig, Settings};
