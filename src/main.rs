//! Offline driver: replays a recording through the real-time pipeline.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse arguments.
//! 3. Load [`Settings`] (explicit `--config` path or the platform default).
//! 4. Load the recording.
//! 5. Build and start the [`Pipeline`].
//! 6. Feed every frame, printing each new estimate as it appears.
//! 7. Stop the pipeline and report statistics.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use argh::FromArgs;
use serde::Serialize;

use welch_noise::{
    config::Settings,
    input::Recording,
    pipeline::{Pipeline, PipelineError},
};

#[derive(FromArgs)]
/// Estimate the noise floor of a recorded multi-channel f32 stream.
struct Args {
    #[argh(positional, description = "little-endian f32 recording")]
    recording: PathBuf,

    #[argh(option, short = 'c', description = "settings file (default: platform config dir)")]
    config: Option<PathBuf>,

    #[argh(switch, description = "print results as JSON lines")]
    json: bool,

    #[argh(switch, description = "pace frames at the configured sample rate")]
    realtime: bool,
}

/// One printed estimate.
#[derive(Serialize)]
struct ResultLine {
    frame: usize,
    noise_floor: f64,
}

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Arguments
    let args: Args = argh::from_env();

    // 3. Settings
    let settings = match &args.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::load().unwrap_or_else(|e| {
            log::warn!("failed to load settings ({e}); using defaults");
            Settings::default()
        }),
    };
    let realtime = args.realtime || settings.input.realtime;

    // 4. Recording
    let recording = Recording::load(
        &args.recording,
        settings.pipeline.frame_size,
        settings.input.channels_first,
    )
    .with_context(|| format!("reading {}", args.recording.display()))?;
    log::info!(
        "loaded {} frames x {} channels from {}",
        recording.len(),
        recording.frame_size(),
        args.recording.display()
    );

    // 5. Pipeline
    let frame_period = if settings.pipeline.sample_rate > 0.0 {
        Duration::from_secs_f64(1.0 / settings.pipeline.sample_rate)
    } else {
        Duration::ZERO
    };
    let mut pipeline = Pipeline::new(settings.pipeline).context("invalid pipeline settings")?;
    pipeline.start()?;

    // 6. Feed
    for (i, frame) in recording.frames().enumerate() {
        match pipeline.add_frame(&frame) {
            Ok(_) => {}
            Err(PipelineError::Handoff(e)) => log::debug!("frame {i}: segment dropped ({e})"),
            Err(e) => return Err(e.into()),
        }

        if pipeline.result_available() {
            if let Some(noise_floor) = pipeline.get_result() {
                print_result(i, noise_floor, args.json)?;
            }
        }

        if realtime {
            thread::sleep(frame_period);
        }
    }

    // 7. Shutdown
    pipeline.stop();
    let stats = pipeline.stats();
    log::info!(
        "done: {} segments emitted, {} dropped, {} estimates",
        stats.segments_emitted,
        stats.segments_dropped,
        stats.estimates
    );
    if args.json {
        eprintln!("{}", serde_json::to_string(&stats)?);
    }

    Ok(())
}

fn print_result(frame: usize, noise_floor: f64, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(&ResultLine { frame, noise_floor })?);
    } else {
        println!("Result: {noise_floor}");
    }
    Ok(())
}
