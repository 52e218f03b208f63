//! Background stages: periodogram worker and noise integrator.
//!
//! Both are plain functions run on their own OS thread.  They share one loop
//! shape ([`run_stage`]):
//!
//! ```text
//! loop {
//!     shutdown? ─yes─▶ exit
//!     poll(input, timeout) ─timeout─▶ retry
//!                          ─closed──▶ set shutdown, exit
//!     shutdown? ─yes─▶ exit
//!     compute
//!     offer(output, timeout) ─fail─▶ drop item (closed: set shutdown, exit)
//! }
//! ```

use std::sync::atomic::AtomicU64;
use std::time::Duration;

use super::channel::{BoundedChannel, HandoffError};
use super::state::{PipelineStats, SharedStats, ShutdownFlag};
use crate::dsp::{NoiseEstimate, NoiseFloor, Periodogram, PeriodogramEstimator, Segment};

/// Channel handles, shutdown flag and timeout shared by one stage.
pub struct StageLinks<I, O> {
    pub input: BoundedChannel<I>,
    pub output: BoundedChannel<O>,
    pub shutdown: ShutdownFlag,
    pub timeout: Duration,
    pub stats: SharedStats,
}

/// Generic worker loop. `compute` returning `None` skips the item.
fn run_stage<I, O>(
    name: &str,
    links: StageLinks<I, O>,
    produced: impl Fn(&PipelineStats) -> &AtomicU64,
    dropped: impl Fn(&PipelineStats) -> &AtomicU64,
    mut compute: impl FnMut(I) -> Option<O>,
) {
    let StageLinks {
        input,
        output,
        shutdown,
        timeout,
        stats,
    } = links;
    let stats: &PipelineStats = &stats;

    log::debug!("{name}: started");

    while !shutdown.is_set() {
        let item = match input.poll(timeout) {
            Ok(item) => item,
            Err(HandoffError::Timeout) => continue,
            Err(e) => {
                log::debug!("{name}: input {e}, shutting down");
                shutdown.trigger();
                break;
            }
        };

        if shutdown.is_set() {
            break;
        }

        let Some(result) = compute(item) else {
            continue;
        };

        match output.offer(result, timeout) {
            Ok(()) => PipelineStats::bump(produced(stats)),
            Err(HandoffError::Timeout) => {
                PipelineStats::bump(dropped(stats));
                log::warn!("{name}: downstream busy, result dropped");
            }
            Err(e) => {
                PipelineStats::bump(dropped(stats));
                log::debug!("{name}: output {e}, shutting down");
                shutdown.trigger();
                break;
            }
        }
    }

    log::debug!("{name}: stopped");
}

/// Segment → channel-averaged periodogram, until shutdown.
pub fn periodogram_worker(
    links: StageLinks<Segment, Periodogram>,
    mut estimator: PeriodogramEstimator,
) {
    run_stage(
        "periodogram",
        links,
        |s| &s.periodograms,
        |s| &s.periodograms_dropped,
        |segment| match estimator.estimate(&segment) {
            Ok(p) => Some(p),
            Err(e) => {
                log::error!("periodogram: {e}");
                None
            }
        },
    );
}

/// Periodogram → noise-floor estimate, until shutdown.
pub fn noise_integrator(links: StageLinks<Periodogram, NoiseEstimate>, noise: NoiseFloor) {
    run_stage(
        "noise",
        links,
        |s| &s.estimates,
        |s| &s.estimates_dropped,
        |periodogram| {
            let estimate = noise.estimate(&periodogram);
            log::debug!("noise: estimate {estimate:.6}");
            Some(estimate)
        },
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::window::rectangular;
    use approx::assert_relative_eq;
    use std::thread;

    const TIMEOUT: Duration = Duration::from_millis(20);
    const WAIT: Duration = Duration::from_secs(2);

    fn links<I, O>(
        input: &BoundedChannel<I>,
        output: &BoundedChannel<O>,
        shutdown: &ShutdownFlag,
        stats: &SharedStats,
    ) -> StageLinks<I, O> {
        StageLinks {
            input: input.clone(),
            output: output.clone(),
            shutdown: shutdown.clone(),
            timeout: TIMEOUT,
            stats: stats.clone(),
        }
    }

    #[test]
    fn noise_integrator_forwards_estimates_and_stops() {
        let input = BoundedChannel::new();
        let output = BoundedChannel::new();
        let shutdown = ShutdownFlag::new();
        let stats = SharedStats::default();

        let handle = {
            let l = links(&input, &output, &shutdown, &stats);
            thread::spawn(move || noise_integrator(l, NoiseFloor::new(1.0, 2.0, 1.0)))
        };

        input.offer(Periodogram::new(vec![4.0, 4.0]), WAIT).unwrap();
        let estimate = output.poll(WAIT).unwrap();
        assert_relative_eq!(estimate, 2.0);

        shutdown.trigger();
        handle.join().unwrap();
        assert_eq!(stats.snapshot().estimates, 1);
    }

    #[test]
    fn periodogram_worker_computes_and_skips_bad_segments() {
        let input = BoundedChannel::new();
        let output = BoundedChannel::new();
        let shutdown = ShutdownFlag::new();
        let stats = SharedStats::default();

        let handle = {
            let l = links(&input, &output, &shutdown, &stats);
            let est = PeriodogramEstimator::new(1, rectangular(4).into());
            thread::spawn(move || periodogram_worker(l, est))
        };

        // Wrong shape: logged and skipped.
        input.offer(Segment::new(vec![0.0; 8], 4), WAIT).unwrap();
        input
            .offer(Segment::new(vec![1.0, -1.0, 1.0, -1.0], 4), WAIT)
            .unwrap();

        let p = output.poll(WAIT).unwrap();
        // All energy at Nyquist: |X[2]|² = 16, scale 1/4.
        assert_eq!(p.len(), 3);
        assert_relative_eq!(p.bins()[2], 4.0, epsilon = 1e-12);
        assert_relative_eq!(p.bins()[0], 0.0, epsilon = 1e-12);

        shutdown.trigger();
        handle.join().unwrap();
        assert_eq!(stats.snapshot().periodograms, 1);
    }

    #[test]
    fn closed_input_cascades_shutdown() {
        let input: BoundedChannel<Periodogram> = BoundedChannel::new();
        let output = BoundedChannel::new();
        let shutdown = ShutdownFlag::new();
        let stats = SharedStats::default();

        let handle = {
            let l = links(&input, &output, &shutdown, &stats);
            thread::spawn(move || noise_integrator(l, NoiseFloor::new(1.0, 1.0, 0.5)))
        };

        input.close();
        handle.join().unwrap();
        assert!(shutdown.is_set());
    }

    #[test]
    fn busy_output_drops_result() {
        let input = BoundedChannel::new();
        let output = BoundedChannel::new();
        let shutdown = ShutdownFlag::new();
        let stats = SharedStats::default();

        // Occupy the result slot so the worker's offer times out.
        output.offer(-1.0, TIMEOUT).unwrap();

        let handle = {
            let l = links(&input, &output, &shutdown, &stats);
            thread::spawn(move || noise_integrator(l, NoiseFloor::new(1.0, 2.0, 1.0)))
        };

        input.offer(Periodogram::new(vec![1.0]), WAIT).unwrap();

        let deadline = std::time::Instant::now() + WAIT;
        while stats.snapshot().estimates_dropped == 0 && std::time::Instant::now() < deadline {
            thread::sleep(TIMEOUT);
        }

        shutdown.trigger();
        handle.join().unwrap();

        assert_eq!(stats.snapshot().estimates_dropped, 1);
        assert_eq!(output.try_take(), Some(-1.0));
    }
}
