//! Progress bar of [`TrackCollection::noise_all`](crate::track::TrackCollection::noise_all).
//!
//! Noising a track factorizes one `N × N` covariance per kernel, so the cost of a
//! track depends on its number of observations. The bar therefore counts tracks
//! but reports the observation throughput and the failed tracks next to it.
//!
//! Compiled only with the `progress` feature.
use std::time::{Duration, Instant};

use indicatif::{HumanCount, ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{bar:40.cyan/blue} {pos}/{len} tracks | ETA {eta_precise} | {msg}";

pub(crate) struct NoiseProgress {
    bar: ProgressBar,
    started: Instant,
    observations: usize,
    failed: usize,
}

impl NoiseProgress {
    pub(crate) fn new(tracks: usize) -> Self {
        let bar = ProgressBar::new(tracks as u64);
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(200));
        NoiseProgress {
            bar,
            started: Instant::now(),
            observations: 0,
            failed: 0,
        }
    }

    /// Account for one processed track of `size` observations.
    pub(crate) fn record(&mut self, size: usize, noised: bool) {
        self.observations += size;
        if !noised {
            self.failed += 1;
        }
        self.bar.set_message(throughput(
            self.observations,
            self.failed,
            self.started.elapsed(),
        ));
        self.bar.inc(1);
    }

    /// Stop early, after a cancellation or a strict failure.
    pub(crate) fn abandon(&self, reason: &'static str) {
        self.bar.set_message(reason);
        self.bar.finish_and_clear();
    }

    pub(crate) fn finish(self) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

fn throughput(observations: usize, failed: usize, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { observations as f64 / secs } else { 0.0 };
    let mut msg = format!("{} obs, {rate:.0} obs/s", HumanCount(observations as u64));
    if failed > 0 {
        msg.push_str(&format!(", {failed} failed"));
    }
    msg
}

#[cfg(test)]
mod progress_bar_test {
    use super::*;

    #[test]
    fn test_throughput_message() {
        assert_eq!(throughput(1500, 0, Duration::from_secs(2)), "1,500 obs, 750 obs/s");
        assert_eq!(throughput(40, 2, Duration::ZERO), "40 obs, 0 obs/s, 2 failed");
    }

    #[test]
    fn test_record_counts_failures() {
        let mut progress = NoiseProgress::new(3);
        progress.record(10, true);
        progress.record(5, false);
        assert_eq!(progress.observations, 15);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.bar.position(), 2);
        progress.finish();
    }
}
