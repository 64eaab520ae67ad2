//! # Progress reporting and cooperative cancellation
//!
//! Long-running operations (DTW on large pairs, enclosing circles of big point
//! sets, bulk noising of a [`TrackCollection`](crate::track::TrackCollection))
//! take a [`Monitor`]. The operation calls [`Monitor::tick`] once per outer-loop
//! iteration; the monitor forwards `(done, total)` to the progress callback and
//! returns [`TrackError::Cancelled`] as soon as cancellation was requested.
//!
//! Cancellation sources
//! -----------------
//! * [`CancelToken`] – shared atomic flag, checked at every tick.
//! * a `should_cancel()` closure – polled on a wall-clock interval
//!   ([`POLL_INTERVAL`]) so that expensive callbacks keep a constant latency
//!   regardless of the iteration cost.
//!
//! Progress callbacks receive indices only and cannot reach the inputs of the
//! running operation.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::tracklib_errors::TrackError;

/// Minimal wall-clock delay between two `should_cancel()` calls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cloneable cancellation flag shared between a caller and a running operation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

type ProgressFn<'a> = Box<dyn FnMut(usize, usize) + 'a>;
type CancelFn<'a> = Box<dyn FnMut() -> bool + 'a>;

/// Progress callback plus cancellation sources, passed to long-running operations.
///
/// ```rust
/// use tracklib::control::{CancelToken, Monitor};
///
/// let token = CancelToken::new();
/// let mut seen = 0;
/// let mut monitor = Monitor::new()
///     .with_progress(|done, _total| seen = done)
///     .with_token(token.clone());
/// assert!(monitor.tick(1, 10).is_ok());
/// token.cancel();
/// assert!(monitor.tick(2, 10).is_err());
/// ```
#[derive(Default)]
pub struct Monitor<'a> {
    progress: Option<ProgressFn<'a>>,
    token: Option<CancelToken>,
    should_cancel: Option<CancelFn<'a>>,
    last_poll: Option<Instant>,
}

impl<'a> Monitor<'a> {
    /// Monitor without callback nor cancellation: every tick succeeds.
    pub fn new() -> Self {
        Monitor::default()
    }

    pub fn with_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, usize) + 'a,
    {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn with_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_should_cancel<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> bool + 'a,
    {
        self.should_cancel = Some(Box::new(f));
        self
    }

    /// Report `done` of `total` iterations, then check for cancellation.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::Cancelled`] if the token is set or `should_cancel()` answered `true`.
    pub fn tick(&mut self, done: usize, total: usize) -> Result<(), TrackError> {
        if let Some(progress) = self.progress.as_mut() {
            progress(done, total);
        }
        if self.token.as_ref().is_some_and(CancelToken::is_cancelled) {
            debug!(done, total, "operation cancelled by token");
            return Err(TrackError::Cancelled);
        }
        if let Some(should_cancel) = self.should_cancel.as_mut() {
            let due = self
                .last_poll
                .map_or(true, |last| last.elapsed() >= POLL_INTERVAL);
            if due {
                if should_cancel() {
                    debug!(done, total, "operation cancelled by callback");
                    return Err(TrackError::Cancelled);
                }
                self.last_poll = Some(Instant::now());
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Monitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("progress", &self.progress.is_some())
            .field("token", &self.token)
            .field("should_cancel", &self.should_cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod control_test {
    use super::*;

    #[test]
    fn test_callback_poll_cancels_first_tick() {
        let mut monitor = Monitor::new().with_should_cancel(|| true);
        assert_eq!(monitor.tick(0, 3), Err(TrackError::Cancelled));
    }

    #[test]
    fn test_progress_receives_indices() {
        let mut log = Vec::new();
        {
            let mut monitor = Monitor::new().with_progress(|i, n| log.push((i, n)));
            for i in 0..3 {
                monitor.tick(i, 3).unwrap();
            }
        }
        assert_eq!(log, vec![(0, 3), (1, 3), (2, 3)]);
    }
}
