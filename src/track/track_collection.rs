//! # Track collections
//!
//! An ordered set of [`Track`]s with bulk operations. Bulk operations process
//! each track independently and, unless `strict` is set, do not stop on a
//! failing track: they collect the failures next to the results in a
//! [`BatchOutcome`].
//!
//! With the `progress` feature, [`TrackCollection::noise_all`] displays an
//! `indicatif` progress bar.
use rand::Rng;
use tracing::{debug, warn};

use super::{SamplingMode, Track};
use crate::control::Monitor;
use crate::shapes::{Rectangle, Shape};
use crate::stochastics::NoiseParams;
use crate::tracklib_errors::TrackError;

#[cfg(feature = "progress")]
use crate::progress_bar::NoiseProgress;

/// Results and failures of a bulk operation, keyed by track position.
#[derive(Debug, Default)]
pub struct BatchOutcome<T> {
    pub results: Vec<(usize, T)>,
    pub failures: Vec<(usize, TrackError)>,
}

impl<T> BatchOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Results in collection order, dropping the positions.
    pub fn into_values(self) -> Vec<T> {
        self.results.into_iter().map(|(_, v)| v).collect()
    }

    fn record(&mut self, i: usize, res: Result<T, TrackError>, strict: bool) -> Result<(), TrackError> {
        match res {
            Ok(v) => self.results.push((i, v)),
            Err(e) if strict => return Err(e),
            Err(e) => {
                warn!(track = i, error = %e, "bulk operation failed on one track");
                self.failures.push((i, e));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackCollection {
    tracks: Vec<Track>,
}

impl From<Vec<Track>> for TrackCollection {
    fn from(tracks: Vec<Track>) -> Self {
        TrackCollection { tracks }
    }
}

impl FromIterator<Track> for TrackCollection {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        TrackCollection {
            tracks: iter.into_iter().collect(),
        }
    }
}

impl Extend<Track> for TrackCollection {
    fn extend<I: IntoIterator<Item = Track>>(&mut self, iter: I) {
        self.tracks.extend(iter);
    }
}

impl IntoIterator for TrackCollection {
    type Item = Track;
    type IntoIter = std::vec::IntoIter<Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.into_iter()
    }
}

impl<'a> IntoIterator for &'a TrackCollection {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

impl TrackCollection {
    pub fn new() -> Self {
        TrackCollection::default()
    }

    pub fn add(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn get(&self, i: usize) -> Option<&Track> {
        self.tracks.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut Track> {
        self.tracks.get_mut(i)
    }

    /// First track with the given track identifier.
    pub fn find_by_tid(&self, tid: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.tid == tid)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Track> {
        self.tracks.iter_mut()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Total number of observations.
    pub fn observation_count(&self) -> usize {
        self.tracks.iter().map(Track::size).sum()
    }

    /// Planar bounding box of every observation, `None` when there is none.
    pub fn bbox(&self) -> Option<Rectangle> {
        self.tracks
            .iter()
            .filter_map(Track::bbox)
            .reduce(|acc, b| acc.union(&b))
    }

    /// Tracks having at least one observation inside `shape`, kept whole.
    pub fn filter_by_shape(&self, shape: &dyn Shape) -> TrackCollection {
        self.tracks
            .iter()
            .filter(|t| t.observations().iter().any(|o| shape.contains(&o.position)))
            .cloned()
            .collect()
    }

    /// One noised copy of every track.
    ///
    /// Arguments
    /// -----------------
    /// * `params`: noise configuration shared by all tracks.
    /// * `rng`: random source, consumed in collection order.
    /// * `strict`: stop at the first failing track.
    /// * `monitor`: ticked once per track.
    ///
    /// Return
    /// ----------
    /// * The noised tracks and the failures. [`TrackError::Cancelled`] aborts
    ///   the whole batch whatever `strict` says.
    pub fn noise_all(
        &self,
        params: &NoiseParams,
        rng: &mut impl Rng,
        strict: bool,
        monitor: &mut Monitor,
    ) -> Result<BatchOutcome<Track>, TrackError> {
        let total = self.tracks.len();
        let mut outcome = BatchOutcome {
            results: Vec::with_capacity(total),
            failures: Vec::new(),
        };

        #[cfg(feature = "progress")]
        let mut progress = NoiseProgress::new(total);

        for (i, track) in self.tracks.iter().enumerate() {
            if let Err(e) = monitor.tick(i, total) {
                #[cfg(feature = "progress")]
                progress.abandon("interrupted");
                return Err(e);
            }

            let res = track.noise(params, rng);
            #[cfg(feature = "progress")]
            {
                progress.record(track.size(), res.is_ok());
                if strict && res.is_err() {
                    progress.abandon("failed");
                }
            }
            outcome.record(i, res, strict)?;
        }

        #[cfg(feature = "progress")]
        progress.finish();
        debug!(
            noised = outcome.results.len(),
            failed = outcome.failures.len(),
            "collection noised"
        );
        Ok(outcome)
    }

    /// Resampled copy of every track.
    pub fn resample_all(
        &self,
        step: f64,
        mode: SamplingMode,
        strict: bool,
    ) -> Result<BatchOutcome<Track>, TrackError> {
        let mut outcome = BatchOutcome::default();
        for (i, track) in self.tracks.iter().enumerate() {
            outcome.record(i, track.resample(step, mode), strict)?;
        }
        Ok(outcome)
    }

    /// Kinematic features on every track, in place.
    pub fn compute_kinematics_all(&mut self, strict: bool) -> Result<BatchOutcome<()>, TrackError> {
        let mut outcome = BatchOutcome::default();
        for (i, track) in self.tracks.iter_mut().enumerate() {
            outcome.record(i, track.compute_kinematics(), strict)?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod track_collection_test {
    use super::*;
    use crate::kernel::Kernel;
    use crate::shapes::Circle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn collection() -> TrackCollection {
        vec![
            Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
            Track::from_xy(&[(10.0, 10.0), (11.0, 12.0)]),
        ]
        .into()
    }

    #[test]
    fn test_bbox_and_lookup() {
        let c = collection();
        assert_eq!(c.len(), 2);
        assert_eq!(c.observation_count(), 5);
        let b = c.bbox().unwrap();
        assert_eq!((b.x_min, b.y_min, b.x_max, b.y_max), (0.0, 0.0, 11.0, 12.0));
        assert!(c.get(2).is_none());
    }

    #[test]
    fn test_filter_by_shape() {
        let c = collection();
        let kept = c.filter_by_shape(&Circle::new(0.0, 0.0, 1.5));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.get(0).unwrap().size(), 3);
    }

    #[test]
    fn test_resample_collects_failures() {
        let c = collection();
        let out = c.resample_all(-1.0, SamplingMode::Spatial, false).unwrap();
        assert_eq!(out.failures.len(), 2);
        assert!(c.resample_all(-1.0, SamplingMode::Spatial, true).is_err());
        let ok = c.resample_all(0.5, SamplingMode::Spatial, true).unwrap();
        assert!(ok.is_complete());
    }

    #[test]
    fn test_noise_all_and_cancel() {
        let c = collection();
        let params = NoiseParams::simple(1.0, Kernel::gaussian(2.0).unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let out = c.noise_all(&params, &mut rng, true, &mut Monitor::new()).unwrap();
        assert_eq!(out.into_values().len(), 2);

        let token = crate::control::CancelToken::new();
        token.cancel();
        let mut monitor = Monitor::new().with_token(token);
        assert_eq!(
            c.noise_all(&params, &mut rng, false, &mut monitor).unwrap_err(),
            TrackError::Cancelled
        );
    }

    #[test]
    fn test_kinematics_all() {
        let mut c = collection();
        let out = c.compute_kinematics_all(true).unwrap();
        assert!(out.is_complete());
        assert!(c.get(0).unwrap().has_feature(crate::constants::SPEED));
    }
}
