//! # Tracks: observations and analytical features
//!
//! A [`Track`] is an ordered sequence of [`Observation`]s plus a column-oriented
//! [`FeatureStore`] of analytical features. Every feature column holds exactly one
//! value per observation; every structural operation below keeps that invariant:
//!
//! * appending an observation extends each column with its no-data sentinel
//!   (`NaN` for floats, `-999999` for ints, `false` for bools, nothing for text),
//! * removing, slicing, reversing or resampling applies the same index map to the
//!   columns as to the observations,
//! * [`Track::concatenate`] keeps only the features present in both tracks.
//!
//! Observations of one track share a single [`CoordKind`]; tracks in a local frame
//! carry their geodetic anchor (`base`) for the way back.
//!
//! Observations need not be time-ordered. [`Track::resample`] in temporal mode and
//! [`Track::extract_time_window`] require non-decreasing timestamps and say so.
//!
//! Modules
//! -----------------
//! * [`feature_store`] – typed feature columns.
//! * [`track_collection`] – ordered sets of tracks with bulk operations.
use std::fmt;

use itertools::Itertools;

use crate::constants::{Meter, Seconds, NAN};
use crate::coords::{Coord, CoordKind};
use crate::observation::Observation;
use crate::shapes::{Rectangle, Shape};
use crate::time::Timestamp;
use crate::tracklib_errors::TrackError;

pub mod feature_store;
pub mod track_collection;

pub use feature_store::{FeatureColumn, FeatureKind, FeatureStore, FeatureValue};
pub use track_collection::TrackCollection;

/// Reference of an average rate or a resampling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Seconds between samples
    Temporal,
    /// Ground distance between samples
    Spatial,
}

/// Ordered observations with named analytical features.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub uid: String,
    pub tid: String,
    base: Option<Coord>,
    observations: Vec<Observation>,
    features: FeatureStore,
}

impl Default for Track {
    fn default() -> Self {
        Track::new(Vec::new())
    }
}

impl Track {
    /// Create a track from a list of observations (empty allowed).
    pub fn new(observations: Vec<Observation>) -> Self {
        Track {
            uid: "0".to_string(),
            tid: "0".to_string(),
            base: None,
            observations,
            features: FeatureStore::new(),
        }
    }

    pub fn with_ids(observations: Vec<Observation>, uid: &str, tid: &str) -> Self {
        let mut track = Track::new(observations);
        track.uid = uid.to_string();
        track.tid = tid.to_string();
        track
    }

    /// Untimed track from planar ENU points, observation `i` stamped at `i` seconds.
    pub fn from_xy(points: &[(f64, f64)]) -> Self {
        Track::new(
            points
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| {
                    Observation::new(Coord::enu(x, y, 0.0), Timestamp::from_unix(i as f64))
                })
                .collect(),
        )
    }

    /// Synthetic ENU track `(fx(t), fy(t))` sampled at `n` evenly spaced `t` in `[t0, t1]`.
    ///
    /// Observation timestamps are `t` Unix seconds.
    pub fn from_parametric<FX, FY>(fx: FX, fy: FY, t0: f64, t1: f64, n: usize) -> Self
    where
        FX: Fn(f64) -> f64,
        FY: Fn(f64) -> f64,
    {
        let step = if n > 1 { (t1 - t0) / (n - 1) as f64 } else { 0.0 };
        Track::new(
            (0..n)
                .map(|i| {
                    let t = if i + 1 == n && n > 1 { t1 } else { t0 + i as f64 * step };
                    Observation::new(Coord::enu(fx(t), fy(t), 0.0), Timestamp::from_unix(t))
                })
                .collect(),
        )
    }

    // ---------------------------------------------------------------------------------------------
    // Observations
    // ---------------------------------------------------------------------------------------------

    pub fn size(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn observations_mut(&mut self) -> &mut [Observation] {
        &mut self.observations
    }

    pub fn observation(&self, i: usize) -> Result<&Observation, TrackError> {
        self.observations.get(i).ok_or(TrackError::Index {
            index: i,
            size: self.size(),
        })
    }

    pub fn observation_mut(&mut self, i: usize) -> Result<&mut Observation, TrackError> {
        let size = self.size();
        self.observations
            .get_mut(i)
            .ok_or(TrackError::Index { index: i, size })
    }

    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Coordinate kind of the track, `None` when empty.
    pub fn kind(&self) -> Option<CoordKind> {
        self.observations.first().map(|o| o.position.kind())
    }

    /// Geodetic anchor of a local-frame track.
    pub fn base(&self) -> Option<Coord> {
        self.base
    }

    pub fn set_base(&mut self, base: Option<Coord>) {
        self.base = base;
    }

    /// Append an observation; each feature column grows by its no-data sentinel.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::Structural`] if the coordinate kind differs from the track's.
    pub fn add_observation(&mut self, obs: Observation) -> Result<(), TrackError> {
        if let Some(kind) = self.kind() {
            if kind != obs.position.kind() {
                return Err(TrackError::Structural(format!(
                    "cannot add a {} observation to a {kind} track",
                    obs.position.kind()
                )));
            }
        }
        self.observations.push(obs);
        self.features.push_missing();
        Ok(())
    }

    pub fn remove_observation(&mut self, i: usize) -> Result<(), TrackError> {
        self.remove_list(&[i])
    }

    /// Remove several observations (any order, duplicates ignored).
    pub fn remove_list(&mut self, indices: &[usize]) -> Result<(), TrackError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.size()) {
            return Err(TrackError::Index {
                index: bad,
                size: self.size(),
            });
        }
        let mut drop = vec![false; self.size()];
        indices.iter().for_each(|&i| drop[i] = true);
        let keep: Vec<usize> = (0..self.size()).filter(|&i| !drop[i]).collect();
        *self = self.select(&keep);
        Ok(())
    }

    /// New track made of observations `indices` (in that order), features included.
    pub fn select(&self, indices: &[usize]) -> Track {
        Track {
            uid: self.uid.clone(),
            tid: self.tid.clone(),
            base: self.base,
            observations: indices.iter().map(|&i| self.observations[i]).collect(),
            features: self.features.select(indices),
        }
    }

    /// Observations `i..=j`, features sliced accordingly.
    pub fn extract(&self, i: usize, j: usize) -> Result<Track, TrackError> {
        if j >= self.size() {
            return Err(TrackError::Index {
                index: j,
                size: self.size(),
            });
        }
        if i > j {
            return Err(TrackError::wrong(format!("extract({i}, {j}): empty range")));
        }
        Ok(self.select(&(i..=j).collect::<Vec<_>>()))
    }

    /// Observations whose timestamp lies in `[start, end]`.
    pub fn extract_time_window(&self, start: &Timestamp, end: &Timestamp) -> Track {
        let keep: Vec<usize> = (0..self.size())
            .filter(|&i| {
                let t = &self.observations[i].timestamp;
                t >= start && t <= end
            })
            .collect();
        self.select(&keep)
    }

    /// Deep copy.
    pub fn copy(&self) -> Track {
        self.clone()
    }

    /// Append `other` after `self`.
    ///
    /// Features present in both tracks are concatenated; features present in only one
    /// of them are dropped from the result.
    pub fn concatenate(&self, other: &Track) -> Result<Track, TrackError> {
        if let (Some(a), Some(b)) = (self.kind(), other.kind()) {
            if a != b {
                return Err(TrackError::Structural(format!(
                    "cannot concatenate a {a} track with a {b} track"
                )));
            }
        }
        let mut observations = self.observations.clone();
        observations.extend_from_slice(&other.observations);
        let features = match (self.is_empty(), other.is_empty()) {
            (true, _) => other.features.clone(),
            (_, true) => self.features.clone(),
            _ => self.features.concatenate(&other.features)?,
        };
        Ok(Track {
            uid: self.uid.clone(),
            tid: self.tid.clone(),
            base: self.base.or(other.base),
            observations,
            features,
        })
    }

    /// Reversed copy; feature columns reversed too.
    pub fn reverse(&self) -> Track {
        self.select(&(0..self.size()).rev().collect::<Vec<_>>())
    }

    /// Stable sort of the observations by timestamp.
    pub fn sort_by_time(&mut self) {
        let order: Vec<usize> = (0..self.size())
            .sorted_by(|&a, &b| {
                self.observations[a]
                    .timestamp
                    .partial_cmp(&self.observations[b].timestamp)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .collect();
        *self = self.select(&order);
    }

    // ---------------------------------------------------------------------------------------------
    // Bulk coordinate access
    // ---------------------------------------------------------------------------------------------

    pub fn x(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.position.x()).collect()
    }

    pub fn y(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.position.y()).collect()
    }

    pub fn z(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.position.z()).collect()
    }

    /// Timestamps as Unix seconds.
    pub fn t(&self) -> Vec<Seconds> {
        self.observations
            .iter()
            .map(|o| o.timestamp.to_unix())
            .collect()
    }

    /// Total 2D length.
    pub fn length(&self) -> Meter {
        self.observations
            .iter()
            .tuple_windows()
            .map(|(a, b)| a.distance_2d(b))
            .sum()
    }

    /// Elapsed seconds between first and last observations.
    pub fn duration(&self) -> Seconds {
        match (self.first(), self.last()) {
            (Some(a), Some(b)) => b.timestamp - a.timestamp,
            _ => 0.0,
        }
    }

    /// Earliest and latest timestamps, whatever the observation order.
    pub fn time_span(&self) -> Option<(Timestamp, Timestamp)> {
        let mut stamps = self.observations.iter().map(|o| o.timestamp);
        let first = stamps.next()?;
        Some(stamps.fold((first, first), |(lo, hi), t| {
            (if t < lo { t } else { lo }, if t > hi { t } else { hi })
        }))
    }

    /// Cumulative 2D distance from the first observation.
    pub(crate) fn cumulative_distance(&self) -> Vec<Meter> {
        let mut s = Vec::with_capacity(self.size());
        let mut acc = 0.0;
        for (i, obs) in self.observations.iter().enumerate() {
            if i > 0 {
                acc += self.observations[i - 1].distance_2d(obs);
            }
            s.push(acc);
        }
        s
    }

    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        self.observations
            .iter_mut()
            .for_each(|o| o.position.translate(dx, dy, dz));
    }

    pub fn rotate(&mut self, theta: f64) {
        self.observations
            .iter_mut()
            .for_each(|o| o.position.rotate(theta));
    }

    pub fn scale(&mut self, factor: f64) {
        self.observations
            .iter_mut()
            .for_each(|o| o.position.scale(factor));
    }

    /// Bounding rectangle of the positions (raw first two components).
    pub fn bbox(&self) -> Option<Rectangle> {
        Rectangle::from_points(self.observations.iter().map(|o| (o.position.x(), o.position.y())))
    }

    /// Keep observations inside `shape`.
    pub fn select_by(&self, shape: &dyn Shape) -> Track {
        let keep: Vec<usize> = (0..self.size())
            .filter(|&i| shape.contains(&self.observations[i].position))
            .collect();
        self.select(&keep)
    }

    // ---------------------------------------------------------------------------------------------
    // Coordinate systems
    // ---------------------------------------------------------------------------------------------

    /// Convert to a local frame anchored at `base`, or at the first point if `None`.
    pub fn to_enu(&mut self, base: Option<Coord>) -> Result<(), TrackError> {
        if self.kind() == Some(CoordKind::Enu) {
            return Ok(());
        }
        let Some(anchor) = base.or_else(|| self.first().map(|o| o.position.to_geo())) else {
            return Ok(());
        };
        let anchor = anchor.to_geo();
        if anchor.kind() != CoordKind::Geo {
            return Err(TrackError::wrong("ENU anchor must be a GEO or ECEF coordinate"));
        }
        for obs in self.observations.iter_mut() {
            obs.position = obs.position.to_enu(&anchor);
        }
        self.base = Some(anchor);
        Ok(())
    }

    /// Convert to geodetic coordinates.
    pub fn to_geo(&mut self) -> Result<(), TrackError> {
        match self.kind() {
            Some(CoordKind::Enu) => {
                let base = self.base.ok_or_else(|| {
                    TrackError::wrong("local-frame track has no anchor to convert from")
                })?;
                for obs in self.observations.iter_mut() {
                    obs.position = obs.position.to_geo_from(&base);
                }
            }
            Some(CoordKind::Ecef) => {
                for obs in self.observations.iter_mut() {
                    obs.position = obs.position.to_geo();
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Convert to earth-centered coordinates.
    pub fn to_ecef(&mut self) -> Result<(), TrackError> {
        if self.kind() == Some(CoordKind::Enu) {
            let base = self.base.ok_or_else(|| {
                TrackError::wrong("local-frame track has no anchor to convert from")
            })?;
            for obs in self.observations.iter_mut() {
                obs.position = obs.position.enu_to_ecef(&base);
            }
        } else {
            for obs in self.observations.iter_mut() {
                obs.position = obs.position.to_ecef();
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Features
    // ---------------------------------------------------------------------------------------------

    pub fn features(&self) -> &FeatureStore {
        &self.features
    }

    pub fn feature_names(&self) -> &[String] {
        self.features.names()
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features.contains(name)
    }

    /// Create a float feature filled with `initial` (zero by default).
    pub fn create_feature(&mut self, name: &str, initial: Option<f64>) -> Result<(), TrackError> {
        let column = FeatureColumn::Float(vec![initial.unwrap_or(0.0); self.size()]);
        self.features.insert(name, column, self.size())
    }

    /// Create a typed feature filled with no-data.
    pub fn create_typed_feature(&mut self, name: &str, kind: FeatureKind) -> Result<(), TrackError> {
        self.features
            .insert(name, FeatureColumn::missing(kind, self.size()), self.size())
    }

    /// Evaluate `f(track, i)` for every index and store the result as a float feature.
    pub fn add_feature<F>(&mut self, name: &str, f: F) -> Result<(), TrackError>
    where
        F: Fn(&Track, usize) -> f64,
    {
        let values: Vec<f64> = (0..self.size()).map(|i| f(self, i)).collect();
        self.features
            .insert(name, FeatureColumn::Float(values), self.size())
    }

    /// Replace (or create) a whole float feature.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::Structural`] if `values.len()` differs from the observation count.
    pub fn set_feature(&mut self, name: &str, values: Vec<f64>) -> Result<(), TrackError> {
        self.features
            .insert(name, FeatureColumn::Float(values), self.size())
    }

    /// Replace (or create) a whole column of any type.
    pub fn set_feature_column(
        &mut self,
        name: &str,
        column: FeatureColumn,
    ) -> Result<(), TrackError> {
        self.features.insert(name, column, self.size())
    }

    pub fn set_feature_value(
        &mut self,
        name: &str,
        i: usize,
        value: f64,
    ) -> Result<(), TrackError> {
        self.set_feature_typed(name, i, FeatureValue::Float(value))
    }

    pub fn set_feature_typed(
        &mut self,
        name: &str,
        i: usize,
        value: FeatureValue,
    ) -> Result<(), TrackError> {
        let size = self.size();
        if i >= size {
            return Err(TrackError::Index { index: i, size });
        }
        self.features.column_mut(name)?.set(i, value);
        Ok(())
    }

    /// Numeric value of feature `name` at `i`.
    pub fn get_feature_value(&self, name: &str, i: usize) -> Result<f64, TrackError> {
        Ok(self.get_feature_typed(name, i)?.as_f64())
    }

    pub fn get_feature_typed(&self, name: &str, i: usize) -> Result<FeatureValue, TrackError> {
        let column = self.features.column(name)?;
        if i >= self.size() {
            return Err(TrackError::Index {
                index: i,
                size: self.size(),
            });
        }
        Ok(column.get(i))
    }

    /// Numeric copy of feature `name`.
    pub fn get_feature(&self, name: &str) -> Result<Vec<f64>, TrackError> {
        Ok(self.features.column(name)?.to_f64())
    }

    pub fn feature_column(&self, name: &str) -> Result<&FeatureColumn, TrackError> {
        self.features.column(name)
    }

    pub fn remove_feature(&mut self, name: &str) -> Result<(), TrackError> {
        self.features.remove(name).map(|_| ())
    }

    // ---------------------------------------------------------------------------------------------
    // Sampling
    // ---------------------------------------------------------------------------------------------

    /// Average sampling rate: `1 / mean Δt` (Hz) or `1 / mean Δs` (1/m).
    pub fn frequency(&self, mode: SamplingMode) -> f64 {
        if self.size() < 2 {
            return NAN;
        }
        let span = match mode {
            SamplingMode::Temporal => self.duration().abs(),
            SamplingMode::Spatial => self.length(),
        };
        if span == 0.0 {
            return NAN;
        }
        (self.size() - 1) as f64 / span
    }

    /// Resample so that consecutive observations are `step` seconds (temporal) or
    /// `step` ground units (spatial) apart.
    ///
    /// Positions, timestamps and float features are linearly interpolated; int, bool
    /// and text features take the nearest original value.
    ///
    /// The output always ends on the last observation: when the span is not a multiple
    /// of `step`, the final gap is shorter than `step`.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::WrongArgument`] if `step <= 0`, or if temporal mode meets
    ///   decreasing timestamps.
    pub fn resample(&self, step: f64, mode: SamplingMode) -> Result<Track, TrackError> {
        if !(step > 0.0) {
            return Err(TrackError::wrong(format!("resampling step must be > 0, got {step}")));
        }
        if self.size() < 2 {
            return Ok(self.clone());
        }

        let abscissa = match mode {
            SamplingMode::Spatial => self.cumulative_distance(),
            SamplingMode::Temporal => {
                let t = self.t();
                if t.iter().tuple_windows().any(|(a, b)| b < a) {
                    return Err(TrackError::wrong(
                        "temporal resampling requires non-decreasing timestamps",
                    ));
                }
                let t0 = t[0];
                t.into_iter().map(|x| x - t0).collect()
            }
        };

        let total = abscissa[self.size() - 1];
        let n_out = (total / step + 1e-9).floor() as usize + 1;
        let mut targets: Vec<f64> = (0..n_out).map(|k| k as f64 * step).collect();
        // the last observation is kept, closer than `step` to its predecessor if need be
        if targets.last().is_some_and(|&s| total - s > 1e-9 * step) {
            targets.push(total);
        }
        self.interpolate_along(&abscissa, &targets)
    }

    /// Position and timestamp at time `t` by linear interpolation, `None` outside the track.
    pub fn interpolate_at(&self, t: &Timestamp) -> Option<Observation> {
        let ts = self.t();
        let target = t.to_unix();
        if ts.iter().tuple_windows().any(|(a, b)| b < a) {
            return None;
        }
        ts.iter()
            .tuple_windows()
            .position(|(a, b)| *a <= target && target <= *b)?;
        self.interpolate_along(&ts, &[target]).ok()?.first().copied()
    }

    /// Build a track sampled at `targets` along a non-decreasing `abscissa`.
    fn interpolate_along(&self, abscissa: &[f64], targets: &[f64]) -> Result<Track, TrackError> {
        let n = self.size();
        let mut spans: Vec<(usize, f64)> = Vec::with_capacity(targets.len());
        let mut j = 0usize;
        for &s in targets {
            while j + 2 < n && abscissa[j + 1] < s {
                j += 1;
            }
            let len = abscissa[j + 1] - abscissa[j];
            let r = if len > 0.0 { ((s - abscissa[j]) / len).clamp(0.0, 1.0) } else { 0.0 };
            spans.push((j, r));
        }

        let observations = spans
            .iter()
            .map(|&(j, r)| {
                let (a, b) = (&self.observations[j], &self.observations[j + 1]);
                let lerp = |u: f64, v: f64| u + r * (v - u);
                let position = Coord::of_kind(
                    a.position.kind(),
                    lerp(a.position.x(), b.position.x()),
                    lerp(a.position.y(), b.position.y()),
                    lerp(a.position.z(), b.position.z()),
                );
                let timestamp = Timestamp::from_unix(lerp(a.timestamp.to_unix(), b.timestamp.to_unix()));
                Observation::new(position, timestamp)
            })
            .collect();

        let mut features = FeatureStore::new();
        for (name, column) in self.features.iter() {
            let out = match column {
                FeatureColumn::Float(v) => FeatureColumn::Float(
                    spans
                        .iter()
                        .map(|&(j, r)| v[j] + r * (v[j + 1] - v[j]))
                        .collect(),
                ),
                other => {
                    let nearest: Vec<usize> = spans
                        .iter()
                        .map(|&(j, r)| if r < 0.5 { j } else { j + 1 })
                        .collect();
                    let mut picked = FeatureColumn::missing(other.kind(), nearest.len());
                    for (k, &i) in nearest.iter().enumerate() {
                        picked.set(k, other.get(i));
                    }
                    picked
                }
            };
            features.insert(name, out, spans.len())?;
        }

        Ok(Track {
            uid: self.uid.clone(),
            tid: self.tid.clone(),
            base: self.base,
            observations,
            features,
        })
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Track uid={} tid={} ({} observations, features: [{}])",
            self.uid,
            self.tid,
            self.size(),
            self.feature_names().join(", ")
        )?;
        if f.alternate() {
            for (i, obs) in self.observations.iter().enumerate() {
                writeln!(f, "  {i:>5} {obs}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod track_test {
    use super::*;
    use crate::tracklib_errors::ErrorKind;
    use approx::assert_abs_diff_eq;

    fn line(n: usize) -> Track {
        Track::from_xy(&(0..n).map(|i| (i as f64, 0.0)).collect::<Vec<_>>())
    }

    #[test]
    fn test_add_observation_extends_features() {
        let mut t = line(3);
        t.create_feature("speed", Some(1.0)).unwrap();
        t.create_typed_feature("label", FeatureKind::Text).unwrap();
        t.add_observation(Observation::untimed(Coord::enu(3.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(t.size(), 4);
        for name in t.feature_names() {
            assert_eq!(t.feature_column(name).unwrap().len(), 4);
        }
        assert!(t.get_feature_value("speed", 3).unwrap().is_nan());

        let err = t
            .add_observation(Observation::untimed(Coord::geo(2.0, 48.0, 0.0)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_time_span_ignores_order() {
        let mut t = line(4);
        t.observations_mut()[0].timestamp = Timestamp::from_unix(10.0);
        let (lo, hi) = t.time_span().unwrap();
        assert_abs_diff_eq!(lo.to_unix(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hi.to_unix(), 10.0, epsilon = 1e-9);
        assert!(Track::default().time_span().is_none());
    }

    #[test]
    fn test_remove_and_extract() {
        let mut t = line(6);
        t.add_feature("idx", |_, i| i as f64).unwrap();
        t.remove_list(&[4, 1]).unwrap();
        assert_eq!(t.get_feature("idx").unwrap(), vec![0.0, 2.0, 3.0, 5.0]);
        assert_eq!(t.x(), vec![0.0, 2.0, 3.0, 5.0]);

        let sub = t.extract(1, 2).unwrap();
        assert_eq!(sub.get_feature("idx").unwrap(), vec![2.0, 3.0]);
        assert_eq!(t.extract(1, 9).unwrap_err().kind(), ErrorKind::Index);
        assert_eq!(t.remove_observation(10).unwrap_err().kind(), ErrorKind::Index);
    }

    #[test]
    fn test_feature_errors() {
        let mut t = line(3);
        assert_eq!(t.get_feature("nope").unwrap_err().kind(), ErrorKind::MissingFeature);
        assert_eq!(
            t.set_feature("f", vec![1.0, 2.0]).unwrap_err().kind(),
            ErrorKind::Structural
        );
        t.create_feature("f", None).unwrap();
        assert_eq!(
            t.set_feature_value("f", 3, 1.0).unwrap_err().kind(),
            ErrorKind::Index
        );
    }

    #[test]
    fn test_concatenate_and_reverse() {
        let mut a = line(2);
        a.create_feature("shared", Some(1.0)).unwrap();
        a.create_feature("only_a", Some(5.0)).unwrap();
        let mut b = line(3);
        b.create_feature("shared", Some(2.0)).unwrap();

        let c = a.concatenate(&b).unwrap();
        assert_eq!(c.size(), 5);
        assert_eq!(c.get_feature("shared").unwrap(), vec![1.0, 1.0, 2.0, 2.0, 2.0]);
        assert!(!c.has_feature("only_a"));

        let r = c.reverse();
        assert_eq!(r.x(), vec![2.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(r.get_feature("shared").unwrap()[0], 2.0);
    }

    #[test]
    fn test_spatial_resample() {
        let mut t = Track::from_xy(&[(0.0, 0.0), (10.0, 0.0)]);
        t.set_feature("v", vec![0.0, 100.0]).unwrap();
        let r = t.resample(2.5, SamplingMode::Spatial).unwrap();
        assert_eq!(r.size(), 5);
        assert_abs_diff_eq!(r.x()[1], 2.5);
        assert_abs_diff_eq!(r.get_feature_value("v", 2).unwrap(), 50.0);
        assert_abs_diff_eq!(r.t()[4], 1.0);
    }

    #[test]
    fn test_resample_keeps_last_observation() {
        let mut t = Track::from_xy(&[(0.0, 0.0), (10.0, 0.0)]);
        t.set_feature("v", vec![0.0, 100.0]).unwrap();
        let r = t.resample(3.0, SamplingMode::Spatial).unwrap();
        assert_eq!(r.x(), vec![0.0, 3.0, 6.0, 9.0, 10.0]);
        assert_abs_diff_eq!(r.get_feature_value("v", 4).unwrap(), 100.0);
        assert_abs_diff_eq!(r.t()[4], 1.0);

        let r = line(4).resample(2.0, SamplingMode::Temporal).unwrap();
        assert_eq!(r.t(), vec![0.0, 2.0, 3.0]);
    }

    #[test]
    fn test_feature_insert_checks_length() {
        let mut t = line(3);
        t.create_feature("a", None).unwrap();
        t.create_typed_feature("b", FeatureKind::Int).unwrap();
        t.add_feature("c", |tr, i| tr.x()[i] * 2.0).unwrap();
        assert_eq!(t.get_feature("c").unwrap(), vec![0.0, 2.0, 4.0]);
        assert_eq!(t.feature_column("b").unwrap().len(), 3);

        let other = line(2);
        let c = t.concatenate(&other).unwrap();
        assert_eq!(c.size(), 5);
        assert!(!c.has_feature("a"));
    }

    #[test]
    fn test_temporal_resample_and_frequency() {
        let t = line(11); // one point per second, one meter apart
        assert_abs_diff_eq!(t.frequency(SamplingMode::Temporal), 1.0);
        assert_abs_diff_eq!(t.frequency(SamplingMode::Spatial), 1.0);
        let r = t.resample(0.5, SamplingMode::Temporal).unwrap();
        assert_eq!(r.size(), 21);
        assert_abs_diff_eq!(r.x()[3], 1.5);
        assert!(t.resample(0.0, SamplingMode::Temporal).is_err());
    }

    #[test]
    fn test_circle_generator() {
        let tau = std::f64::consts::TAU;
        let t = Track::from_parametric(|s| (tau * s).cos(), |s| (tau * s).sin(), 0.0, 1.0, 100);
        assert_eq!(t.size(), 100);
        assert_abs_diff_eq!(t.x()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.y()[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.x()[99], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.y()[99], 0.0, epsilon = 1e-12);
        for o in t.observations() {
            let r2 = o.position.x().powi(2) + o.position.y().powi(2);
            assert_abs_diff_eq!(r2, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_enu_round_trip() {
        let mut t = Track::new(vec![
            Observation::untimed(Coord::geo(2.0, 48.0, 10.0)),
            Observation::untimed(Coord::geo(2.001, 48.002, 12.0)),
        ]);
        let original = t.clone();
        t.to_enu(None).unwrap();
        assert_eq!(t.kind(), Some(CoordKind::Enu));
        assert_abs_diff_eq!(t.x()[0], 0.0, epsilon = 1e-6);
        t.to_geo().unwrap();
        for (a, b) in t.observations().iter().zip(original.observations()) {
            assert!(a.position.distance_3d(&b.position) < 1e-3);
        }
    }
}
