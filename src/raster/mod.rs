//! # Raster summaries
//!
//! Projects the observations of a [`TrackCollection`] on a regular grid and
//! reduces, cell by cell, the values of analytical features.
//!
//! Grid construction
//! -----------------
//! 1. bounding box of the collection, `W × H`;
//! 2. padding by the margin factor `m`: `m·W` and `m·H` on each side when
//!    centered, `2m·W` and `2m·H` on the far side when anchored at a corner;
//! 3. `ncol = ⌊W' / dx⌋`, `nrow = ⌊H' / dy⌋` (at least one), then the effective
//!    `dx`, `dy` are stretched so that the cells tile the box exactly.
//!
//! An observation at `(x, y)` falls in column `⌊(x - x_min) / dx⌋` and in row
//! `⌊(y - y_min) / dy⌋` counted from the bottom; points on the upper or right
//! edge go to the last cell. Maps are stored with row 0 at the top, the way
//! they are displayed and written to ASC files.
//!
//! Empty cells hold `0` for `count` and `count_distinct` and the no-data value
//! otherwise. Values of a cell that are `NaN` are skipped by every reducer.
//!
//! Maps are addressed as `"<feature>#<reducer>"`, e.g. `"speed#mean"`.
use std::fmt;
use std::str::FromStr;

use ahash::AHashSet;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::NO_DATA_VALUE;
use crate::operators::aggregate::median;
use crate::operators::read_input;
use crate::shapes::Rectangle;
use crate::track::TrackCollection;
use crate::tracklib_errors::TrackError;

pub mod asc;

pub use asc::{read_asc, write_asc};

/// Cell reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Count,
    /// Number of distinct tracks with an observation in the cell
    CountDistinct,
    Min,
    Max,
    Mean,
    Median,
    Sum,
}

impl Reducer {
    fn counts(&self) -> bool {
        matches!(self, Reducer::Count | Reducer::CountDistinct)
    }
}

impl FromStr for Reducer {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(Reducer::Count),
            "count_distinct" => Ok(Reducer::CountDistinct),
            "min" => Ok(Reducer::Min),
            "max" => Ok(Reducer::Max),
            "mean" | "avg" => Ok(Reducer::Mean),
            "median" => Ok(Reducer::Median),
            "sum" => Ok(Reducer::Sum),
            other => Err(TrackError::wrong(format!("unknown cell reducer '{other}'"))),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reducer::Count => "count",
            Reducer::CountDistinct => "count_distinct",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Mean => "mean",
            Reducer::Median => "median",
            Reducer::Sum => "sum",
        };
        write!(f, "{s}")
    }
}

/// Anchor of the padding around the bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    LowerLeft,
    #[default]
    Center,
    UpperRight,
}

/// Grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterParams {
    pub dx: f64,
    pub dy: f64,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_no_data")]
    pub no_data: f64,
}

fn default_no_data() -> f64 {
    NO_DATA_VALUE
}

impl RasterParams {
    pub fn new(dx: f64, dy: f64) -> Self {
        RasterParams {
            dx,
            dy,
            margin: 0.0,
            alignment: Alignment::Center,
            no_data: NO_DATA_VALUE,
        }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_no_data(mut self, no_data: f64) -> Self {
        self.no_data = no_data;
        self
    }

    fn validate(&self) -> Result<(), TrackError> {
        if !(self.dx > 0.0 && self.dy > 0.0 && self.dx.is_finite() && self.dy.is_finite()) {
            return Err(TrackError::wrong(format!(
                "raster resolution must be positive, got {} x {}",
                self.dx, self.dy
            )));
        }
        if !(self.margin >= 0.0 && self.margin.is_finite()) {
            return Err(TrackError::wrong(format!(
                "raster margin must be finite and >= 0, got {}",
                self.margin
            )));
        }
        Ok(())
    }
}

/// Named grid of reduced values, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct AfMap {
    pub name: String,
    /// Lower-left corner of the grid.
    pub x_min: f64,
    pub y_min: f64,
    pub dx: f64,
    pub dy: f64,
    pub no_data: f64,
    pub values: DMatrix<f64>,
}

impl AfMap {
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Value at display position (`row` 0 at the top).
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied()
    }

    /// Value at `row` counted from the bottom of the grid.
    pub fn get_bottom_up(&self, row: usize, col: usize) -> Option<f64> {
        let nrows = self.nrows();
        if row >= nrows {
            return None;
        }
        self.get(nrows - 1 - row, col)
    }

    pub fn is_no_data(&self, v: f64) -> bool {
        v == self.no_data || v.is_nan()
    }
}

impl fmt::Display for AfMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} x {})", self.name, self.nrows(), self.ncols())?;
        for r in 0..self.nrows() {
            let row: Vec<String> = (0..self.ncols())
                .map(|c| {
                    let v = self.values[(r, c)];
                    if self.is_no_data(v) {
                        ".".to_string()
                    } else {
                        format!("{v}")
                    }
                })
                .collect();
            writeln!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

/// Grid geometry plus one [`AfMap`] per requested `(feature, reducer)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub bbox: Rectangle,
    pub dx: f64,
    pub dy: f64,
    pub ncols: usize,
    pub nrows: usize,
    maps: Vec<AfMap>,
}

/// Name of the map of `feature` reduced by `reducer`.
pub fn map_name(feature: &str, reducer: Reducer) -> String {
    format!("{feature}#{reducer}")
}

impl Raster {
    /// Summarize a collection.
    ///
    /// Arguments
    /// -----------------
    /// * `collection`: the tracks, in a planar frame.
    /// * `specs`: `(feature, reducer)` pairs. Features can be analytical
    ///   features or the pseudo-features `x`, `y`, `z`, `t`, `idx`. Counting
    ///   reducers accept any name, even absent from the tracks.
    /// * `params`: resolution, margin, alignment and no-data value.
    ///
    /// Return
    /// ----------
    /// * The raster, or [`TrackError::WrongArgument`] on an empty collection or
    ///   invalid parameters, [`TrackError::MissingFeature`] when a value reducer
    ///   names a feature absent from a track.
    pub fn summarize(
        collection: &TrackCollection,
        specs: &[(&str, Reducer)],
        params: &RasterParams,
    ) -> Result<Raster, TrackError> {
        params.validate()?;
        let bbox = collection
            .bbox()
            .ok_or_else(|| TrackError::wrong("cannot rasterize an empty collection"))?;

        let (w, h) = (bbox.width(), bbox.height());
        let (mw, mh) = (params.margin * w, params.margin * h);
        let (mut x_min, mut y_min, mut x_max, mut y_max) = match params.alignment {
            Alignment::Center => (bbox.x_min - mw, bbox.y_min - mh, bbox.x_max + mw, bbox.y_max + mh),
            Alignment::LowerLeft => (bbox.x_min, bbox.y_min, bbox.x_max + 2.0 * mw, bbox.y_max + 2.0 * mh),
            Alignment::UpperRight => (bbox.x_min - 2.0 * mw, bbox.y_min - 2.0 * mh, bbox.x_max, bbox.y_max),
        };
        // a flat box still gets one cell
        if x_max - x_min <= 0.0 {
            x_max = x_min + params.dx;
        }
        if y_max - y_min <= 0.0 {
            y_max = y_min + params.dy;
        }
        let ncols = (((x_max - x_min) / params.dx).floor() as usize).max(1);
        let nrows = (((y_max - y_min) / params.dy).floor() as usize).max(1);
        let dx = (x_max - x_min) / ncols as f64;
        let dy = (y_max - y_min) / nrows as f64;
        // guard the rounding of the stretched resolution
        x_min = x_max - dx * ncols as f64;
        y_min = y_max - dy * nrows as f64;

        let cell_of = |x: f64, y: f64| -> Option<(usize, usize)> {
            if !(x >= x_min && x <= x_max && y >= y_min && y <= y_max) {
                return None;
            }
            let col = (((x - x_min) / dx).floor() as usize).min(ncols - 1);
            let row_up = (((y - y_min) / dy).floor() as usize).min(nrows - 1);
            Some((nrows - 1 - row_up, col))
        };

        let mut maps = Vec::with_capacity(specs.len());
        for &(feature, reducer) in specs {
            // (value, track index) per cell
            let mut cells: Vec<Vec<(f64, usize)>> = vec![Vec::new(); nrows * ncols];
            let mut outside = 0_usize;
            for (k, track) in collection.iter().enumerate() {
                let values = match read_input(track, feature) {
                    Ok(v) => v,
                    Err(_) if reducer.counts() => vec![0.0; track.size()],
                    Err(e) => return Err(e),
                };
                for (obs, v) in track.observations().iter().zip(values) {
                    match cell_of(obs.position.x(), obs.position.y()) {
                        Some((r, c)) => cells[r * ncols + c].push((v, k)),
                        None => outside += 1,
                    }
                }
            }
            if outside > 0 {
                debug!(feature, outside, "observations outside the raster grid");
            }

            let values = DMatrix::from_fn(nrows, ncols, |r, c| {
                reduce(&cells[r * ncols + c], reducer, params.no_data)
            });
            maps.push(AfMap {
                name: map_name(feature, reducer),
                x_min,
                y_min,
                dx,
                dy,
                no_data: params.no_data,
                values,
            });
        }

        Ok(Raster {
            bbox: Rectangle::new(x_min, y_min, x_max, y_max),
            dx,
            dy,
            ncols,
            nrows,
            maps,
        })
    }

    /// Map by name, `"<feature>#<reducer>"`.
    pub fn af_map(&self, name: &str) -> Result<&AfMap, TrackError> {
        self.maps
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| TrackError::wrong(format!("no raster map named '{name}'")))
    }

    pub fn maps(&self) -> &[AfMap] {
        &self.maps
    }

    pub fn names(&self) -> Vec<&str> {
        self.maps.iter().map(|m| m.name.as_str()).collect()
    }
}

fn reduce(cell: &[(f64, usize)], reducer: Reducer, no_data: f64) -> f64 {
    if reducer == Reducer::CountDistinct {
        return cell.iter().map(|&(_, k)| k).collect::<AHashSet<_>>().len() as f64;
    }
    let valid: Vec<f64> = cell.iter().map(|&(v, _)| v).filter(|v| !v.is_nan()).collect();
    if reducer == Reducer::Count {
        return valid.len() as f64;
    }
    if valid.is_empty() {
        return no_data;
    }
    match reducer {
        Reducer::Min => valid.iter().copied().fold(f64::INFINITY, f64::min),
        Reducer::Max => valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Reducer::Sum => valid.iter().sum(),
        Reducer::Mean => valid.iter().sum::<f64>() / valid.len() as f64,
        Reducer::Median => median(valid),
        Reducer::Count | Reducer::CountDistinct => no_data,
    }
}

impl TrackCollection {
    /// Shorthand for [`Raster::summarize`].
    pub fn summarize(&self, specs: &[(&str, Reducer)], params: &RasterParams) -> Result<Raster, TrackError> {
        Raster::summarize(self, specs, params)
    }
}

#[cfg(test)]
mod raster_test {
    use super::*;
    use crate::track::Track;

    fn two_tracks() -> TrackCollection {
        let mut a = Track::from_xy(&[(5.0, 5.0), (15.0, 5.0), (25.0, 5.0), (35.0, 35.0)]);
        a.set_feature("speed", vec![1.0, 2.0, 3.0, f64::NAN]).unwrap();
        let mut b = Track::from_xy(&[(6.0, 6.0), (36.0, 36.0)]);
        b.set_feature("speed", vec![4.0, 10.0]).unwrap();
        vec![a, b].into()
    }

    #[test]
    fn test_grid_shape_and_counts() {
        let c = two_tracks();
        // bbox 31 x 31 tiled by 10 m cells: 3 x 3, stretched
        let raster = c
            .summarize(&[("uid", Reducer::CountDistinct), ("speed", Reducer::Count)], &RasterParams::new(10.0, 10.0))
            .unwrap();
        assert_eq!((raster.nrows, raster.ncols), (3, 3));
        let distinct = raster.af_map("uid#count_distinct").unwrap();
        assert_eq!(distinct.get_bottom_up(0, 0), Some(2.0));
        assert_eq!(distinct.get(0, 2), Some(2.0));
        assert_eq!(distinct.get(1, 1), Some(0.0));
        let count = raster.af_map("speed#count").unwrap();
        // the NaN speed of (35, 35) is not counted
        assert_eq!(count.get(0, 2), Some(1.0));
        assert_eq!(count.get_bottom_up(0, 0), Some(3.0));
    }

    #[test]
    fn test_value_reducers() {
        let c = two_tracks();
        let params = RasterParams::new(10.0, 10.0);
        let specs = [
            ("speed", Reducer::Mean),
            ("speed", Reducer::Max),
            ("speed", Reducer::Median),
        ];
        let raster = c.summarize(&specs, &params).unwrap();
        let mean = raster.af_map("speed#mean").unwrap();
        assert_eq!(mean.get_bottom_up(0, 0), Some((1.0 + 2.0 + 4.0) / 3.0));
        assert_eq!(mean.get(1, 1), Some(NO_DATA_VALUE));
        assert_eq!(raster.af_map("speed#max").unwrap().get(0, 2), Some(10.0));
        assert_eq!(raster.af_map("speed#median").unwrap().get_bottom_up(0, 0), Some(2.0));
        assert!(raster.af_map("speed#sum").is_err());
    }

    #[test]
    fn test_margin_and_alignment() {
        let c = two_tracks();
        let params = RasterParams::new(10.0, 10.0)
            .with_margin(0.5)
            .with_alignment(Alignment::LowerLeft);
        let raster = c.summarize(&[("speed", Reducer::Sum)], &params).unwrap();
        assert_eq!((raster.nrows, raster.ncols), (6, 6));
        approx::assert_abs_diff_eq!(raster.bbox.x_min, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_params() {
        let c = two_tracks();
        assert!(c.summarize(&[("speed", Reducer::Sum)], &RasterParams::new(0.0, 1.0)).is_err());
        assert!(c.summarize(&[("nope", Reducer::Mean)], &RasterParams::new(1.0, 1.0)).is_err());
        assert!("bogus".parse::<Reducer>().is_err());
    }
}
