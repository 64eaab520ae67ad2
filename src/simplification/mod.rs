//! # Track simplification
//!
//! | Mode | Tolerance | Module |
//! |------|-----------|--------|
//! | Douglas–Peucker | distance to the chord | [`douglas_peucker`] |
//! | Visvalingam | square root of the effective area | [`visvalingam`] |
//! | Squaring | angle to π/2, in degrees | [`squaring`] |
//! | Optimal, strict deviation | distance to the chord | [`optimal`] |
//! | Optimal, max deviation | penalty per segment | [`optimal`] |
//! | Optimal, MBR aspect | penalty per segment | [`optimal`] |
//!
//! Every mode except squaring returns a subset of the observations, features
//! included. Squaring keeps all observations and moves them.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::control::Monitor;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

pub mod douglas_peucker;
pub mod optimal;
pub mod squaring;
pub mod visvalingam;

pub use douglas_peucker::douglas_peucker;
pub use optimal::{optimal_segmentation, MaxDeviation, MbrAspect, SegmentCost, StrictDeviation};
pub use squaring::square;
pub use visvalingam::visvalingam;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimplifyMode {
    DouglasPeucker,
    Visvalingam,
    Squaring,
    OptimalStrict,
    OptimalMaxDeviation,
    OptimalMbr,
}

impl FromStr for SimplifyMode {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "douglas_peucker" | "dp" => Ok(SimplifyMode::DouglasPeucker),
            "visvalingam" | "vw" => Ok(SimplifyMode::Visvalingam),
            "squaring" => Ok(SimplifyMode::Squaring),
            "optimal_strict" => Ok(SimplifyMode::OptimalStrict),
            "optimal_max_deviation" => Ok(SimplifyMode::OptimalMaxDeviation),
            "optimal_mbr" => Ok(SimplifyMode::OptimalMbr),
            other => Err(TrackError::wrong(format!("unknown simplification mode '{other}'"))),
        }
    }
}

impl fmt::Display for SimplifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimplifyMode::DouglasPeucker => "douglas_peucker",
            SimplifyMode::Visvalingam => "visvalingam",
            SimplifyMode::Squaring => "squaring",
            SimplifyMode::OptimalStrict => "optimal_strict",
            SimplifyMode::OptimalMaxDeviation => "optimal_max_deviation",
            SimplifyMode::OptimalMbr => "optimal_mbr",
        };
        write!(f, "{s}")
    }
}

impl Track {
    /// Simplified copy of the track.
    ///
    /// Arguments
    /// -----------------
    /// * `tolerance`: threshold of the chosen mode (see the module table), `>= 0`.
    /// * `mode`: the algorithm.
    ///
    /// Return
    /// ----------
    /// * The simplified track, or [`TrackError::WrongArgument`] for a negative
    ///   or non-finite tolerance.
    pub fn simplify(&self, tolerance: f64, mode: SimplifyMode) -> Result<Track, TrackError> {
        if !(tolerance >= 0.0 && tolerance.is_finite()) {
            return Err(TrackError::wrong(format!(
                "simplification tolerance must be finite and >= 0, got {tolerance}"
            )));
        }
        let mut monitor = Monitor::new();
        let kept = match mode {
            SimplifyMode::DouglasPeucker => douglas_peucker(self, tolerance),
            SimplifyMode::Visvalingam => visvalingam(self, tolerance),
            SimplifyMode::Squaring => return square(self, tolerance.to_radians()),
            SimplifyMode::OptimalStrict => {
                optimal_segmentation(self, &StrictDeviation { threshold: tolerance }, 1.0, &mut monitor)?
            }
            SimplifyMode::OptimalMaxDeviation => {
                optimal_segmentation(self, &MaxDeviation, tolerance, &mut monitor)?
            }
            SimplifyMode::OptimalMbr => optimal_segmentation(self, &MbrAspect, tolerance, &mut monitor)?,
        };
        Ok(self.select(&kept))
    }
}

#[cfg(test)]
mod simplification_test {
    use super::*;

    #[test]
    fn test_modes_keep_endpoints_and_features() {
        let mut t = Track::from_xy(&[(0.0, 0.0), (1.0, 0.01), (2.0, 0.0), (2.0, 1.0), (2.0, 2.0)]);
        t.set_feature("w", vec![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        for mode in [
            SimplifyMode::DouglasPeucker,
            SimplifyMode::Visvalingam,
            SimplifyMode::OptimalStrict,
        ] {
            let s = t.simplify(0.2, mode).unwrap();
            assert_eq!(s.get_feature("w").unwrap(), vec![0.0, 2.0, 4.0], "{mode}");
        }
    }

    #[test]
    fn test_negative_tolerance() {
        let t = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0)]);
        assert!(t.simplify(-1.0, SimplifyMode::DouglasPeucker).is_err());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("DP".parse::<SimplifyMode>().unwrap(), SimplifyMode::DouglasPeucker);
        assert!("nope".parse::<SimplifyMode>().is_err());
    }
}
