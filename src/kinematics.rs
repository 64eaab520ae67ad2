//! # Kinematic features
//!
//! Derived per-observation features, each stored under its reserved name:
//!
//! | Feature | Definition |
//! |---------|------------|
//! | `ds` | 2D distance from observation `i - 1` to `i`, `ds[0] = 0` |
//! | `abs_curv` | cumulative sum of `ds` (integrator operator) |
//! | `speed` | centered difference of `abs_curv` over time, one-sided at both ends |
//! | `heading` | azimuth (radians, clockwise from north) from `i - 1` to `i`, `heading[0] = heading[1]` |
//! | `acceleration` | centered difference of `speed` over time |
//! | `slope` | `atan(Δz / Δh)` in degrees from `i - 1` to `i`, `slope[0] = slope[1]` |
//! | `deniv_pos` / `deniv_neg` | cumulative positive / negative height gains, both as magnitudes |
//!
//! A zero time step (speed, acceleration) or a zero horizontal step (slope) yields
//! the float no-data sentinel at that index.
use tracing::debug;

use crate::constants::{
    Radian, ABS_CURV, ACCELERATION, DENIV_NEG, DENIV_POS, DS, HEADING, NAN, SLOPE, SPEED,
};
use crate::operators::{operate, Operator, UnaryOp};
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Centered finite difference `dv/dt`, one-sided at the ends, no-data where `Δt = 0`.
fn centered_rate(v: &[f64], t: &[f64]) -> Vec<f64> {
    let n = v.len();
    if n < 2 {
        return vec![NAN; n];
    }
    (0..n)
        .map(|i| {
            let (a, b) = match i {
                0 => (0, 1),
                i if i == n - 1 => (n - 2, n - 1),
                i => (i - 1, i + 1),
            };
            let dt = t[b] - t[a];
            if dt == 0.0 {
                NAN
            } else {
                (v[b] - v[a]) / dt
            }
        })
        .collect()
}

impl Track {
    /// Store `ds`.
    pub fn compute_ds(&mut self) -> Result<(), TrackError> {
        let obs = self.observations();
        let ds: Vec<f64> = (0..obs.len())
            .map(|i| if i == 0 { 0.0 } else { obs[i - 1].distance_2d(&obs[i]) })
            .collect();
        self.set_feature(DS, ds)
    }

    /// Store `ds` (if absent) and `abs_curv`.
    pub fn compute_abs_curv(&mut self) -> Result<(), TrackError> {
        if !self.has_feature(DS) {
            self.compute_ds()?;
        }
        operate(self, &Operator::Unary(UnaryOp::Integrator), &[DS], Some(ABS_CURV))?;
        Ok(())
    }

    /// Store `speed` (and `abs_curv` if absent).
    pub fn compute_speed(&mut self) -> Result<(), TrackError> {
        if !self.has_feature(ABS_CURV) {
            self.compute_abs_curv()?;
        }
        let s = self.get_feature(ABS_CURV)?;
        let speed = centered_rate(&s, &self.t());
        self.set_feature(SPEED, speed)
    }

    /// Store `acceleration` (and `speed` if absent).
    pub fn compute_acceleration(&mut self) -> Result<(), TrackError> {
        if !self.has_feature(SPEED) {
            self.compute_speed()?;
        }
        let v = self.get_feature(SPEED)?;
        let acc = centered_rate(&v, &self.t());
        self.set_feature(ACCELERATION, acc)
    }

    /// Store `heading`.
    pub fn compute_heading(&mut self) -> Result<(), TrackError> {
        let obs = self.observations();
        let n = obs.len();
        let mut heading: Vec<Radian> = (0..n)
            .map(|i| {
                if i == 0 {
                    NAN
                } else {
                    obs[i - 1].position.azimuth(&obs[i].position)
                }
            })
            .collect();
        if n > 1 {
            heading[0] = heading[1];
        }
        self.set_feature(HEADING, heading)
    }

    /// Store `slope` in degrees.
    pub fn compute_slope(&mut self) -> Result<(), TrackError> {
        let obs = self.observations();
        let n = obs.len();
        let mut slope: Vec<f64> = (0..n)
            .map(|i| {
                if i == 0 {
                    return NAN;
                }
                let dh = obs[i - 1].distance_2d(&obs[i]);
                if dh == 0.0 {
                    NAN
                } else {
                    let dz = obs[i].position.elevation() - obs[i - 1].position.elevation();
                    (dz / dh).atan().to_degrees()
                }
            })
            .collect();
        if n > 1 {
            slope[0] = slope[1];
        }
        self.set_feature(SLOPE, slope)
    }

    /// Store `deniv_pos` and `deniv_neg`.
    pub fn compute_denivellation(&mut self) -> Result<(), TrackError> {
        let z: Vec<f64> = self
            .observations()
            .iter()
            .map(|o| o.position.elevation())
            .collect();
        let mut pos = Vec::with_capacity(z.len());
        let mut neg = Vec::with_capacity(z.len());
        let (mut up, mut down) = (0.0, 0.0);
        for i in 0..z.len() {
            if i > 0 {
                let dz = z[i] - z[i - 1];
                if dz > 0.0 {
                    up += dz;
                } else {
                    down -= dz;
                }
            }
            pos.push(up);
            neg.push(down);
        }
        self.set_feature(DENIV_POS, pos)?;
        self.set_feature(DENIV_NEG, neg)
    }

    /// Every kinematic feature at once.
    pub fn compute_kinematics(&mut self) -> Result<(), TrackError> {
        debug!(uid = %self.uid, tid = %self.tid, n = self.size(), "computing kinematics");
        self.compute_ds()?;
        self.compute_abs_curv()?;
        self.compute_speed()?;
        self.compute_acceleration()?;
        self.compute_heading()?;
        self.compute_slope()?;
        self.compute_denivellation()
    }
}

#[cfg(test)]
mod kinematics_test {
    use super::*;
    use crate::coords::Coord;
    use crate::observation::Observation;
    use crate::time::Timestamp;
    use approx::assert_abs_diff_eq;

    fn climb() -> Track {
        let pts = [(0.0, 0.0, 0.0), (3.0, 4.0, 5.0), (6.0, 8.0, 0.0), (6.0, 8.0, 2.0)];
        Track::new(
            pts.iter()
                .enumerate()
                .map(|(i, &(x, y, z))| {
                    Observation::new(Coord::enu(x, y, z), Timestamp::from_unix(10.0 * i as f64))
                })
                .collect(),
        )
    }

    #[test]
    fn test_ds_and_abs_curv() {
        let mut t = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        t.compute_abs_curv().unwrap();
        assert_eq!(t.get_feature(DS).unwrap(), vec![0.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(t.get_feature(ABS_CURV).unwrap(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_speed_centered_and_one_sided() {
        let mut t = climb();
        t.compute_speed().unwrap();
        let v = t.get_feature(SPEED).unwrap();
        assert_abs_diff_eq!(v[0], 0.5);
        assert_abs_diff_eq!(v[1], 0.5);
        assert_abs_diff_eq!(v[2], 0.25);
        assert_abs_diff_eq!(v[3], 0.0);
    }

    #[test]
    fn test_zero_time_step_is_no_data() {
        let mut t = Track::new(vec![
            Observation::untimed(Coord::enu(0.0, 0.0, 0.0)),
            Observation::untimed(Coord::enu(1.0, 0.0, 0.0)),
        ]);
        t.compute_speed().unwrap();
        assert!(t.get_feature(SPEED).unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_heading_slope_deniv() {
        let mut t = climb();
        t.compute_kinematics().unwrap();
        let h = t.get_feature(HEADING).unwrap();
        assert_abs_diff_eq!(h[0], h[1]);
        assert_abs_diff_eq!(h[1], (3.0f64).atan2(4.0), epsilon = 1e-12);

        let s = t.get_feature(SLOPE).unwrap();
        assert_abs_diff_eq!(s[1], 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s[2], -45.0, epsilon = 1e-9);
        assert!(s[3].is_nan());

        assert_eq!(t.get_feature(DENIV_POS).unwrap(), vec![0.0, 5.0, 5.0, 7.0]);
        assert_eq!(t.get_feature(DENIV_NEG).unwrap(), vec![0.0, 0.0, 5.0, 5.0]);
    }
}
