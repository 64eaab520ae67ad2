//! # Central track and fusion
//!
//! A central track summarizes a bundle of tracks that follow the same route.
//! Each track is DTW-matched against a reference; for every reference index the
//! matched points of a track are averaged, then the per-track averages are
//! averaged across the bundle.
//!
//! [`fusion`] iterates this construction: the central track of one round is the
//! reference of the next, until it stops moving.
use tracing::{debug, warn};

use super::dtw::{dtw_core, DtwParams};
use crate::constants::{FUSION_EPSILON, FUSION_MAX_ITER};
use crate::control::Monitor;
use crate::observation::Observation;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Outcome of [`fusion`].
#[derive(Debug, Clone, PartialEq)]
pub struct FusionResult {
    /// Fused track, with the reference's timestamps and features.
    pub track: Track,
    /// Number of refinement rounds performed.
    pub iterations: usize,
    /// Largest point displacement of the last round.
    pub last_update: f64,
}

impl FusionResult {
    pub fn converged(&self) -> bool {
        self.last_update < FUSION_EPSILON
    }
}

fn euclidean(p: &Observation, q: &Observation) -> f64 {
    p.distance_2d(q)
}

/// One averaging round; returns the new central track and its displacement.
fn average_round<F>(tracks: &[Track], central: &Track, cost: &F) -> Result<(Track, f64), TrackError>
where
    F: Fn(&Observation, &Observation) -> f64,
{
    let params = DtwParams {
        ends: true,
        ..DtwParams::default()
    };
    let n = central.size();
    let mut sums = vec![[0.0_f64; 3]; n];
    let mut counts = vec![0_usize; n];

    for track in tracks {
        let (_, pairs) = dtw_core(central, track, cost, &params, &mut Monitor::new())?;
        let obs = track.observations();
        for (i, matched) in pairs.iter().enumerate() {
            if matched.is_empty() {
                continue;
            }
            let k = matched.len() as f64;
            let mean = matched.iter().fold([0.0; 3], |acc, &j| {
                let p = &obs[j].position;
                [acc[0] + p.x() / k, acc[1] + p.y() / k, acc[2] + p.z() / k]
            });
            for (s, m) in sums[i].iter_mut().zip(mean) {
                *s += m;
            }
            counts[i] += 1;
        }
    }

    let mut next = central.copy();
    let mut moved: f64 = 0.0;
    for (i, o) in next.observations_mut().iter_mut().enumerate() {
        if counts[i] == 0 {
            continue;
        }
        let c = counts[i] as f64;
        let before = o.position;
        o.position.set_x(sums[i][0] / c);
        o.position.set_y(sums[i][1] / c);
        o.position.set_z(sums[i][2] / c);
        moved = moved.max(before.distance_3d(&o.position));
    }
    Ok((next, moved))
}

fn check_bundle(tracks: &[Track], reference: usize) -> Result<(), TrackError> {
    if tracks.is_empty() {
        return Err(TrackError::wrong("central track of an empty bundle"));
    }
    if reference >= tracks.len() {
        return Err(TrackError::Index {
            index: reference,
            size: tracks.len(),
        });
    }
    Ok(())
}

/// Central track of a bundle, with `tracks[reference]` as the skeleton.
///
/// The reference takes part in the average (it matches itself point to point).
pub fn central_track(tracks: &[Track], reference: usize) -> Result<Track, TrackError> {
    check_bundle(tracks, reference)?;
    average_round(tracks, &tracks[reference], &euclidean).map(|(t, _)| t)
}

/// Iterative fusion of a bundle.
///
/// Arguments
/// -----------------
/// * `tracks`: the bundle.
/// * `reference`: index of the initial central track.
/// * `cost`: local matching cost between a central point and a track point.
///
/// Return
/// ----------
/// * The fused track and the number of rounds. The loop stops when no central
///   point moves by `FUSION_EPSILON` or more, or after `FUSION_MAX_ITER` rounds.
pub fn fusion<F>(tracks: &[Track], reference: usize, cost: F) -> Result<FusionResult, TrackError>
where
    F: Fn(&Observation, &Observation) -> f64,
{
    check_bundle(tracks, reference)?;
    let mut central = tracks[reference].copy();
    let mut last_update = f64::INFINITY;
    let mut iterations = 0;
    while iterations < FUSION_MAX_ITER {
        let (next, moved) = average_round(tracks, &central, &cost)?;
        central = next;
        last_update = moved;
        iterations += 1;
        if moved < FUSION_EPSILON {
            debug!(iterations, "fusion converged");
            break;
        }
    }
    if last_update >= FUSION_EPSILON {
        warn!(iterations, last_update, "fusion stopped before convergence");
    }
    Ok(FusionResult {
        track: central,
        iterations,
        last_update,
    })
}

#[cfg(test)]
mod central_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bundle() -> Vec<Track> {
        vec![
            Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
            Track::from_xy(&[(0.0, 2.0), (1.0, 2.0), (2.0, 2.0)]),
            Track::from_xy(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0)]),
        ]
    }

    #[test]
    fn test_central_of_parallel_lines() {
        let central = central_track(&bundle(), 0).unwrap();
        for (i, y) in central.y().iter().enumerate() {
            assert_abs_diff_eq!(*y, 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(central.x()[i], i as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fusion_converges() {
        let res = fusion(&bundle(), 0, |p, q| p.distance_2d(q)).unwrap();
        assert!(res.converged());
        assert!(res.iterations <= FUSION_MAX_ITER);
        assert_abs_diff_eq!(res.track.y()[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_reference() {
        assert!(matches!(
            central_track(&bundle(), 5),
            Err(TrackError::Index { index: 5, size: 3 })
        ));
        assert!(central_track(&[], 0).is_err());
    }
}
