//! # Kernel covariance matrices
//!
//! For `N` observations, a kernel `K` and a distance mode, the covariance is
//! `Σ[i, j] = K(d(i, j))` with
//!
//! * `Linear`: `d = |s_i - s_j|`, `s` the curvilinear abscissa,
//! * `Euclidean`: `d = ‖p_i - p_j‖` in the horizontal plane,
//! * `Circular`: `d = min(Δ, L - Δ)`, `Δ = |s_i - s_j|`, `L` the total length.
//!
//! Control points come first: with `Nc` control indices the matrix is
//! `(Nc + N) × (Nc + N)` and row `k < Nc` describes observation `control[k]`.
//!
//! `force = true` projects `Σ` on the positive semidefinite cone by clamping the
//! negative eigenvalues of its symmetric eigen-decomposition to zero.
use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coords::Coord;
use crate::kernel::Kernel;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    #[default]
    Linear,
    Euclidean,
    Circular,
}

/// Constraint on a noise realization at one observation index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub index: usize,
    /// Position the noised track must pass through, or `None` to keep the original.
    pub target: Option<Coord>,
}

impl ControlPoint {
    pub fn fixed(index: usize) -> Self {
        ControlPoint {
            index,
            target: None,
        }
    }

    pub fn through(index: usize, target: Coord) -> Self {
        ControlPoint {
            index,
            target: Some(target),
        }
    }
}

/// Build the kernel covariance of `track`, control rows first.
///
/// Arguments
/// -----------------
/// * `track`: the observations.
/// * `kernel`: covariance kernel.
/// * `mode`: distance between two observations.
/// * `control`: observation indices of the control rows.
/// * `force`: project on the PSD cone.
///
/// Return
/// ----------
/// * The symmetric `(Nc + N) × (Nc + N)` matrix.
/// * [`TrackError::Index`] for a control index out of range.
pub fn build_covariance(
    track: &Track,
    kernel: &Kernel,
    mode: DistanceMode,
    control: &[usize],
    force: bool,
) -> Result<DMatrix<f64>, TrackError> {
    let n = track.size();
    if let Some(&bad) = control.iter().find(|&&i| i >= n) {
        return Err(TrackError::Index {
            index: bad,
            size: n,
        });
    }
    let rows: Vec<usize> = control.iter().copied().chain(0..n).collect();
    let m = rows.len();

    let s = track.cumulative_distance();
    let total = s.last().copied().unwrap_or(0.0);
    let obs = track.observations();
    let distance = |a: usize, b: usize| -> f64 {
        match mode {
            DistanceMode::Linear => (s[a] - s[b]).abs(),
            DistanceMode::Euclidean => obs[a].distance_2d(&obs[b]),
            DistanceMode::Circular => {
                let delta = (s[a] - s[b]).abs();
                delta.min(total - delta)
            }
        }
    };

    let k0 = kernel.evaluate(0.0);
    let mut sigma = DMatrix::<f64>::zeros(m, m);
    for i in 0..m {
        sigma[(i, i)] = k0;
        for j in 0..i {
            let v = kernel.evaluate(distance(rows[i], rows[j]));
            sigma[(i, j)] = v;
            sigma[(j, i)] = v;
        }
    }

    if force {
        sigma = force_psd(sigma);
    }
    Ok(sigma)
}

/// Nearest positive semidefinite matrix in the eigenvalue sense.
pub fn force_psd(sigma: DMatrix<f64>) -> DMatrix<f64> {
    let eig = SymmetricEigen::new(sigma);
    let negatives = eig.eigenvalues.iter().filter(|&&l| l < 0.0).count();
    if negatives == 0 {
        return eig.recompose();
    }
    warn!(negatives, "clamping negative eigenvalues of covariance matrix");
    let clamped = eig.eigenvalues.map(|l| l.max(0.0));
    let q = &eig.eigenvectors;
    let out = q * DMatrix::from_diagonal(&clamped) * q.transpose();
    // restore exact symmetry lost to rounding
    (&out + out.transpose()) * 0.5
}

#[cfg(test)]
mod covariance_test {
    use super::*;
    use crate::kernel::KernelKind;
    use approx::assert_relative_eq;

    fn line() -> Track {
        Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)])
    }

    #[test]
    fn test_symmetric_with_constant_diagonal() {
        let k = Kernel::new(KernelKind::Gaussian, 3.0).unwrap();
        let s = build_covariance(&line(), &k, DistanceMode::Linear, &[2], false).unwrap();
        assert_eq!(s.nrows(), 5);
        for i in 0..5 {
            assert_relative_eq!(s[(i, i)], 1.0);
            for j in 0..5 {
                assert_eq!(s[(i, j)], s[(j, i)]);
            }
        }
        // control row 0 is observation 2
        assert_relative_eq!(s[(0, 3)], 1.0);
        assert_relative_eq!(s[(0, 1)], k.evaluate(2.0));
    }

    #[test]
    fn test_circular_wraps() {
        let k = Kernel::new(KernelKind::Triangular, 4.0).unwrap();
        let s = build_covariance(&line(), &k, DistanceMode::Circular, &[], false).unwrap();
        // total length 3, |s0 - s3| = 3 wraps to 0
        assert_relative_eq!(s[(0, 3)], k.evaluate(0.0));
    }

    #[test]
    fn test_force_makes_sinc_psd() {
        let track = Track::from_xy(&(0..30).map(|i| (i as f64, 0.0)).collect::<Vec<_>>());
        let k = Kernel::new(KernelKind::Sinc, 10.0).unwrap();
        let s = build_covariance(&track, &k, DistanceMode::Linear, &[], true).unwrap();
        let eig = SymmetricEigen::new(s);
        assert!(eig.eigenvalues.iter().all(|&l| l > -1e-9));
    }

    #[test]
    fn test_bad_control_index() {
        let k = Kernel::dirac();
        assert!(build_covariance(&line(), &k, DistanceMode::Linear, &[9], false).is_err());
    }
}
