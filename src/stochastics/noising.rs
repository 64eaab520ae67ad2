//! # Correlated noise injection
//!
//! For every `(σ_k, K_k)` component of [`NoiseParams`]:
//!
//! 1. `Σ` is built by [`build_covariance`] with the control rows first,
//! 2. `εI` is added and `Σ` is rescaled by `σ_k² / Σ[0, 0]`,
//! 3. `Σ = L Lᵀ` is partitioned as `[[L11, 0], [L21, L22]]`, `L11` of size `Nc × Nc`;
//!    a failed factorization is retried with a growing diagonal jitter, then with the
//!    negative eigenvalues clamped when `force` is set or when they only come from
//!    the truncation of the kernel at its half-width,
//! 4. per active component `c` the displacement is
//!    `ΔC = L22 · w + L21 · L11⁻¹ · Cᶜ`, `w` i.i.d. draws, `Cᶜ` the wanted control
//!    displacements.
//!
//! Component fields are summed. The wanted control displacement is shared among
//! components in proportion to `σ_k²`, so the sum meets it exactly; after the
//! draw, controlled observations are set to their target (or left untouched when
//! the target is `None`) to absorb rounding.
//!
//! [`NoiseEngine`] factorizes once and draws any number of realizations.
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use tracing::{debug, warn};

use super::covariance::{build_covariance, force_psd};
use super::params::NoiseParams;
use crate::constants::{
    COVARIANCE_EPSILON, COVARIANCE_JITTER, COVARIANCE_JITTER_STEPS, TRUNCATION_TOLERANCE,
};
use crate::coords::Coord;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Displacement axes of a realization: x, y, z and along the horizontal normal.
const AXES: usize = 4;

struct Field {
    l22: DMatrix<f64>,
    /// Conditional mean per axis, `L21 · L11⁻¹ · Cᶜ`.
    mean: [DVector<f64>; AXES],
}

/// Prepared noising of one track.
pub struct NoiseEngine<'a> {
    track: &'a Track,
    params: &'a NoiseParams,
    fields: Vec<Field>,
    normals: Vec<(f64, f64)>,
}

impl<'a> NoiseEngine<'a> {
    /// Factorize the covariance of every component.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::Numerical`] if a covariance is indefinite beyond kernel
    ///   truncation and `force` is off, or stays singular after forcing.
    /// * [`TrackError::Index`] for a control index out of range.
    pub fn new(track: &'a Track, params: &'a NoiseParams) -> Result<Self, TrackError> {
        let n = track.size();
        let control: Vec<usize> = params.control.iter().map(|c| c.index).collect();
        let normals = horizontal_normals(track);

        let wanted = wanted_displacements(track, params, &normals)?;
        let total_var: f64 = params.components.iter().map(|(s, _)| s * s).sum();

        let mut fields = Vec::with_capacity(params.components.len());
        for (sigma, kernel) in &params.components {
            if *sigma == 0.0 || n == 0 {
                continue;
            }
            let mut cov = build_covariance(track, kernel, params.mode, &control, params.force)?;
            let m = cov.nrows();
            cov += DMatrix::<f64>::identity(m, m) * COVARIANCE_EPSILON;
            let scale = sigma * sigma / cov[(0, 0)];
            cov *= scale;

            let l = cholesky_lower(cov, params.force)?;
            let nc = control.len();
            let l11 = l.view((0, 0), (nc, nc)).into_owned();
            let l21 = l.view((nc, 0), (n, nc)).into_owned();
            let l22 = l.view((nc, nc), (n, n)).into_owned();

            let share = if total_var > 0.0 { sigma * sigma / total_var } else { 0.0 };
            let mean_axis = |c: &DVector<f64>| -> Result<DVector<f64>, TrackError> {
                if nc == 0 {
                    return Ok(DVector::zeros(n));
                }
                let y = l11
                    .solve_lower_triangular(&(c * share))
                    .ok_or_else(|| TrackError::Numerical("singular control block".into()))?;
                Ok(&l21 * y)
            };
            let mean = [
                mean_axis(&wanted[0])?,
                mean_axis(&wanted[1])?,
                mean_axis(&wanted[2])?,
                mean_axis(&wanted[3])?,
            ];
            fields.push(Field { l22, mean });
        }

        debug!(
            n,
            components = fields.len(),
            controls = control.len(),
            "noise engine ready"
        );
        Ok(NoiseEngine {
            track,
            params,
            fields,
            normals,
        })
    }

    /// Draw one noised copy of the track.
    pub fn realize(&self, rng: &mut impl Rng) -> Track {
        let n = self.track.size();
        let dirs = self.params.directions;
        let active = [dirs.x, dirs.y, dirs.z && !dirs.ortho, dirs.ortho];

        let mut disp: [DVector<f64>; AXES] = std::array::from_fn(|_| DVector::zeros(n));
        for field in &self.fields {
            for axis in 0..AXES {
                if !active[axis] {
                    continue;
                }
                let w = DVector::from_vec(self.params.distribution.sample_n(n, rng));
                disp[axis] += &field.l22 * w + &field.mean[axis];
            }
        }

        let mut out = self.track.copy();
        for (i, obs) in out.observations_mut().iter_mut().enumerate() {
            let (nx, ny) = self.normals[i];
            let dx = disp[0][i] + nx * disp[3][i];
            let dy = disp[1][i] + ny * disp[3][i];
            obs.position.translate(dx, dy, disp[2][i]);
        }

        let original = self.track.observations();
        let observations = out.observations_mut();
        for cp in &self.params.control {
            observations[cp.index].position = cp.target.unwrap_or(original[cp.index].position);
        }
        if self.params.cycle && n > 1 {
            observations[n - 1].position = observations[0].position;
        }
        out
    }
}

/// Lower Cholesky factor of a noise covariance.
///
/// The factorization is retried with a growing diagonal jitter. If the matrix is
/// still not positive definite, its negative eigenvalues are clamped when `force`
/// is set or when they are small enough to come from the truncation of the kernel
/// at its half-width.
fn cholesky_lower(cov: DMatrix<f64>, force: bool) -> Result<DMatrix<f64>, TrackError> {
    if let Some(l) = jittered_cholesky(&cov) {
        return Ok(l);
    }
    let eigenvalues = cov.clone().symmetric_eigenvalues();
    let (lowest, highest) = (eigenvalues.min(), eigenvalues.max());
    if !force && lowest < -TRUNCATION_TOLERANCE * highest {
        return Err(TrackError::Numerical(format!(
            "covariance matrix is not positive definite (lowest eigenvalue {lowest:.3e}, \
             set force to project it)"
        )));
    }
    warn!(lowest, highest, force, "projecting covariance matrix on the PSD cone");
    jittered_cholesky(&force_psd(cov)).ok_or_else(|| {
        TrackError::Numerical("covariance matrix stays singular after PSD projection".into())
    })
}

/// Cholesky factor of `cov + jI`, `j` starting at zero then growing from
/// [`COVARIANCE_JITTER`] times the largest diagonal term.
fn jittered_cholesky(cov: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if let Some(chol) = cov.clone().cholesky() {
        return Some(chol.l());
    }
    let m = cov.nrows();
    let mut jitter = COVARIANCE_JITTER * cov.diagonal().max();
    for _ in 0..COVARIANCE_JITTER_STEPS {
        let candidate = cov + DMatrix::<f64>::identity(m, m) * jitter;
        if let Some(chol) = candidate.cholesky() {
            warn!(jitter, "covariance factorized after diagonal jitter");
            return Some(chol.l());
        }
        jitter *= 10.0;
    }
    None
}

/// Unit horizontal normals (tangent rotated by +90°), zero where the tangent vanishes.
fn horizontal_normals(track: &Track) -> Vec<(f64, f64)> {
    let obs = track.observations();
    let n = obs.len();
    (0..n)
        .map(|i| {
            if n < 2 {
                return (0.0, 0.0);
            }
            let (a, b) = (i.saturating_sub(1), (i + 1).min(n - 1));
            let tx = obs[b].position.x() - obs[a].position.x();
            let ty = obs[b].position.y() - obs[a].position.y();
            let norm = tx.hypot(ty);
            if norm == 0.0 {
                (0.0, 0.0)
            } else {
                (-ty / norm, tx / norm)
            }
        })
        .collect()
}

/// Wanted displacement of every control point, per axis.
fn wanted_displacements(
    track: &Track,
    params: &NoiseParams,
    normals: &[(f64, f64)],
) -> Result<[DVector<f64>; AXES], TrackError> {
    let nc = params.control.len();
    let mut wanted: [DVector<f64>; AXES] = std::array::from_fn(|_| DVector::zeros(nc));
    for (k, cp) in params.control.iter().enumerate() {
        let origin: Coord = track.observation(cp.index)?.position;
        let Some(target) = cp.target else {
            continue;
        };
        if target.kind() != origin.kind() {
            return Err(TrackError::wrong(format!(
                "control target is {} but the track is {}",
                target.kind(),
                origin.kind()
            )));
        }
        let (dx, dy, dz) = (
            target.x() - origin.x(),
            target.y() - origin.y(),
            target.z() - origin.z(),
        );
        let (nx, ny) = normals[cp.index];
        if params.directions.ortho {
            wanted[3][k] = dx * nx + dy * ny;
        } else {
            wanted[0][k] = dx;
            wanted[1][k] = dy;
        }
        wanted[2][k] = dz;
    }
    Ok(wanted)
}

/// Draw `params.replicates` noised copies of `track`.
pub fn noise_replicates(
    track: &Track,
    params: &NoiseParams,
    rng: &mut impl Rng,
) -> Result<Vec<Track>, TrackError> {
    let engine = NoiseEngine::new(track, params)?;
    Ok((0..params.replicates).map(|_| engine.realize(rng)).collect())
}

impl Track {
    /// One noised copy of the track.
    pub fn noise(&self, params: &NoiseParams, rng: &mut impl Rng) -> Result<Track, TrackError> {
        Ok(NoiseEngine::new(self, params)?.realize(rng))
    }

    /// One noised copy drawn from the process-wide generator.
    pub fn noise_seeded(&self, params: &NoiseParams) -> Result<Track, TrackError> {
        let engine = NoiseEngine::new(self, params)?;
        Ok(super::with_global_rng(|rng| engine.realize(rng)))
    }
}

#[cfg(test)]
mod noising_test {
    use super::*;
    use crate::kernel::{Kernel, KernelKind};
    use crate::stochastics::{ControlPoint, DistanceMode, Directions};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line(n: usize) -> Track {
        Track::from_xy(&(0..n).map(|i| (i as f64, 0.0)).collect::<Vec<_>>())
    }

    #[test]
    fn test_control_targets_are_exact() {
        let track = line(20);
        let target = Coord::enu(5.0, 3.0, 0.0);
        let params = NoiseParams::builder()
            .component(2.0, Kernel::new(KernelKind::Gaussian, 4.0).unwrap())
            .component(0.5, Kernel::new(KernelKind::Gaussian, 2.0).unwrap())
            .control(ControlPoint::through(5, target))
            .control(ControlPoint::fixed(15))
            .build()
            .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for t in noise_replicates(&track, &params, &mut rng).unwrap() {
            assert_eq!(t.observations()[5].position, target);
            assert_eq!(t.observations()[15].position, track.observations()[15].position);
        }
    }

    #[test]
    fn test_empirical_covariance_matches_kernel_sum() {
        let track = line(6);
        let (s1, h1, s2, h2) = (2.0, 4.0, 1.0, 2.0);
        let params = NoiseParams::builder()
            .component(s1, Kernel::new(KernelKind::Triangular, h1).unwrap())
            .component(s2, Kernel::new(KernelKind::Triangular, h2).unwrap())
            .replicates(10_000)
            .build()
            .unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        let reps = noise_replicates(&track, &params, &mut rng).unwrap();
        let n = reps.len() as f64;
        let dx: Vec<Vec<f64>> = reps
            .iter()
            .map(|t| {
                t.observations()
                    .iter()
                    .zip(track.observations())
                    .map(|(a, b)| a.position.x() - b.position.x())
                    .collect()
            })
            .collect();
        let total = s1 * s1 + s2 * s2;
        for i in 0..track.size() {
            for j in 0..track.size() {
                let d = (i as f64 - j as f64).abs();
                let expected = s1 * s1 * (1.0 - d / h1).max(0.0) + s2 * s2 * (1.0 - d / h2).max(0.0);
                let empirical = dx.iter().map(|v| v[i] * v[j]).sum::<f64>() / n;
                assert!(
                    (empirical - expected).abs() < 0.06 * total,
                    "Σ[{i}, {j}]: {empirical} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn test_dense_gaussian_factorizes_without_force() {
        let track = Track::from_xy(&(0..100).map(|i| (i as f64 * 0.157, 0.0)).collect::<Vec<_>>());
        let params = NoiseParams::simple(1.0, Kernel::new(KernelKind::Gaussian, 10.0).unwrap()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let noised = track.noise(&params, &mut rng).unwrap();
        assert_eq!(noised.size(), 100);
        assert!(noised.observations().iter().all(|o| o.position.x().is_finite()));
    }

    #[test]
    fn test_cycle_closes_loop() {
        let tau = std::f64::consts::TAU;
        let track = Track::from_parametric(|s| (tau * s).cos(), |s| (tau * s).sin(), 0.0, 1.0, 40);
        let params = NoiseParams::builder()
            .component(0.1, Kernel::new(KernelKind::Gaussian, 1.0).unwrap())
            .mode(DistanceMode::Circular)
            .cycle(true)
            .directions(Directions::ortho())
            .build()
            .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let t = track.noise(&params, &mut rng).unwrap();
        assert_eq!(t.observations()[0].position, t.observations()[39].position);
    }

    #[test]
    fn test_sinc_requires_force() {
        let track = line(40);
        let sinc = Kernel::new(KernelKind::Sinc, 20.0).unwrap();
        let strict = NoiseParams::simple(1.0, sinc).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = track.noise(&strict, &mut rng).unwrap_err();
        assert_eq!(err.kind(), crate::tracklib_errors::ErrorKind::Numerical);

        let uniform = NoiseParams::simple(1.0, Kernel::new(KernelKind::Uniform, 10.0).unwrap()).unwrap();
        assert!(track.noise(&uniform, &mut rng).is_err());

        let forced = NoiseParams::builder().component(1.0, sinc).force(true).build().unwrap();
        assert!(track.noise(&forced, &mut rng).is_ok());
    }
}
