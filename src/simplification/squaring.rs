//! # Squaring
//!
//! Straightens the nearly right angles of a polyline (typically a building
//! footprint). The angles are detected once on the input, then the positions
//! minimize
//!
//! ```text
//! λ Σ_k ‖p_k - p⁰_k‖² + Σ_{i ∈ R} ((p_i - p_{i-1}) · (p_{i+1} - p_i))²
//! ```
//!
//! by a fixed number of Gauss–Newton iterations. A track whose first and last
//! points coincide is a ring: its first vertex is a candidate corner too and
//! the closure is preserved.
use nalgebra::{DMatrix, DVector};

use crate::comparison::hausdorff::xy;
use crate::constants::Radian;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Weight of the attachment to the original positions.
pub const SQUARING_LAMBDA: f64 = 0.1;
/// Gauss–Newton iterations.
pub const SQUARING_ITERATIONS: usize = 5;

/// Vertices whose interior angle is within `tolerance` of π/2.
fn right_angles(pts: &[(f64, f64)], closed: bool, tolerance: Radian) -> Vec<usize> {
    let m = pts.len();
    let candidates: Vec<usize> = if closed { (0..m).collect() } else { (1..m.saturating_sub(1)).collect() };
    candidates
        .into_iter()
        .filter(|&i| {
            let (p, q, r) = (pts[(i + m - 1) % m], pts[i], pts[(i + 1) % m]);
            let u = (p.0 - q.0, p.1 - q.1);
            let v = (r.0 - q.0, r.1 - q.1);
            let nu = u.0.hypot(u.1);
            let nv = v.0.hypot(v.1);
            if nu == 0.0 || nv == 0.0 {
                return false;
            }
            let cos = ((u.0 * v.0 + u.1 * v.1) / (nu * nv)).clamp(-1.0, 1.0);
            (cos.acos() - std::f64::consts::FRAC_PI_2).abs() < tolerance
        })
        .collect()
}

/// Squared copy of `track`.
///
/// Arguments
/// -----------------
/// * `track`: the polyline, planar coordinates.
/// * `tolerance`: largest deviation from π/2 of a corner to square.
///
/// Return
/// ----------
/// * A track with the same observations and features, positions moved.
/// * [`TrackError::Numerical`] if the normal equations cannot be factorized.
pub fn square(track: &Track, tolerance: Radian) -> Result<Track, TrackError> {
    let n = track.size();
    if n < 3 {
        return Ok(track.copy());
    }
    let all = xy(track);
    let closed = (all[0].0 - all[n - 1].0).hypot(all[0].1 - all[n - 1].1) < 1e-12;
    let m = if closed { n - 1 } else { n };
    let original = &all[..m];
    let corners = right_angles(original, closed, tolerance);
    if corners.is_empty() {
        return Ok(track.copy());
    }

    let x0 = DVector::from_iterator(2 * m, original.iter().flat_map(|&(x, y)| [x, y]));
    let mut x = x0.clone();
    for _ in 0..SQUARING_ITERATIONS {
        let mut h = DMatrix::<f64>::identity(2 * m, 2 * m) * SQUARING_LAMBDA;
        let mut g: DVector<f64> = (&x - &x0) * SQUARING_LAMBDA;
        for &i in &corners {
            let (a, b, c) = ((i + m - 1) % m, i, (i + 1) % m);
            let p = |k: usize| (x[2 * k], x[2 * k + 1]);
            let (pa, pb, pc) = (p(a), p(b), p(c));
            let u = (pb.0 - pa.0, pb.1 - pa.1);
            let v = (pc.0 - pb.0, pc.1 - pb.1);
            let r = u.0 * v.0 + u.1 * v.1;
            // gradient of r with respect to (p_a, p_b, p_c)
            let grad = [
                (2 * a, -v.0),
                (2 * a + 1, -v.1),
                (2 * b, v.0 - u.0),
                (2 * b + 1, v.1 - u.1),
                (2 * c, u.0),
                (2 * c + 1, u.1),
            ];
            for &(k, gk) in &grad {
                g[k] += gk * r;
                for &(l, gl) in &grad {
                    h[(k, l)] += gk * gl;
                }
            }
        }
        let chol = h
            .cholesky()
            .ok_or_else(|| TrackError::Numerical("squaring normal equations are singular".into()))?;
        x -= chol.solve(&g);
    }

    let mut out = track.copy();
    for (k, o) in out.observations_mut().iter_mut().enumerate() {
        let k = if closed && k == m { 0 } else { k };
        o.position.set_x(x[2 * k]);
        o.position.set_y(x[2 * k + 1]);
    }
    Ok(out)
}
