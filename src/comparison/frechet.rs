//! # Fréchet distances
//!
//! * [`discrete_frechet`] – coupling distance over vertices,
//!   `c(i, j) = max(d(A_i, B_j), min(c(i-1, j), c(i, j-1), c(i-1, j-1)))`,
//!   filled row by row.
//! * [`frechet`] – continuous Fréchet distance between the polylines, by the
//!   Alt–Godau free-space decision procedure and bisection on `ε` between
//!   `max(d(A_0, B_0), d(A_N, B_M))` and the discrete distance.
use super::hausdorff::xy;
use super::require_non_empty;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Relative precision of the continuous distance.
const FRECHET_TOLERANCE: f64 = 1e-10;
const FRECHET_MAX_ITER: usize = 200;

/// Discrete Fréchet distance.
pub fn discrete_frechet(a: &Track, b: &Track) -> Result<f64, TrackError> {
    require_non_empty(a, b)?;
    let (oa, ob) = (a.observations(), b.observations());
    let m = ob.len();
    let mut prev = vec![0.0; m];
    let mut row = vec![0.0; m];
    for (i, p) in oa.iter().enumerate() {
        for j in 0..m {
            let d = p.distance_2d(&ob[j]);
            row[j] = match (i, j) {
                (0, 0) => d,
                (0, _) => d.max(row[j - 1]),
                (_, 0) => d.max(prev[0]),
                _ => d.max(prev[j].min(row[j - 1]).min(prev[j - 1])),
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    Ok(prev[m - 1])
}

/// Free interval `[lo, hi] ⊂ [0, 1]` of the segment `a → b` within `eps` of `c`.
fn free_interval(a: (f64, f64), b: (f64, f64), c: (f64, f64), eps: f64) -> Option<(f64, f64)> {
    let (ux, uy) = (b.0 - a.0, b.1 - a.1);
    let (wx, wy) = (a.0 - c.0, a.1 - c.1);
    let qa = ux * ux + uy * uy;
    let qb = 2.0 * (ux * wx + uy * wy);
    let qc = wx * wx + wy * wy - eps * eps;
    if qa == 0.0 {
        return (qc <= 0.0).then_some((0.0, 1.0));
    }
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let lo = ((-qb - root) / (2.0 * qa)).max(0.0);
    let hi = ((-qb + root) / (2.0 * qa)).min(1.0);
    (lo <= hi).then_some((lo, hi))
}

/// Whether the continuous Fréchet distance is at most `eps`.
fn decide(pa: &[(f64, f64)], pb: &[(f64, f64)], eps: f64) -> bool {
    let dist = |p: (f64, f64), q: (f64, f64)| (p.0 - q.0).hypot(p.1 - q.1);
    let (n, m) = (pa.len(), pb.len());
    if dist(pa[0], pb[0]) > eps || dist(pa[n - 1], pb[m - 1]) > eps {
        return false;
    }
    // degenerate curves: every vertex of the other curve must be close
    if n == 1 {
        return pb.iter().all(|&q| dist(pa[0], q) <= eps);
    }
    if m == 1 {
        return pa.iter().all(|&p| dist(p, pb[0]) <= eps);
    }

    // left[i][j]: reachable part of the edge {P_i} × [Q_j, Q_j+1]
    // bottom[i][j]: reachable part of the edge [P_i, P_i+1] × {Q_j}
    let mut left: Vec<Vec<Option<(f64, f64)>>> = vec![vec![None; m - 1]; n];
    let mut bottom: Vec<Vec<Option<(f64, f64)>>> = vec![vec![None; m]; n - 1];

    for j in 0..m - 1 {
        let free = free_interval(pb[j], pb[j + 1], pa[0], eps);
        let reachable_below = j == 0 || left[0][j - 1].is_some_and(|(_, hi)| hi >= 1.0);
        left[0][j] = free.filter(|&(lo, _)| reachable_below && lo <= 0.0);
    }
    for i in 0..n - 1 {
        let free = free_interval(pa[i], pa[i + 1], pb[0], eps);
        let reachable_left = i == 0 || bottom[i - 1][0].is_some_and(|(_, hi)| hi >= 1.0);
        bottom[i][0] = free.filter(|&(lo, _)| reachable_left && lo <= 0.0);
    }

    for i in 0..n - 1 {
        for j in 0..m - 1 {
            let l = left[i][j];
            let bo = bottom[i][j];

            let right_free = free_interval(pb[j], pb[j + 1], pa[i + 1], eps);
            left[i + 1][j] = match (bo, l) {
                (Some(_), _) => right_free,
                (None, Some((lo, _))) => right_free
                    .map(|(a, b)| (a.max(lo), b))
                    .filter(|(a, b)| a <= b),
                (None, None) => None,
            };

            let top_free = free_interval(pa[i], pa[i + 1], pb[j + 1], eps);
            bottom[i][j + 1] = match (l, bo) {
                (Some(_), _) => top_free,
                (None, Some((lo, _))) => top_free
                    .map(|(a, b)| (a.max(lo), b))
                    .filter(|(a, b)| a <= b),
                (None, None) => None,
            };
        }
    }

    left[n - 1][m - 2].is_some_and(|(_, hi)| hi >= 1.0)
        || bottom[n - 2][m - 1].is_some_and(|(_, hi)| hi >= 1.0)
}

/// Continuous Fréchet distance between two planar polylines.
pub fn frechet(a: &Track, b: &Track) -> Result<f64, TrackError> {
    require_non_empty(a, b)?;
    let (pa, pb) = (xy(a), xy(b));
    let dist = |p: (f64, f64), q: (f64, f64)| (p.0 - q.0).hypot(p.1 - q.1);

    let mut lo = dist(pa[0], pb[0]).max(dist(pa[pa.len() - 1], pb[pb.len() - 1]));
    let mut hi = discrete_frechet(a, b)?.max(lo);
    if decide(&pa, &pb, lo) {
        return Ok(lo);
    }
    for _ in 0..FRECHET_MAX_ITER {
        if hi - lo <= FRECHET_TOLERANCE * hi.max(1.0) {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if decide(&pa, &pb, mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}

#[cfg(test)]
mod frechet_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_discrete_parallel_lines() {
        let a = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let b = Track::from_xy(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0)]);
        assert_abs_diff_eq!(discrete_frechet(&a, &b).unwrap(), 1.0);
        assert_abs_diff_eq!(frechet(&a, &b).unwrap(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_continuous_below_discrete() {
        // same straight line, different vertices
        let a = Track::from_xy(&[(0.0, 0.0), (4.0, 0.0)]);
        let b = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        assert_abs_diff_eq!(frechet(&a, &b).unwrap(), 0.0, epsilon = 1e-8);
        assert!(discrete_frechet(&a, &b).unwrap() >= 1.0);
    }

    #[test]
    fn test_backtracking_detour() {
        // b goes forward, back, forward: the leash must cover half the detour
        let a = Track::from_xy(&[(0.0, 0.0), (10.0, 0.0)]);
        let b = Track::from_xy(&[(0.0, 0.0), (6.0, 0.0), (4.0, 0.0), (10.0, 0.0)]);
        assert_abs_diff_eq!(frechet(&a, &b).unwrap(), 1.0, epsilon = 1e-7);
    }
}
