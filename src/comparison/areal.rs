//! # Areal distance
//!
//! Area enclosed between two polylines, read as the polygon `A ++ reverse(B)`.
//! When the curves cross, the polygon self-intersects and a plain shoelace sum
//! cancels lobes of opposite orientation; the polygon is therefore cut at every
//! crossing and the absolute areas of the pieces are summed.
use itertools::Itertools;

use super::hausdorff::xy;
use super::require_non_empty;
use crate::shapes::shoelace;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Two crossings closer than this (in segment parameter) are the same.
const CROSSING_DEDUP: f64 = 1e-12;

/// Point at curvilinear parameter `s` (segment index + fraction).
fn point_at(pts: &[(f64, f64)], s: f64) -> (f64, f64) {
    if pts.len() == 1 {
        return pts[0];
    }
    let k = (s.floor() as usize).min(pts.len() - 2);
    let t = s - k as f64;
    let (a, b) = (pts[k], pts[k + 1]);
    (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
}

/// Sub-polyline between parameters `s0 <= s1`.
fn sub_path(pts: &[(f64, f64)], s0: f64, s1: f64) -> Vec<(f64, f64)> {
    let mut path = vec![point_at(pts, s0)];
    path.extend(
        pts.iter()
            .enumerate()
            .filter(|&(k, _)| (k as f64) > s0 && (k as f64) < s1)
            .map(|(_, &p)| p),
    );
    path.push(point_at(pts, s1));
    path
}

fn cross(u: (f64, f64), v: (f64, f64)) -> f64 {
    u.0 * v.1 - u.1 * v.0
}

/// Parameters `(s_a, s_b)` of every proper crossing between the two polylines.
fn crossings(pa: &[(f64, f64)], pb: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut found = Vec::new();
    for (i, sa) in pa.windows(2).enumerate() {
        let r = (sa[1].0 - sa[0].0, sa[1].1 - sa[0].1);
        for (j, sb) in pb.windows(2).enumerate() {
            let s = (sb[1].0 - sb[0].0, sb[1].1 - sb[0].1);
            let denom = cross(r, s);
            if denom.abs() < f64::EPSILON * (r.0.hypot(r.1) * s.0.hypot(s.1)).max(f64::MIN_POSITIVE) {
                // parallel or degenerate
                continue;
            }
            let qp = (sb[0].0 - sa[0].0, sb[0].1 - sa[0].1);
            let t = cross(qp, s) / denom;
            let u = cross(qp, r) / denom;
            if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
                found.push((i as f64 + t, j as f64 + u));
            }
        }
    }
    found
        .into_iter()
        .sorted_by(|x, y| x.0.total_cmp(&y.0).then(x.1.total_cmp(&y.1)))
        .dedup_by(|x, y| (x.0 - y.0).abs() < CROSSING_DEDUP && (x.1 - y.1).abs() < CROSSING_DEDUP)
        .collect()
}

/// Area between two tracks.
///
/// Arguments
/// -----------------
/// * `a`, `b`: planar tracks, not necessarily of equal length.
///
/// Return
/// ----------
/// * The non-negative area between the curves, `0` for identical tracks.
///
/// If the crossings do not appear in the same order along both tracks the
/// pieces are ill-defined and the absolute area of the whole ring is returned.
pub fn areal(a: &Track, b: &Track) -> Result<f64, TrackError> {
    require_non_empty(a, b)?;
    let (pa, pb) = (xy(a), xy(b));
    if pa == pb {
        return Ok(0.0);
    }
    let (end_a, end_b) = ((pa.len() - 1) as f64, (pb.len() - 1) as f64);

    let inner = crossings(&pa, &pb);
    let ordered = inner.iter().tuple_windows().all(|(x, y)| y.1 >= x.1);
    if !ordered {
        let ring = pa.iter().chain(pb.iter().rev()).copied().collect_vec();
        return Ok(shoelace(&ring).abs());
    }

    let mut cuts = Vec::with_capacity(inner.len() + 2);
    cuts.push((0.0, 0.0));
    cuts.extend(inner);
    cuts.push((end_a, end_b));

    Ok(cuts
        .iter()
        .tuple_windows()
        .map(|(&(a0, b0), &(a1, b1))| {
            let mut ring = sub_path(&pa, a0, a1);
            let lower = sub_path(&pb, b0, b1);
            if ring == lower {
                // shared stretch
                return 0.0;
            }
            ring.extend(lower.into_iter().rev());
            shoelace(&ring).abs()
        })
        .sum())
}

#[cfg(test)]
mod areal_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parallel_strip() {
        let a = Track::from_xy(&[(0.0, 0.0), (4.0, 0.0)]);
        let b = Track::from_xy(&[(0.0, 1.0), (2.0, 1.0), (4.0, 1.0)]);
        assert_abs_diff_eq!(areal(&a, &b).unwrap(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(areal(&b, &a).unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_crossing_lobes_do_not_cancel() {
        let a = Track::from_xy(&[(0.0, 0.0), (4.0, 0.0)]);
        let b = Track::from_xy(&[(0.0, 1.0), (4.0, -1.0)]);
        assert_abs_diff_eq!(areal(&a, &b).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_identical_is_zero() {
        let a = Track::from_xy(&[(0.0, 0.0), (1.0, 2.0), (3.0, 1.0), (4.0, 5.0)]);
        assert_eq!(areal(&a, &a).unwrap(), 0.0);
        let zigzag = Track::from_xy(&[(0.3, -1.7), (2.9, 0.4), (-0.6, 1.1), (1.4, -2.2), (0.1, 3.3)]);
        assert_eq!(areal(&zigzag, &zigzag).unwrap(), 0.0);
    }

    #[test]
    fn test_shared_stretch_adds_nothing() {
        let a = Track::from_xy(&[(0.0, 0.0), (2.0, 0.0), (4.0, 0.0)]);
        let b = Track::from_xy(&[(0.0, 0.0), (2.0, 0.0), (4.0, 1.0)]);
        assert_abs_diff_eq!(areal(&a, &b).unwrap(), 1.0, epsilon = 1e-12);
    }
}
