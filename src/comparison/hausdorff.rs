use super::require_non_empty;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Distance from `p` to the segment `[a, b]` in the plane.
pub(crate) fn point_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (ux, uy) = (b.0 - a.0, b.1 - a.1);
    let len2 = ux * ux + uy * uy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * ux + (p.1 - a.1) * uy) / len2).clamp(0.0, 1.0)
    };
    (p.0 - (a.0 + t * ux)).hypot(p.1 - (a.1 + t * uy))
}

/// Distance from `p` to the line supporting `[a, b]`, or to `a` when the segment
/// is degenerate.
pub(crate) fn point_line_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (ux, uy) = (b.0 - a.0, b.1 - a.1);
    let len = ux.hypot(uy);
    if len == 0.0 {
        return (p.0 - a.0).hypot(p.1 - a.1);
    }
    ((p.0 - a.0) * uy - (p.1 - a.1) * ux).abs() / len
}

pub(crate) fn xy(track: &Track) -> Vec<(f64, f64)> {
    track
        .observations()
        .iter()
        .map(|o| (o.position.x(), o.position.y()))
        .collect()
}

/// `max_{a ∈ A} min_{s ∈ segments(B)} d(a, s)`, `d(a, s)` being the orthogonal
/// distance from `a` to the line carrying `s`.
///
/// A single-point `B` degenerates to point distances.
pub fn hausdorff_one_sided(a: &Track, b: &Track) -> Result<f64, TrackError> {
    require_non_empty(a, b)?;
    let pa = xy(a);
    let pb = xy(b);
    Ok(pa
        .iter()
        .map(|&p| {
            if pb.len() == 1 {
                return (p.0 - pb[0].0).hypot(p.1 - pb[0].1);
            }
            pb.windows(2)
                .map(|s| point_line_distance(p, s[0], s[1]))
                .fold(f64::INFINITY, f64::min)
        })
        .fold(0.0, f64::max))
}

/// Symmetric Hausdorff distance `max(H(A, B), H(B, A))`.
pub fn hausdorff(a: &Track, b: &Track) -> Result<f64, TrackError> {
    Ok(hausdorff_one_sided(a, b)?.max(hausdorff_one_sided(b, a)?))
}

#[cfg(test)]
mod hausdorff_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_diamonds() {
        let a = Track::from_xy(&[(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)]);
        let b = Track::from_xy(&[(2.0, 0.0), (0.0, 2.0), (-2.0, 0.0), (0.0, -4.0)]);
        assert_abs_diff_eq!(hausdorff_one_sided(&a, &b).unwrap(), 3.0 / 5f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(hausdorff_one_sided(&b, &a).unwrap(), 3.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(hausdorff(&a, &b).unwrap(), 2.12132, epsilon = 1e-3);
        assert_eq!(hausdorff(&a, &b).unwrap(), hausdorff(&b, &a).unwrap());
    }

    #[test]
    fn test_point_line() {
        // foot of the perpendicular outside the segment
        assert_abs_diff_eq!(point_line_distance((0.0, -4.0), (-1.0, 0.0), (0.0, -1.0)), 3.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(point_line_distance((3.0, 1.0), (-1.0, 0.0), (1.0, 0.0)), 1.0);
        assert_abs_diff_eq!(point_line_distance((0.0, 2.0), (0.0, 0.0), (0.0, 0.0)), 2.0);
    }

    #[test]
    fn test_point_segment() {
        assert_abs_diff_eq!(point_segment_distance((0.0, 1.0), (-1.0, 0.0), (1.0, 0.0)), 1.0);
        assert_abs_diff_eq!(point_segment_distance((3.0, 0.0), (-1.0, 0.0), (1.0, 0.0)), 2.0);
        assert_abs_diff_eq!(point_segment_distance((0.0, 2.0), (0.0, 0.0), (0.0, 0.0)), 2.0);
    }
}
