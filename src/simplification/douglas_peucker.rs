use crate::comparison::hausdorff::{point_segment_distance, xy};
use crate::track::Track;

/// Indices kept by Douglas–Peucker with threshold `eps`.
///
/// A range is split at its farthest point from the chord when that distance
/// reaches `eps`; the recursion runs on an explicit stack so long tracks do
/// not exhaust the call stack. The result is sorted and always contains both
/// endpoints.
pub fn douglas_peucker(track: &Track, eps: f64) -> Vec<usize> {
    let n = track.size();
    if n <= 2 {
        return (0..n).collect();
    }
    let pts = xy(track);
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0, n - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let (imax, dmax) = (first + 1..last)
            .map(|k| (k, point_segment_distance(pts[k], pts[first], pts[last])))
            .fold((first, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        if dmax >= eps {
            keep[imax] = true;
            stack.push((first, imax));
            stack.push((imax, last));
        }
    }
    (0..n).filter(|&i| keep[i]).collect()
}

#[cfg(test)]
mod douglas_peucker_test {
    use super::*;

    fn zigzag() -> Track {
        Track::from_xy(&[
            (0.0, 0.0),
            (1.0, 0.1),
            (2.0, -0.1),
            (3.0, 5.0),
            (4.0, 6.0),
            (5.0, 7.0),
            (6.0, 8.1),
            (7.0, 9.0),
        ])
    }

    #[test]
    fn test_keeps_corner() {
        let kept = douglas_peucker(&zigzag(), 1.0);
        assert_eq!(kept.first(), Some(&0));
        assert_eq!(kept.last(), Some(&7));
        assert!(kept.contains(&2));
        assert!(!kept.contains(&1));
    }

    #[test]
    fn test_monotone_in_threshold() {
        let t = zigzag();
        let mut previous = usize::MAX;
        for eps in [0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 50.0] {
            let k = douglas_peucker(&t, eps).len();
            assert!(k <= previous);
            previous = k;
        }
        assert_eq!(douglas_peucker(&t, 50.0), vec![0, 7]);
    }
}
