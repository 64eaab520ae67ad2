use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use crate::comparison::hausdorff::xy;
use crate::track::Track;

fn triangle_area(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    0.5 * ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs()
}

/// Indices kept by Visvalingam–Whyatt with area threshold `eps²`.
///
/// Interior points are removed smallest effective area first; after each
/// removal the two neighbours get their area recomputed. Stale heap entries
/// are skipped by comparing against the current area.
pub fn visvalingam(track: &Track, eps: f64) -> Vec<usize> {
    let n = track.size();
    if n <= 2 {
        return (0..n).collect();
    }
    let pts = xy(track);
    let threshold = eps * eps;

    let mut prev: Vec<usize> = (0..n).map(|i| i.saturating_sub(1)).collect();
    let mut next: Vec<usize> = (0..n).map(|i| (i + 1).min(n - 1)).collect();
    let mut alive = vec![true; n];
    let mut area = vec![f64::INFINITY; n];
    let mut heap = BinaryHeap::new();

    for i in 1..n - 1 {
        area[i] = triangle_area(pts[i - 1], pts[i], pts[i + 1]);
        heap.push(Reverse((OrderedFloat(area[i]), i)));
    }

    while let Some(Reverse((OrderedFloat(a), i))) = heap.pop() {
        if !alive[i] || a != area[i] {
            continue;
        }
        if a >= threshold {
            break;
        }
        alive[i] = false;
        let (p, q) = (prev[i], next[i]);
        next[p] = q;
        prev[q] = p;
        for k in [p, q] {
            if k == 0 || k == n - 1 {
                continue;
            }
            area[k] = triangle_area(pts[prev[k]], pts[k], pts[next[k]]);
            heap.push(Reverse((OrderedFloat(area[k]), k)));
        }
    }
    (0..n).filter(|&i| alive[i]).collect()
}

#[cfg(test)]
mod visvalingam_test {
    use super::*;

    #[test]
    fn test_removes_flat_points() {
        let t = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.01), (3.0, 0.0), (3.0, 3.0)]);
        assert_eq!(visvalingam(&t, 0.5), vec![0, 3, 4]);
    }

    #[test]
    fn test_zero_threshold_keeps_everything() {
        let t = Track::from_xy(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        assert_eq!(visvalingam(&t, 0.0), vec![0, 1, 2]);
    }
}
