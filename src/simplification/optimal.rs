//! # Optimal segmentation
//!
//! Chooses the subsequence `0 = s_0 < s_1 < … < s_K = N-1` minimizing
//!
//! ```text
//! Σ_k cost(s_{k-1}, s_k) + offset · K
//! ```
//!
//! by dynamic programming over the last kept index, in `O(N²)` cost evaluations.
//! The cost of a segment is pluggable through [`SegmentCost`]; any
//! `Fn(&Track, usize, usize) -> f64` closure is a cost.
use crate::comparison::hausdorff::{point_segment_distance, xy};
use crate::control::Monitor;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Cost of replacing the observations `i..=j` by the chord `[i, j]`.
pub trait SegmentCost {
    fn cost(&self, track: &Track, i: usize, j: usize) -> f64;
}

impl<F> SegmentCost for F
where
    F: Fn(&Track, usize, usize) -> f64,
{
    fn cost(&self, track: &Track, i: usize, j: usize) -> f64 {
        self(track, i, j)
    }
}

fn max_deviation(track: &Track, i: usize, j: usize) -> f64 {
    let pts = xy(track);
    (i + 1..j)
        .map(|k| point_segment_distance(pts[k], pts[i], pts[j]))
        .fold(0.0, f64::max)
}

/// Largest distance of an intermediate point to the chord.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxDeviation;

impl SegmentCost for MaxDeviation {
    fn cost(&self, track: &Track, i: usize, j: usize) -> f64 {
        max_deviation(track, i, j)
    }
}

/// Aspect ratio (width / length) of the bounding rectangle of `i..=j` aligned
/// with the chord.
#[derive(Debug, Clone, Copy, Default)]
pub struct MbrAspect;

impl SegmentCost for MbrAspect {
    fn cost(&self, track: &Track, i: usize, j: usize) -> f64 {
        let pts = xy(track);
        let (a, b) = (pts[i], pts[j]);
        let len = (b.0 - a.0).hypot(b.1 - a.1);
        if len == 0.0 {
            return if j > i + 1 { f64::INFINITY } else { 0.0 };
        }
        let (ux, uy) = ((b.0 - a.0) / len, (b.1 - a.1) / len);
        let (mut along_min, mut along_max) = (0.0_f64, len);
        let (mut across_min, mut across_max) = (0.0_f64, 0.0_f64);
        for &(px, py) in &pts[i..=j] {
            let (dx, dy) = (px - a.0, py - a.1);
            let along = dx * ux + dy * uy;
            let across = -dx * uy + dy * ux;
            along_min = along_min.min(along);
            along_max = along_max.max(along);
            across_min = across_min.min(across);
            across_max = across_max.max(across);
        }
        (across_max - across_min) / (along_max - along_min)
    }
}

/// Zero when every intermediate point lies within `threshold` of the chord,
/// infinite otherwise. With `offset = 1` this yields the fewest points
/// satisfying the tolerance.
#[derive(Debug, Clone, Copy)]
pub struct StrictDeviation {
    pub threshold: f64,
}

impl SegmentCost for StrictDeviation {
    fn cost(&self, track: &Track, i: usize, j: usize) -> f64 {
        if max_deviation(track, i, j) <= self.threshold {
            0.0
        } else {
            f64::INFINITY
        }
    }
}

/// Indices of the optimal segmentation.
///
/// Arguments
/// -----------------
/// * `track`: the polyline.
/// * `cost`: segment cost.
/// * `offset`: penalty per segment.
/// * `monitor`: ticked once per candidate end point.
///
/// Return
/// ----------
/// * The kept indices, sorted, with both endpoints.
pub fn optimal_segmentation<C: SegmentCost>(
    track: &Track,
    cost: &C,
    offset: f64,
    monitor: &mut Monitor,
) -> Result<Vec<usize>, TrackError> {
    let n = track.size();
    if n <= 2 {
        return Ok((0..n).collect());
    }
    let mut best = vec![f64::INFINITY; n];
    let mut from = vec![0_usize; n];
    best[0] = 0.0;
    for j in 1..n {
        monitor.tick(j, n)?;
        for i in 0..j {
            if !best[i].is_finite() {
                continue;
            }
            let c = best[i] + cost.cost(track, i, j) + offset;
            if c < best[j] {
                best[j] = c;
                from[j] = i;
            }
        }
    }
    if !best[n - 1].is_finite() {
        return Err(TrackError::Numerical(
            "no finite-cost segmentation of the track".into(),
        ));
    }
    let mut kept = vec![n - 1];
    let mut j = n - 1;
    while j > 0 {
        j = from[j];
        kept.push(j);
    }
    kept.reverse();
    Ok(kept)
}
