//! # Dynamic time warping
//!
//! With local cost `D[i, j] = ‖A_i - B_j‖^p` the accumulated cost is
//!
//! ```text
//! T[0, 0] = D[0, 0]
//! T[i, j] = D[i, j] + min(T[i-1, j], T[i, j-1], T[i-1, j-1])
//! ```
//!
//! and the score is `T[end]^(1/p)`. With `p = ∞` the sum becomes a maximum
//! (bottleneck matching) and `D` is the plain distance.
//!
//! The matching always starts at `(0, 0)`. With `ends = true` it must finish at
//! `(N-1, M-1)`; otherwise it finishes at `argmin_j T[N-1, j]` (free end).
//!
//! Fast-DTW restricts the search to a band `|j - i·(M-1)/(N-1)| ≤ w` around the
//! diagonal; with `w ≥ max(N, M)` it returns exactly the DTW score.
//!
//! Time and memory are `O(N·M)` (`O(N·w)` cells evaluated with a band).
use crate::constants::FAST_DTW_BAND;
use crate::control::Monitor;
use crate::observation::Observation;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

use super::{require_non_empty, MatchingProfile};

/// Largest finite Minkowski exponent accepted.
const MAX_EXPONENT: f64 = 15.0;

/// DTW configuration.
///
/// ```rust
/// use tracklib::comparison::DtwParams;
///
/// let params = DtwParams::builder().p(1.0).ends(true).band(20).build().unwrap();
/// assert_eq!(params.band, Some(20));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DtwParams {
    /// Minkowski exponent in `(0, 15]` or `f64::INFINITY`.
    pub p: f64,
    /// Force the matching to end on both last points.
    pub ends: bool,
    /// Half-width of the search band, `None` for the full grid.
    pub band: Option<usize>,
}

impl Default for DtwParams {
    fn default() -> Self {
        DtwParams {
            p: 2.0,
            ends: false,
            band: None,
        }
    }
}

impl DtwParams {
    pub fn builder() -> DtwParamsBuilder {
        DtwParamsBuilder::default()
    }

    /// Default parameters restricted to the fast-DTW band.
    pub fn fast() -> Self {
        DtwParams {
            band: Some(FAST_DTW_BAND),
            ..DtwParams::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DtwParamsBuilder {
    params: DtwParams,
}

impl DtwParamsBuilder {
    pub fn p(mut self, v: f64) -> Self {
        self.params.p = v;
        self
    }

    pub fn ends(mut self, v: bool) -> Self {
        self.params.ends = v;
        self
    }

    pub fn band(mut self, w: usize) -> Self {
        self.params.band = Some(w);
        self
    }

    pub fn build(self) -> Result<DtwParams, TrackError> {
        let p = self.params.p;
        let valid = p == f64::INFINITY || (p > 0.0 && p <= MAX_EXPONENT);
        if !valid {
            return Err(TrackError::wrong(format!(
                "DTW exponent must be in (0, {MAX_EXPONENT}] or infinite, got {p}"
            )));
        }
        Ok(self.params)
    }
}

/// Accumulated-cost grid and its matching.
struct Grid {
    n: usize,
    m: usize,
    cost: Vec<f64>,
}

impl Grid {
    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.cost[i * self.m + j]
    }
}

/// Core dynamic program shared by DTW, fast-DTW, central tracks and fusion.
///
/// Arguments
/// -----------------
/// * `a`, `b`: the tracks.
/// * `local`: distance between two observations (before the exponent).
/// * `params`: exponent, end constraint and band.
/// * `monitor`: ticked once per row of the grid.
///
/// Return
/// ----------
/// * `(score, pairs)` where `pairs[i]` lists the indices of `b` matched to `a[i]`.
pub(crate) fn dtw_core<F>(
    a: &Track,
    b: &Track,
    local: F,
    params: &DtwParams,
    monitor: &mut Monitor,
) -> Result<(f64, Vec<Vec<usize>>), TrackError>
where
    F: Fn(&Observation, &Observation) -> f64,
{
    require_non_empty(a, b)?;
    let (n, m) = (a.size(), b.size());
    let p = params.p;
    let bottleneck = p.is_infinite();

    let in_band = |i: usize, j: usize| -> bool {
        match params.band {
            None => true,
            Some(w) => {
                let center = if n > 1 {
                    i as f64 * (m - 1) as f64 / (n - 1) as f64
                } else {
                    0.0
                };
                (j as f64 - center).abs() <= w as f64
            }
        }
    };

    let oa = a.observations();
    let ob = b.observations();
    let mut grid = Grid {
        n,
        m,
        cost: vec![f64::INFINITY; n * m],
    };
    for i in 0..n {
        monitor.tick(i, n)?;
        for j in 0..m {
            if !in_band(i, j) {
                continue;
            }
            let d = local(&oa[i], &ob[j]);
            let d = if bottleneck { d } else { d.powf(p) };
            let best = if i == 0 && j == 0 {
                None
            } else {
                let mut best = f64::INFINITY;
                if i > 0 && j > 0 {
                    best = best.min(grid.at(i - 1, j - 1));
                }
                if i > 0 {
                    best = best.min(grid.at(i - 1, j));
                }
                if j > 0 {
                    best = best.min(grid.at(i, j - 1));
                }
                Some(best)
            };
            grid.cost[i * m + j] = match best {
                None => d,
                Some(best) if bottleneck => d.max(best),
                Some(best) => d + best,
            };
        }
    }

    let end_j = if params.ends {
        m - 1
    } else {
        (0..m)
            .filter(|&j| grid.at(n - 1, j).is_finite())
            .min_by(|&x, &y| grid.at(n - 1, x).total_cmp(&grid.at(n - 1, y)))
            .unwrap_or(m - 1)
    };
    let total = grid.at(n - 1, end_j);
    if !total.is_finite() {
        return Err(TrackError::wrong(
            "DTW band too narrow to connect the first and last points",
        ));
    }

    let pairs = backtrack(&grid, end_j);
    let score = if bottleneck || p == 1.0 {
        total
    } else {
        total.powf(1.0 / p)
    };
    Ok((score, pairs))
}

/// Walk back from `(n-1, end_j)` to `(0, 0)`, preferring the diagonal on ties.
fn backtrack(grid: &Grid, end_j: usize) -> Vec<Vec<usize>> {
    let mut pairs = vec![Vec::new(); grid.n];
    let (mut i, mut j) = (grid.n - 1, end_j);
    pairs[i].push(j);
    while i > 0 || j > 0 {
        let mut step = (usize::MAX, usize::MAX);
        let mut best = f64::INFINITY;
        let mut consider = |ci: usize, cj: usize| {
            let c = grid.at(ci, cj);
            if c < best {
                best = c;
                step = (ci, cj);
            }
        };
        if i > 0 && j > 0 {
            consider(i - 1, j - 1);
        }
        if i > 0 {
            consider(i - 1, j);
        }
        if j > 0 {
            consider(i, j - 1);
        }
        if step.0 == usize::MAX {
            break;
        }
        (i, j) = step;
        pairs[i].push(j);
    }
    pairs.iter_mut().for_each(|v| {
        v.sort_unstable();
        v.dedup();
    });
    pairs
}

fn euclidean(p: &Observation, q: &Observation) -> f64 {
    p.distance_2d(q)
}

/// DTW score between two tracks.
pub fn dtw(a: &Track, b: &Track, params: &DtwParams) -> Result<f64, TrackError> {
    dtw_core(a, b, euclidean, params, &mut Monitor::new()).map(|(s, _)| s)
}

/// DTW score and matching profile, with progress and cancellation.
pub fn dtw_matching(
    a: &Track,
    b: &Track,
    params: &DtwParams,
    monitor: &mut Monitor,
) -> Result<MatchingProfile, TrackError> {
    let (score, pairs) = dtw_core(a, b, euclidean, params, monitor)?;
    MatchingProfile::new(a, b, pairs, score)
}

/// DTW restricted to a band of half-width `w` around the diagonal.
pub fn fast_dtw(a: &Track, b: &Track, w: usize, p: f64) -> Result<f64, TrackError> {
    let params = DtwParams::builder().p(p).band(w).build()?;
    dtw(a, b, &params)
}

#[cfg(test)]
mod dtw_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pts(v: &[(f64, f64)]) -> Track {
        Track::from_xy(v)
    }

    #[test]
    fn test_identical_tracks_score_zero() {
        let a = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        assert_eq!(dtw(&a, &a, &DtwParams::default()).unwrap(), 0.0);
    }

    #[test]
    fn test_repeated_point_matches_twice() {
        let a = pts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let b = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let params = DtwParams::builder().ends(true).build().unwrap();
        let m = dtw_matching(&a, &b, &params, &mut Monitor::new()).unwrap();
        assert_eq!(m.score, 0.0);
        assert_eq!(m.pairs, vec![vec![0], vec![1, 2], vec![3]]);
        assert_eq!(m.profile.get_feature("pair").unwrap(), vec![0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_exponents() {
        let a = pts(&[(0.0, 0.0), (1.0, 0.0)]);
        let b = pts(&[(0.0, 3.0), (1.0, 4.0)]);
        let run = |p: f64| {
            let params = DtwParams::builder().p(p).ends(true).build().unwrap();
            dtw(&a, &b, &params).unwrap()
        };
        assert_abs_diff_eq!(run(1.0), 7.0);
        assert_abs_diff_eq!(run(2.0), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(run(f64::INFINITY), 4.0);
    }

    #[test]
    fn test_free_end() {
        let a = pts(&[(0.0, 0.0), (1.0, 0.0)]);
        let b = pts(&[(0.0, 0.0), (1.0, 0.0), (9.0, 0.0)]);
        let free = dtw(&a, &b, &DtwParams::default()).unwrap();
        assert_eq!(free, 0.0);
        let fixed = dtw(&a, &b, &DtwParams::builder().ends(true).build().unwrap()).unwrap();
        assert_abs_diff_eq!(fixed, 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_exponent() {
        assert!(DtwParams::builder().p(0.0).build().is_err());
        assert!(DtwParams::builder().p(16.0).build().is_err());
    }

    #[test]
    fn test_cancelled() {
        let a = pts(&[(0.0, 0.0), (1.0, 0.0)]);
        let token = crate::control::CancelToken::new();
        token.cancel();
        let mut monitor = Monitor::new().with_token(token);
        let err = dtw_matching(&a, &a, &DtwParams::default(), &mut monitor).unwrap_err();
        assert_eq!(err, TrackError::Cancelled);
    }
}
