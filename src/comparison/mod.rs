//! # Track comparison
//!
//! Distances between two tracks and point matchings between them.
//!
//! | Measure | Function | Needs equal lengths |
//! |---------|----------|---------------------|
//! | pointwise L1 / L2 / L∞ | [`pointwise::pointwise`] | yes |
//! | Hausdorff | [`hausdorff::hausdorff`] | no |
//! | DTW, fast-DTW | [`dtw::dtw`], [`dtw::fast_dtw`] | no |
//! | discrete / continuous Fréchet | [`frechet::discrete_frechet`], [`frechet::frechet`] | no |
//! | areal | [`areal::areal`] | no |
//!
//! Matching algorithms return a [`MatchingProfile`]: a copy of the first track
//! carrying, for each index `i`, the indices of its counterparts in the second
//! track and the residual to the nearest one (features `pair`, `diff`, `ex`, `ey`).
//!
//! Point distances use [`Coord::distance_2d`](crate::coords::Coord::distance_2d).
//! Segment-based measures (Hausdorff, continuous Fréchet, areal) work on the first
//! two raw components and expect planar (ENU) tracks.
use crate::track::Track;
use crate::tracklib_errors::TrackError;

pub mod areal;
pub mod central;
pub mod dtw;
pub mod frechet;
pub mod hausdorff;
pub mod pointwise;

pub use areal::areal;
pub use central::{central_track, fusion, FusionResult};
pub use dtw::{dtw, dtw_matching, fast_dtw, DtwParams, DtwParamsBuilder};
pub use frechet::{discrete_frechet, frechet};
pub use hausdorff::{hausdorff, hausdorff_one_sided};
pub use pointwise::{pointwise, PointwiseNorm};

/// Feature names written on a matching profile.
pub const PAIR: &str = "pair";
pub const DIFF: &str = "diff";
pub const EX: &str = "ex";
pub const EY: &str = "ey";

/// Result of matching a track `A` against a track `B`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingProfile {
    /// Copy of `A` with the features `pair`, `diff`, `ex`, `ey`.
    pub profile: Track,
    /// For each index of `A`, the matched indices of `B` in increasing order.
    pub pairs: Vec<Vec<usize>>,
    /// Score of the matching algorithm.
    pub score: f64,
}

impl MatchingProfile {
    /// Build the profile of `a` from the per-index matches into `b`.
    pub(crate) fn new(a: &Track, b: &Track, pairs: Vec<Vec<usize>>, score: f64) -> Result<Self, TrackError> {
        let mut profile = a.copy();
        let n = a.size();
        let mut pair = Vec::with_capacity(n);
        let mut diff = Vec::with_capacity(n);
        let mut ex = Vec::with_capacity(n);
        let mut ey = Vec::with_capacity(n);
        for (i, matched) in pairs.iter().enumerate() {
            let pa = &a.observations()[i];
            let nearest = matched.iter().copied().min_by(|&x, &y| {
                let dx = pa.distance_2d(&b.observations()[x]);
                let dy = pa.distance_2d(&b.observations()[y]);
                dx.total_cmp(&dy)
            });
            match nearest {
                Some(j) => {
                    let pb = &b.observations()[j];
                    pair.push(j as f64);
                    diff.push(pa.distance_2d(pb));
                    ex.push(pb.position.x() - pa.position.x());
                    ey.push(pb.position.y() - pa.position.y());
                }
                None => {
                    pair.push(f64::NAN);
                    diff.push(f64::NAN);
                    ex.push(f64::NAN);
                    ey.push(f64::NAN);
                }
            }
        }
        profile.set_feature(PAIR, pair)?;
        profile.set_feature(DIFF, diff)?;
        profile.set_feature(EX, ex)?;
        profile.set_feature(EY, ey)?;
        Ok(MatchingProfile {
            profile,
            pairs,
            score,
        })
    }
}

pub(crate) fn require_non_empty(a: &Track, b: &Track) -> Result<(), TrackError> {
    if a.is_empty() || b.is_empty() {
        return Err(TrackError::wrong("cannot compare an empty track"));
    }
    Ok(())
}
