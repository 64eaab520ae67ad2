use serde::{Deserialize, Serialize};

use super::require_non_empty;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Reduction of the per-index distances `d_i = ‖A_i - B_i‖`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointwiseNorm {
    /// Mean of `d_i`
    L1,
    /// Root mean square of `d_i`
    L2,
    /// Maximum of `d_i`
    Linf,
}

/// Distance between two tracks of equal length, index by index.
///
/// Return
/// ----------
/// * [`TrackError::Structural`] if the lengths differ.
pub fn pointwise(a: &Track, b: &Track, norm: PointwiseNorm) -> Result<f64, TrackError> {
    require_non_empty(a, b)?;
    if a.size() != b.size() {
        return Err(TrackError::Structural(format!(
            "pointwise comparison needs equal lengths ({} vs {})",
            a.size(),
            b.size()
        )));
    }
    let d = a
        .observations()
        .iter()
        .zip(b.observations())
        .map(|(p, q)| p.distance_2d(q));
    let n = a.size() as f64;
    Ok(match norm {
        PointwiseNorm::L1 => d.sum::<f64>() / n,
        PointwiseNorm::L2 => (d.map(|v| v * v).sum::<f64>() / n).sqrt(),
        PointwiseNorm::Linf => d.fold(0.0, f64::max),
    })
}

#[cfg(test)]
mod pointwise_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_norms() {
        let a = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let b = Track::from_xy(&[(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (3.0, 5.0)]);
        assert_abs_diff_eq!(pointwise(&a, &b, PointwiseNorm::L1).unwrap(), 2.0);
        assert_abs_diff_eq!(pointwise(&a, &b, PointwiseNorm::L2).unwrap(), 7f64.sqrt());
        assert_abs_diff_eq!(pointwise(&a, &b, PointwiseNorm::Linf).unwrap(), 5.0);
    }

    #[test]
    fn test_length_mismatch() {
        let a = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0)]);
        let b = Track::from_xy(&[(0.0, 0.0)]);
        assert!(pointwise(&a, &b, PointwiseNorm::L1).is_err());
    }
}
