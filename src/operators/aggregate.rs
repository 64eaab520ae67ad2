//! Reductions of one or two feature vectors to a scalar.
//!
//! No-data values (`NaN`) are skipped by every single-vector reduction; a
//! reduction of an empty (or all no-data) vector is itself no-data. Two-vector
//! reductions skip index pairs where either side is no-data.
use std::str::FromStr;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use super::binary::check_same_len;
use super::unary::valid;
use crate::constants::NAN;
use crate::tracklib_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Sum,
    Mean,
    /// Population variance
    Variance,
    StdDev,
    Median,
    /// Median absolute deviation from the median
    Mad,
    /// `sqrt(mean(x²))`
    Rmse,
    ArgMin,
    ArgMax,
    Min,
    Max,
    /// Number of exact zeros
    Zeros,
    Count,
    /// Number of differing positions
    L0Diff,
    L1Diff,
    L2Diff,
    LinfDiff,
    Covariance,
    Correlation,
}

impl AggregateOp {
    /// Whether the reduction consumes two vectors.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            AggregateOp::L0Diff
                | AggregateOp::L1Diff
                | AggregateOp::L2Diff
                | AggregateOp::LinfDiff
                | AggregateOp::Covariance
                | AggregateOp::Correlation
        )
    }

    /// Reduce `x`, or the pair `(x, y)` for binary reductions.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::WrongArgument`] if the arity of the call does not match the operator.
    /// * [`TrackError::Structural`] if `x` and `y` differ in length.
    pub fn apply(&self, x: &[f64], y: Option<&[f64]>) -> Result<f64, TrackError> {
        match (self.is_binary(), y) {
            (false, None) => Ok(self.reduce(x)),
            (true, Some(y)) => {
                check_same_len(x, y)?;
                Ok(self.reduce_pair(x, y))
            }
            (true, None) => Err(TrackError::wrong(format!("{self:?} needs two operands"))),
            (false, Some(_)) => Err(TrackError::wrong(format!("{self:?} takes one operand"))),
        }
    }

    fn reduce(&self, x: &[f64]) -> f64 {
        let n = valid(x).count();
        if n == 0 && !matches!(self, AggregateOp::Zeros | AggregateOp::Count) {
            return NAN;
        }
        match self {
            AggregateOp::Sum => valid(x).sum(),
            AggregateOp::Mean => mean(x),
            AggregateOp::Variance => variance(x),
            AggregateOp::StdDev => variance(x).sqrt(),
            AggregateOp::Median => median(valid(x).collect()),
            AggregateOp::Mad => {
                let m = median(valid(x).collect());
                median(valid(x).map(|v| (v - m).abs()).collect())
            }
            AggregateOp::Rmse => (valid(x).map(|v| v * v).sum::<f64>() / n as f64).sqrt(),
            AggregateOp::ArgMin => x
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_nan())
                .min_by_key(|(_, &v)| OrderedFloat(v))
                .map_or(NAN, |(i, _)| i as f64),
            AggregateOp::ArgMax => x
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_nan())
                .max_by_key(|(i, &v)| (OrderedFloat(v), std::cmp::Reverse(*i)))
                .map_or(NAN, |(i, _)| i as f64),
            AggregateOp::Min => valid(x).fold(f64::INFINITY, f64::min),
            AggregateOp::Max => valid(x).fold(f64::NEG_INFINITY, f64::max),
            AggregateOp::Zeros => valid(x).filter(|&v| v == 0.0).count() as f64,
            AggregateOp::Count => n as f64,
            _ => NAN,
        }
    }

    fn reduce_pair(&self, x: &[f64], y: &[f64]) -> f64 {
        let pairs: Vec<(f64, f64)> = x
            .iter()
            .zip(y)
            .map(|(&a, &b)| (a, b))
            .filter(|(a, b)| !a.is_nan() && !b.is_nan())
            .collect();
        if pairs.is_empty() {
            return NAN;
        }
        let n = pairs.len() as f64;
        match self {
            AggregateOp::L0Diff => pairs.iter().filter(|(a, b)| a != b).count() as f64,
            AggregateOp::L1Diff => pairs.iter().map(|(a, b)| (a - b).abs()).sum(),
            AggregateOp::L2Diff => pairs.iter().map(|(a, b)| (a - b).powi(2)).sum::<f64>().sqrt(),
            AggregateOp::LinfDiff => pairs.iter().map(|(a, b)| (a - b).abs()).fold(0.0, f64::max),
            AggregateOp::Covariance | AggregateOp::Correlation => {
                let (ma, mb) = pairs
                    .iter()
                    .fold((0.0, 0.0), |(sa, sb), (a, b)| (sa + a, sb + b));
                let (ma, mb) = (ma / n, mb / n);
                let cov = pairs.iter().map(|(a, b)| (a - ma) * (b - mb)).sum::<f64>() / n;
                if *self == AggregateOp::Covariance {
                    return cov;
                }
                let va = pairs.iter().map(|(a, _)| (a - ma).powi(2)).sum::<f64>() / n;
                let vb = pairs.iter().map(|(_, b)| (b - mb).powi(2)).sum::<f64>() / n;
                if va == 0.0 || vb == 0.0 {
                    NAN
                } else {
                    cov / (va * vb).sqrt()
                }
            }
            _ => NAN,
        }
    }
}

fn mean(x: &[f64]) -> f64 {
    let (s, c) = valid(x).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    s / c as f64
}

fn variance(x: &[f64]) -> f64 {
    let m = mean(x);
    let (s, c) = valid(x).fold((0.0, 0usize), |(s, c), v| (s + (v - m).powi(2), c + 1));
    s / c as f64
}

/// Median of non-empty values (mean of the two central values for even counts).
pub(crate) fn median(values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return NAN;
    }
    let sorted: Vec<f64> = values.into_iter().sorted_by_key(|&v| OrderedFloat(v)).collect();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

impl FromStr for AggregateOp {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use AggregateOp::*;
        Ok(match s.to_ascii_lowercase().as_str() {
            "sum" => Sum,
            "avg" | "mean" => Mean,
            "var" | "variance" => Variance,
            "stddev" | "std" => StdDev,
            "median" => Median,
            "mad" => Mad,
            "rmse" => Rmse,
            "argmin" => ArgMin,
            "argmax" => ArgMax,
            "min" => Min,
            "max" => Max,
            "zeros" => Zeros,
            "count" => Count,
            "l0" | "l0diff" => L0Diff,
            "l1" | "l1diff" => L1Diff,
            "l2" | "l2diff" => L2Diff,
            "linf" | "linfdiff" => LinfDiff,
            "covariance" | "cov" => Covariance,
            "correlation" | "corr" => Correlation,
            other => {
                return Err(TrackError::wrong(format!(
                    "unknown aggregate operator '{other}'"
                )))
            }
        })
    }
}

#[cfg(test)]
mod aggregate_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic_statistics() {
        let x = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(AggregateOp::Sum.apply(&x, None).unwrap(), 40.0);
        assert_eq!(AggregateOp::Mean.apply(&x, None).unwrap(), 5.0);
        assert_eq!(AggregateOp::StdDev.apply(&x, None).unwrap(), 2.0);
        assert_eq!(AggregateOp::Median.apply(&x, None).unwrap(), 4.5);
        assert_eq!(AggregateOp::ArgMax.apply(&x, None).unwrap(), 7.0);
        assert_eq!(AggregateOp::ArgMin.apply(&x, None).unwrap(), 0.0);
    }

    #[test]
    fn test_no_data_skipped() {
        let x = [1.0, f64::NAN, 3.0];
        assert_eq!(AggregateOp::Mean.apply(&x, None).unwrap(), 2.0);
        assert_eq!(AggregateOp::Count.apply(&x, None).unwrap(), 2.0);
        assert!(AggregateOp::Max.apply(&[f64::NAN], None).unwrap().is_nan());
    }

    #[test]
    fn test_pairwise() {
        let x = [1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0];
        assert_eq!(AggregateOp::L0Diff.apply(&x, Some(&y)).unwrap(), 2.0);
        assert_eq!(AggregateOp::L1Diff.apply(&x, Some(&y)).unwrap(), 3.0);
        assert_eq!(AggregateOp::LinfDiff.apply(&x, Some(&y)).unwrap(), 2.0);
        assert_relative_eq!(AggregateOp::Correlation.apply(&x, Some(&y)).unwrap(), 1.0);
        assert!(AggregateOp::Covariance.apply(&x, None).is_err());
    }
}
