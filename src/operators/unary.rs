//! Element-wise and sequence operators `f(X) -> Y`.
use std::fmt;
use std::str::FromStr;

use crate::constants::NAN;
use crate::tracklib_errors::TrackError;

/// Unary operators over one feature vector.
///
/// Values that have no mathematical image (`log` of a non-positive number,
/// `1/0`, ...) become the float no-data sentinel (`NaN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Identity,
    Log,
    Exp,
    Sign,
    Square,
    Sqrt,
    /// `max(0, x)`
    Rectifier,
    /// Affine map of `[min, max]` onto `[0, 1]`
    Normalizer,
    /// `x - mean(x)`
    Debiaser,
    /// `1 / x`
    Inverter,
    /// `y[i] = x[i + 1]`, last value no-data
    ShiftLeft,
    /// `y[i] = x[i - 1]`, first value no-data
    ShiftRight,
    /// `y[0] = 0`, `y[i] = x[i] - x[i - 1]`
    Differentiator,
    /// Cumulative sum
    Integrator,
}

impl UnaryOp {
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        match self {
            UnaryOp::Identity => x.to_vec(),
            UnaryOp::Log => x
                .iter()
                .map(|&v| if v > 0.0 { v.ln() } else { NAN })
                .collect(),
            UnaryOp::Exp => x.iter().map(|v| v.exp()).collect(),
            UnaryOp::Sign => x
                .iter()
                .map(|&v| {
                    if v.is_nan() {
                        NAN
                    } else if v > 0.0 {
                        1.0
                    } else if v < 0.0 {
                        -1.0
                    } else {
                        0.0
                    }
                })
                .collect(),
            UnaryOp::Square => x.iter().map(|v| v * v).collect(),
            UnaryOp::Sqrt => x
                .iter()
                .map(|&v| if v >= 0.0 { v.sqrt() } else { NAN })
                .collect(),
            UnaryOp::Rectifier => x
                .iter()
                .map(|&v| if v.is_nan() { NAN } else { v.max(0.0) })
                .collect(),
            UnaryOp::Normalizer => {
                let (lo, hi) = valid(x).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
                let span = hi - lo;
                x.iter()
                    .map(|&v| if span > 0.0 { (v - lo) / span } else { NAN })
                    .collect()
            }
            UnaryOp::Debiaser => {
                let (sum, count) = valid(x).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                let mean = if count > 0 { sum / count as f64 } else { NAN };
                x.iter().map(|v| v - mean).collect()
            }
            UnaryOp::Inverter => x
                .iter()
                .map(|&v| if v != 0.0 { 1.0 / v } else { NAN })
                .collect(),
            UnaryOp::ShiftLeft => (0..n)
                .map(|i| if i + 1 < n { x[i + 1] } else { NAN })
                .collect(),
            UnaryOp::ShiftRight => (0..n)
                .map(|i| if i > 0 { x[i - 1] } else { NAN })
                .collect(),
            UnaryOp::Differentiator => (0..n)
                .map(|i| if i > 0 { x[i] - x[i - 1] } else { 0.0 })
                .collect(),
            UnaryOp::Integrator => x
                .iter()
                .scan(0.0, |acc, &v| {
                    *acc += v;
                    Some(*acc)
                })
                .collect(),
        }
    }
}

/// Values that are not the no-data sentinel.
pub(crate) fn valid(x: &[f64]) -> impl Iterator<Item = f64> + '_ {
    x.iter().copied().filter(|v| !v.is_nan())
}

impl FromStr for UnaryOp {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use UnaryOp::*;
        Ok(match s.to_ascii_lowercase().as_str() {
            "identity" => Identity,
            "log" => Log,
            "exp" => Exp,
            "sign" => Sign,
            "square" => Square,
            "sqrt" => Sqrt,
            "rectifier" => Rectifier,
            "normalizer" => Normalizer,
            "debiaser" => Debiaser,
            "inverter" => Inverter,
            "shift_left" => ShiftLeft,
            "shift_right" => ShiftRight,
            "differentiator" => Differentiator,
            "integrator" => Integrator,
            other => return Err(TrackError::wrong(format!("unknown unary operator '{other}'"))),
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod unary_test {
    use super::*;

    #[test]
    fn test_integrator_inverts_differentiator() {
        let x = vec![0.0, 1.5, -2.0, 4.0, 4.25];
        let back = UnaryOp::Integrator.apply(&UnaryOp::Differentiator.apply(&x));
        assert_eq!(back, x);
    }

    #[test]
    fn test_sentinels() {
        let y = UnaryOp::Log.apply(&[1.0, 0.0, -1.0]);
        assert_eq!(y[0], 0.0);
        assert!(y[1].is_nan() && y[2].is_nan());
        assert!(UnaryOp::Inverter.apply(&[0.0])[0].is_nan());
    }

    #[test]
    fn test_shifts_and_normalizer() {
        let x = [1.0, 2.0, 3.0];
        let l = UnaryOp::ShiftLeft.apply(&x);
        assert_eq!(&l[..2], &[2.0, 3.0]);
        assert!(l[2].is_nan());
        let r = UnaryOp::ShiftRight.apply(&x);
        assert_eq!(&r[1..], &[1.0, 2.0]);
        assert_eq!(UnaryOp::Normalizer.apply(&x), vec![0.0, 0.5, 1.0]);
        assert_eq!(UnaryOp::Debiaser.apply(&x), vec![-1.0, 0.0, 1.0]);
    }
}
