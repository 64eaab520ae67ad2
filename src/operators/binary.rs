//! Operators combining two feature vectors `f(X, Y) -> Z`, and their scalar
//! counterparts `f(X, c) -> Y`.
use std::str::FromStr;

use crate::constants::NAN;
use crate::tracklib_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    /// Division by zero yields no-data
    Divide,
    Power,
    /// `1` where equal, `0` elsewhere
    Equal,
    /// Causal convolution `z[i] = sum_k x[k] y[i - k]`
    Convolution,
    /// Lagged correlation `z[i] = sum_k x[k] y[k + i]`
    Correlation,
}

impl BinaryOp {
    /// Return
    /// ----------
    /// * [`TrackError::Structural`] on vectors of different lengths.
    pub fn apply(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>, TrackError> {
        check_same_len(x, y)?;
        let n = x.len();
        let zip = || x.iter().zip(y.iter()).map(|(&a, &b)| (a, b));
        Ok(match self {
            BinaryOp::Add => zip().map(|(a, b)| a + b).collect(),
            BinaryOp::Subtract => zip().map(|(a, b)| a - b).collect(),
            BinaryOp::Multiply => zip().map(|(a, b)| a * b).collect(),
            BinaryOp::Divide => zip()
                .map(|(a, b)| if b != 0.0 { a / b } else { NAN })
                .collect(),
            BinaryOp::Power => zip().map(|(a, b)| a.powf(b)).collect(),
            BinaryOp::Equal => zip()
                .map(|(a, b)| if a == b { 1.0 } else { 0.0 })
                .collect(),
            BinaryOp::Convolution => (0..n)
                .map(|i| (0..=i).map(|k| x[k] * y[i - k]).sum())
                .collect(),
            BinaryOp::Correlation => (0..n)
                .map(|i| (0..n - i).map(|k| x[k] * y[k + i]).sum())
                .collect(),
        })
    }
}

pub(crate) fn check_same_len(x: &[f64], y: &[f64]) -> Result<(), TrackError> {
    if x.len() != y.len() {
        return Err(TrackError::Structural(format!(
            "operands have different lengths ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

impl FromStr for BinaryOp {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use BinaryOp::*;
        Ok(match s.to_ascii_lowercase().as_str() {
            "add" | "+" => Add,
            "subtract" | "sub" | "-" => Subtract,
            "multiply" | "mul" | "*" => Multiply,
            "divide" | "div" | "/" => Divide,
            "power" | "pow" | "^" => Power,
            "equal" | "==" => Equal,
            "convolution" => Convolution,
            "correlation" => Correlation,
            other => return Err(TrackError::wrong(format!("unknown binary operator '{other}'"))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarOp {
    Add,
    Multiply,
    Power,
    /// `1` where `x >= c`, `0` elsewhere
    Threshold,
    /// Shift by `round(c)` positions (positive towards the end), no-data fill
    Shift,
}

impl ScalarOp {
    pub fn apply(&self, x: &[f64], c: f64) -> Vec<f64> {
        match self {
            ScalarOp::Add => x.iter().map(|v| v + c).collect(),
            ScalarOp::Multiply => x.iter().map(|v| v * c).collect(),
            ScalarOp::Power => x.iter().map(|v| v.powf(c)).collect(),
            ScalarOp::Threshold => x
                .iter()
                .map(|&v| if v.is_nan() { NAN } else if v >= c { 1.0 } else { 0.0 })
                .collect(),
            ScalarOp::Shift => {
                let n = x.len() as i64;
                let k = c.round() as i64;
                (0..n)
                    .map(|i| {
                        let j = i - k;
                        if (0..n).contains(&j) {
                            x[j as usize]
                        } else {
                            NAN
                        }
                    })
                    .collect()
            }
        }
    }
}

impl FromStr for ScalarOp {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ScalarOp::*;
        Ok(match s.to_ascii_lowercase().as_str() {
            "add" | "scalar_add" => Add,
            "multiply" | "scalar_multiply" => Multiply,
            "power" | "scalar_power" => Power,
            "threshold" => Threshold,
            "shift" => Shift,
            other => return Err(TrackError::wrong(format!("unknown scalar operator '{other}'"))),
        })
    }
}

#[cfg(test)]
mod binary_test {
    use super::*;

    #[test]
    fn test_divide_by_zero_is_no_data() {
        let z = BinaryOp::Divide.apply(&[1.0, 2.0], &[2.0, 0.0]).unwrap();
        assert_eq!(z[0], 0.5);
        assert!(z[1].is_nan());
    }

    #[test]
    fn test_length_mismatch() {
        let err = BinaryOp::Add.apply(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.kind(), crate::tracklib_errors::ErrorKind::Structural);
    }

    #[test]
    fn test_convolution_with_unit_impulse() {
        let x = [1.0, 2.0, 3.0];
        assert_eq!(BinaryOp::Convolution.apply(&x, &[1.0, 0.0, 0.0]).unwrap(), x);
        assert_eq!(
            BinaryOp::Correlation.apply(&x, &[1.0, 1.0, 1.0]).unwrap(),
            vec![6.0, 3.0, 1.0]
        );
    }

    #[test]
    fn test_scalar_shift_and_threshold() {
        let y = ScalarOp::Shift.apply(&[1.0, 2.0, 3.0], 1.0);
        assert!(y[0].is_nan());
        assert_eq!(&y[1..], &[1.0, 2.0]);
        assert_eq!(ScalarOp::Threshold.apply(&[0.5, 1.0, 2.0], 1.0), vec![0.0, 1.0, 1.0]);
    }
}
