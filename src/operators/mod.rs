//! # Operator framework
//!
//! Numerical transformations over the feature vectors of one [`Track`].
//!
//! Operators are grouped by signature:
//!
//! | Family | Signature | Type |
//! |--------|-----------|------|
//! | unary | `f(X) -> Y` | [`UnaryOp`] |
//! | binary | `f(X, Y) -> Z` | [`BinaryOp`] |
//! | scalar | `f(X, c) -> Y` | [`ScalarOp`] |
//! | aggregate | `f(X) -> c` or `f(X, Y) -> c` | [`AggregateOp`] |
//! | filter | `X * w` | [`Operator::Filter`], [`Operator::KernelFilter`] |
//! | frequency filter | `IDFT(mask · DFT(X))` | [`Operator::FftFilter`] |
//!
//! [`operate`] is the single entry point: it reads the input features, dispatches
//! on the [`Operator`] variant and, when an output name is given, writes the result
//! back into the track (the "void" form). Reads complete before the write, so the
//! output may shadow one of the inputs.
//!
//! Pseudo-features `x`, `y`, `z` and `t` (Unix seconds) can be used as inputs.
//!
//! ```rust
//! use tracklib::operators::{operate, Operator, UnaryOp};
//! use tracklib::track::Track;
//!
//! let mut track = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
//! track.set_feature("ds", vec![0.0, 1.0, 1.0]).unwrap();
//! operate(&mut track, &Operator::Unary(UnaryOp::Integrator), &["ds"], Some("abs_curv")).unwrap();
//! assert_eq!(track.get_feature("abs_curv").unwrap(), vec![0.0, 1.0, 2.0]);
//! ```
use crate::kernel::{Boundary, Kernel};
use crate::track::Track;
use crate::tracklib_errors::TrackError;

pub mod aggregate;
pub mod binary;
pub mod fft_filter;
pub mod filter;
pub mod unary;

pub use aggregate::AggregateOp;
pub use binary::{BinaryOp, ScalarOp};
pub use fft_filter::FftPass;
pub use unary::UnaryOp;

/// Every operator the framework can dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Unary(UnaryOp),
    Binary(BinaryOp),
    Scalar(ScalarOp, f64),
    Aggregate(AggregateOp),
    /// Convolution with explicit odd-length weights
    Filter {
        weights: Vec<f64>,
        boundary: Boundary,
    },
    /// Convolution with a kernel sampled every `step` feature indices
    KernelFilter { kernel: Kernel, step: f64 },
    FftFilter { cutoff: f64, pass: FftPass },
}

impl Operator {
    /// Number of input features the operator reads.
    pub fn arity(&self) -> usize {
        match self {
            Operator::Binary(_) => 2,
            Operator::Aggregate(op) if op.is_binary() => 2,
            _ => 1,
        }
    }
}

/// Result of an operator: a feature vector or a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorOutput {
    Vector(Vec<f64>),
    Scalar(f64),
}

impl OperatorOutput {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            OperatorOutput::Scalar(v) => Some(*v),
            OperatorOutput::Vector(_) => None,
        }
    }

    pub fn into_vector(self) -> Option<Vec<f64>> {
        match self {
            OperatorOutput::Vector(v) => Some(v),
            OperatorOutput::Scalar(_) => None,
        }
    }
}

/// Apply `op` on the features named by `inputs`.
///
/// Arguments
/// -----------------
/// * `track`: the track whose features are read (and written when `output` is set).
/// * `op`: the operator.
/// * `inputs`: feature names, as many as [`Operator::arity`].
/// * `output`: when set, the vector result is stored under this name; an aggregate
///   result is broadcast over every observation.
///
/// Return
/// ----------
/// * The operator output.
/// * [`TrackError::MissingFeature`] for an unknown input,
///   [`TrackError::WrongArgument`] for a wrong input count.
pub fn operate(
    track: &mut Track,
    op: &Operator,
    inputs: &[&str],
    output: Option<&str>,
) -> Result<OperatorOutput, TrackError> {
    let result = evaluate(track, op, inputs)?;
    if let Some(name) = output {
        let values = match &result {
            OperatorOutput::Vector(v) => v.clone(),
            OperatorOutput::Scalar(c) => vec![*c; track.size()],
        };
        track.set_feature(name, values)?;
    }
    Ok(result)
}

/// Apply `op` without touching the track.
pub fn evaluate(track: &Track, op: &Operator, inputs: &[&str]) -> Result<OperatorOutput, TrackError> {
    if inputs.len() != op.arity() {
        return Err(TrackError::wrong(format!(
            "{op:?} expects {} input feature(s), got {}",
            op.arity(),
            inputs.len()
        )));
    }
    let x = read_input(track, inputs[0])?;
    Ok(match op {
        Operator::Unary(u) => OperatorOutput::Vector(u.apply(&x)),
        Operator::Binary(b) => {
            let y = read_input(track, inputs[1])?;
            OperatorOutput::Vector(b.apply(&x, &y)?)
        }
        Operator::Scalar(s, c) => OperatorOutput::Vector(s.apply(&x, *c)),
        Operator::Aggregate(a) => {
            let y = match inputs.get(1) {
                Some(name) => Some(read_input(track, name)?),
                None => None,
            };
            OperatorOutput::Scalar(a.apply(&x, y.as_deref())?)
        }
        Operator::Filter { weights, boundary } => {
            OperatorOutput::Vector(filter::convolve(&x, weights, *boundary)?)
        }
        Operator::KernelFilter { kernel, step } => {
            OperatorOutput::Vector(filter::kernel_filter(&x, kernel, *step)?)
        }
        Operator::FftFilter { cutoff, pass } => {
            OperatorOutput::Vector(fft_filter::fft_filter(&x, *cutoff, *pass)?)
        }
    })
}

/// Fill feature `name` by calling `sampler(i)` for every observation index.
pub fn fill_random<F>(track: &mut Track, name: &str, mut sampler: F) -> Result<(), TrackError>
where
    F: FnMut(usize) -> f64,
{
    let values = (0..track.size()).map(&mut sampler).collect();
    track.set_feature(name, values)
}

/// Feature values, or coordinates / Unix time for the pseudo-features `x`, `y`, `z`, `t`.
pub(crate) fn read_input(track: &Track, name: &str) -> Result<Vec<f64>, TrackError> {
    if track.has_feature(name) {
        return track.get_feature(name);
    }
    match name {
        "x" => Ok(track.x()),
        "y" => Ok(track.y()),
        "z" => Ok(track.z()),
        "t" => Ok(track.t()),
        "idx" => Ok((0..track.size()).map(|i| i as f64).collect()),
        _ => Err(TrackError::missing(name)),
    }
}

#[cfg(test)]
mod operators_test {
    use super::*;
    use crate::tracklib_errors::ErrorKind;

    fn sample_track() -> Track {
        let mut t = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (3.0, 0.0), (6.0, 0.0)]);
        t.set_feature("a", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        t.set_feature("b", vec![2.0, 0.0, 1.0, 2.0]).unwrap();
        t
    }

    #[test]
    fn test_output_shadows_input() {
        let op = Operator::Scalar(ScalarOp::Multiply, 2.0);
        let mut shadowed = sample_track();
        operate(&mut shadowed, &op, &["a"], Some("a")).unwrap();

        let mut copied = sample_track();
        operate(&mut copied, &op, &["a"], Some("y")).unwrap();
        let y = copied.get_feature("y").unwrap();
        copied.set_feature("a", y).unwrap();

        assert_eq!(shadowed.get_feature("a").unwrap(), copied.get_feature("a").unwrap());
    }

    #[test]
    fn test_divide_writes_sentinel_and_continues() {
        let mut t = sample_track();
        operate(&mut t, &Operator::Binary(BinaryOp::Divide), &["a", "b"], Some("q")).unwrap();
        let q = t.get_feature("q").unwrap();
        assert_eq!(q[0], 0.5);
        assert!(q[1].is_nan());
        assert_eq!(q[3], 2.0);
    }

    #[test]
    fn test_aggregate_over_pseudo_feature() {
        let mut t = sample_track();
        let out = operate(&mut t, &Operator::Aggregate(AggregateOp::Max), &["x"], Some("xmax")).unwrap();
        assert_eq!(out.as_scalar(), Some(6.0));
        assert_eq!(t.get_feature("xmax").unwrap(), vec![6.0; 4]);
    }

    #[test]
    fn test_arity_and_missing_errors() {
        let mut t = sample_track();
        let err = operate(&mut t, &Operator::Binary(BinaryOp::Add), &["a"], None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongArgument);
        let err = operate(&mut t, &Operator::Unary(UnaryOp::Exp), &["nope"], None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingFeature);
    }

    #[test]
    fn test_fill_random() {
        let mut t = sample_track();
        fill_random(&mut t, "r", |i| i as f64 * 10.0).unwrap();
        assert_eq!(t.get_feature("r").unwrap(), vec![0.0, 10.0, 20.0, 30.0]);
    }
}
