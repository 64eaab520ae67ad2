//! # Kernel catalog
//!
//! Even-symmetric weighting functions `K(x)` with a half-width `h`. Outside
//! `[-h, h]` every kernel is zero. The same kernels drive convolution filters
//! ([`crate::operators::filter`]) and covariance matrices
//! ([`crate::stochastics::covariance`]).
//!
//! | Kernel | `K(x)` for `|x| <= h` |
//! |--------|----------------------|
//! | Dirac | `1` if `x = 0` else `0` |
//! | Uniform | `1/(2h)` |
//! | Triangular | `(1 - |x|/h)/h` |
//! | Gaussian | `exp(-x²/(2σ²))`, `σ = h/3` |
//! | Exponential | `exp(-|x|/(h/3))` |
//! | Epanechnikov | `0.75 (1 - (x/h)²)/h` |
//! | Sinc | `sinc(x/(0.1h))/(0.1πh)` |
//!
//! The sinc kernel is not positive semidefinite; covariance matrices built from it
//! need the `force` flag of the covariance builder.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tracklib_errors::TrackError;

/// Kernel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Dirac,
    Uniform,
    Triangular,
    Gaussian,
    Exponential,
    Epanechnikov,
    Sinc,
}

impl FromStr for KernelKind {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dirac" => Ok(KernelKind::Dirac),
            "uniform" => Ok(KernelKind::Uniform),
            "triangular" => Ok(KernelKind::Triangular),
            "gaussian" => Ok(KernelKind::Gaussian),
            "exponential" => Ok(KernelKind::Exponential),
            "epanechnikov" => Ok(KernelKind::Epanechnikov),
            "sinc" => Ok(KernelKind::Sinc),
            other => Err(TrackError::wrong(format!("unknown kernel '{other}'"))),
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelKind::Dirac => "dirac",
            KernelKind::Uniform => "uniform",
            KernelKind::Triangular => "triangular",
            KernelKind::Gaussian => "gaussian",
            KernelKind::Exponential => "exponential",
            KernelKind::Epanechnikov => "epanechnikov",
            KernelKind::Sinc => "sinc",
        };
        f.write_str(name)
    }
}

/// How a filter treats the samples beyond both ends of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Boundary {
    /// Missing samples count as zero.
    #[default]
    ZeroPad,
    /// Samples are mirrored about the end points.
    Reflect,
}

/// A kernel of given family and half-width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kernel {
    kind: KernelKind,
    support: f64,
    #[serde(default)]
    boundary: Boundary,
}

impl Kernel {
    /// Build a kernel of half-width `support`.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::WrongArgument`] if `support` is not finite and positive
    ///   (zero is accepted for [`KernelKind::Dirac`]).
    pub fn new(kind: KernelKind, support: f64) -> Result<Self, TrackError> {
        let valid = support.is_finite()
            && (support > 0.0 || (kind == KernelKind::Dirac && support == 0.0));
        if !valid {
            return Err(TrackError::wrong(format!(
                "{kind} kernel needs a positive half-width, got {support}"
            )));
        }
        Ok(Kernel {
            kind,
            support,
            boundary: Boundary::ZeroPad,
        })
    }

    pub fn dirac() -> Self {
        Kernel {
            kind: KernelKind::Dirac,
            support: 0.0,
            boundary: Boundary::ZeroPad,
        }
    }

    pub fn gaussian(sigma: f64) -> Result<Self, TrackError> {
        Kernel::new(KernelKind::Gaussian, 3.0 * sigma)
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    /// Half-width `h`.
    pub fn support(&self) -> f64 {
        self.support
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// `K(x)`.
    pub fn evaluate(&self, x: f64) -> f64 {
        let h = self.support;
        let ax = x.abs();
        if ax > h {
            return 0.0;
        }
        match self.kind {
            KernelKind::Dirac => {
                if x == 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            KernelKind::Uniform => 1.0 / (2.0 * h),
            KernelKind::Triangular => (1.0 - ax / h) / h,
            KernelKind::Gaussian => {
                let sigma = h / 3.0;
                (-x * x / (2.0 * sigma * sigma)).exp()
            }
            KernelKind::Exponential => (-ax / (h / 3.0)).exp(),
            KernelKind::Epanechnikov => 0.75 * (1.0 - (x / h).powi(2)) / h,
            KernelKind::Sinc => {
                let width = 0.1 * h;
                sinc(x / width) / (std::f64::consts::PI * width)
            }
        }
    }

    /// `K(x) / K(0)`, equal to one at the origin.
    pub fn normalized(&self, x: f64) -> f64 {
        self.evaluate(x) / self.evaluate(0.0)
    }

    /// Discrete weights at offsets `-m..=m` samples of `step` units, summing to one.
    ///
    /// `m = floor(h / step)`; the Dirac kernel yields `[1.0]`.
    pub fn weights(&self, step: f64) -> Result<Vec<f64>, TrackError> {
        if !(step > 0.0) {
            return Err(TrackError::wrong(format!("kernel step must be > 0, got {step}")));
        }
        let m = (self.support / step).floor() as i64;
        let raw: Vec<f64> = (-m..=m).map(|k| self.evaluate(k as f64 * step)).collect();
        let total: f64 = raw.iter().sum();
        if total == 0.0 || !total.is_finite() {
            return Err(TrackError::Numerical(format!(
                "{} kernel of half-width {} has no mass at step {step}",
                self.kind, self.support
            )));
        }
        Ok(raw.into_iter().map(|w| w / total).collect())
    }
}

fn sinc(u: f64) -> f64 {
    if u == 0.0 {
        1.0
    } else {
        u.sin() / u
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(h={})", self.kind, self.support)
    }
}

#[cfg(test)]
mod kernel_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_values_at_origin() {
        let h = 2.0;
        let k = |kind| Kernel::new(kind, h).unwrap();
        assert_eq!(k(KernelKind::Dirac).evaluate(0.0), 1.0);
        assert_relative_eq!(k(KernelKind::Uniform).evaluate(0.5), 0.25);
        assert_relative_eq!(k(KernelKind::Triangular).evaluate(1.0), 0.25);
        assert_relative_eq!(k(KernelKind::Gaussian).evaluate(0.0), 1.0);
        assert_relative_eq!(k(KernelKind::Epanechnikov).evaluate(0.0), 0.375);
        assert_relative_eq!(k(KernelKind::Sinc).normalized(0.0), 1.0);
        assert_eq!(k(KernelKind::Exponential).evaluate(2.5), 0.0);
    }

    #[test]
    fn test_even_symmetry() {
        for kind in [
            KernelKind::Uniform,
            KernelKind::Triangular,
            KernelKind::Gaussian,
            KernelKind::Exponential,
            KernelKind::Epanechnikov,
            KernelKind::Sinc,
        ] {
            let k = Kernel::new(kind, 3.0).unwrap();
            for x in [0.1, 0.7, 1.9, 2.99] {
                assert_relative_eq!(k.evaluate(x), k.evaluate(-x));
            }
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let w = Kernel::new(KernelKind::Triangular, 3.0)
            .unwrap()
            .weights(1.0)
            .unwrap();
        assert_eq!(w.len(), 7);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0);
        assert_eq!(Kernel::dirac().weights(1.0).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_invalid_support() {
        assert!(Kernel::new(KernelKind::Gaussian, 0.0).is_err());
        assert!(Kernel::new(KernelKind::Uniform, f64::NAN).is_err());
        assert!("bogus".parse::<KernelKind>().is_err());
    }
}
