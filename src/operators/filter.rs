//! Centered convolution of a feature vector with a kernel or explicit weights.
use crate::kernel::{Boundary, Kernel};
use crate::tracklib_errors::TrackError;

/// Convolve `x` with an odd-length, centered weight array.
///
/// Arguments
/// -----------------
/// * `x`: the signal.
/// * `weights`: `2m + 1` weights, `weights[m]` applies to the current sample.
/// * `boundary`: treatment of the `m` samples missing at each end.
///
/// Return
/// ----------
/// * [`TrackError::WrongArgument`] if `weights` is empty or of even length.
pub fn convolve(x: &[f64], weights: &[f64], boundary: Boundary) -> Result<Vec<f64>, TrackError> {
    if weights.is_empty() || weights.len() % 2 == 0 {
        return Err(TrackError::wrong(format!(
            "filter weights must have odd length, got {}",
            weights.len()
        )));
    }
    let n = x.len() as i64;
    let m = (weights.len() / 2) as i64;
    Ok((0..n)
        .map(|i| {
            weights
                .iter()
                .enumerate()
                .filter_map(|(k, w)| {
                    let j = i + k as i64 - m;
                    sample(x, j, boundary).map(|v| w * v)
                })
                .sum()
        })
        .collect())
}

/// Value of `x` at a possibly out-of-range index under a boundary policy.
fn sample(x: &[f64], j: i64, boundary: Boundary) -> Option<f64> {
    let n = x.len() as i64;
    if (0..n).contains(&j) {
        return Some(x[j as usize]);
    }
    match boundary {
        Boundary::ZeroPad => None,
        Boundary::Reflect => {
            if n == 1 {
                return Some(x[0]);
            }
            // mirror about the end samples: x[-1] = x[1], x[n] = x[n - 2]
            let period = 2 * (n - 1);
            let mut r = j.rem_euclid(period);
            if r >= n {
                r = period - r;
            }
            Some(x[r as usize])
        }
    }
}

/// Filter `x` with a kernel sampled every `step` units, boundary taken from the kernel.
pub fn kernel_filter(x: &[f64], kernel: &Kernel, step: f64) -> Result<Vec<f64>, TrackError> {
    let weights = kernel.weights(step)?;
    convolve(x, &weights, kernel.boundary())
}

#[cfg(test)]
mod filter_test {
    use super::*;
    use crate::kernel::KernelKind;

    #[test]
    fn test_moving_average_zero_pad() {
        let y = convolve(&[3.0, 3.0, 3.0], &[1.0 / 3.0; 3], Boundary::ZeroPad).unwrap();
        assert!((y[0] - 2.0).abs() < 1e-12);
        assert!((y[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_reflect_keeps_constant() {
        let k = Kernel::new(KernelKind::Triangular, 3.0)
            .unwrap()
            .with_boundary(Boundary::Reflect);
        let y = kernel_filter(&[5.0; 6], &k, 1.0).unwrap();
        assert!(y.iter().all(|v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_even_weights_rejected() {
        assert!(convolve(&[1.0], &[0.5, 0.5], Boundary::ZeroPad).is_err());
    }
}
