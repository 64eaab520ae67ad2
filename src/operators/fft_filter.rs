//! Brick-wall frequency filters.
//!
//! The signal goes through a forward DFT, coefficients outside the kept band are
//! zeroed, and the real part of the inverse DFT is returned. With `N` samples and a
//! cutoff `fc` given as a fraction of the Nyquist frequency, the low-pass band is
//! `[0, fc·N/2] ∪ [N - fc·N/2, N)`; the high-pass keeps the complement.
use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::tracklib_errors::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FftPass {
    LowPass,
    HighPass,
}

/// Apply a brick-wall filter with cutoff `fc ∈ [0, 1]` (fraction of Nyquist).
pub fn fft_filter(x: &[f64], fc: f64, pass: FftPass) -> Result<Vec<f64>, TrackError> {
    if !(0.0..=1.0).contains(&fc) {
        return Err(TrackError::wrong(format!(
            "cutoff must be a fraction of Nyquist in [0, 1], got {fc}"
        )));
    }
    let n = x.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    forward.process(&mut buffer);

    let half_band = fc * n as f64 / 2.0;
    for (k, c) in buffer.iter_mut().enumerate() {
        let kf = k as f64;
        let in_low_band = kf <= half_band || kf >= n as f64 - half_band;
        let keep = match pass {
            FftPass::LowPass => in_low_band,
            FftPass::HighPass => !in_low_band,
        };
        if !keep {
            *c = Complex64::new(0.0, 0.0);
        }
    }

    inverse.process(&mut buffer);
    // rustfft leaves the inverse unnormalized
    let scale = 1.0 / n as f64;
    Ok(buffer.iter().map(|c| c.re * scale).collect())
}

#[cfg(test)]
mod fft_filter_test {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_low_pass_removes_high_tone() {
        let n = 128;
        let slow: Vec<f64> = (0..n).map(|i| (TAU * 2.0 * i as f64 / n as f64).sin()).collect();
        let fast: Vec<f64> = (0..n).map(|i| (TAU * 40.0 * i as f64 / n as f64).sin()).collect();
        let mixed: Vec<f64> = slow.iter().zip(&fast).map(|(a, b)| a + b).collect();

        let low = fft_filter(&mixed, 0.25, FftPass::LowPass).unwrap();
        let high = fft_filter(&mixed, 0.25, FftPass::HighPass).unwrap();
        for i in 0..n {
            assert!((low[i] - slow[i]).abs() < 1e-9);
            assert!((high[i] - fast[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_full_band_is_identity() {
        let x = vec![1.0, -2.0, 3.5, 0.25];
        let y = fft_filter(&x, 1.0, FftPass::LowPass).unwrap();
        for (a, b) in x.iter().zip(&y) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
