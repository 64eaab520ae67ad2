//! Zero-mean, unit-variance noise distributions.
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::tracklib_errors::TrackError;

/// Distribution of the independent draws fed to the covariance factor.
///
/// All three variants have mean 0 and variance 1:
/// * `Normal` – standard normal,
/// * `Uniform` – uniform on `[-√3, √3]`,
/// * `Laplace` – Laplace of scale `1/√2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseDistribution {
    #[default]
    Normal,
    Uniform,
    Laplace,
}

impl NoiseDistribution {
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        match self {
            NoiseDistribution::Normal => rng.sample(StandardNormal),
            NoiseDistribution::Uniform => {
                let a = 3f64.sqrt();
                rng.random_range(-a..a)
            }
            NoiseDistribution::Laplace => {
                let b = std::f64::consts::FRAC_1_SQRT_2;
                // inverse CDF on u in (-1/2, 1/2)
                let u: f64 = rng.random::<f64>() - 0.5;
                let mag = (1.0 - 2.0 * u.abs()).max(f64::MIN_POSITIVE);
                -b * u.signum() * mag.ln()
            }
        }
    }

    pub fn sample_n(&self, n: usize, rng: &mut impl Rng) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

impl FromStr for NoiseDistribution {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" | "gaussian" => Ok(NoiseDistribution::Normal),
            "uniform" => Ok(NoiseDistribution::Uniform),
            "laplace" => Ok(NoiseDistribution::Laplace),
            other => Err(TrackError::wrong(format!("unknown distribution '{other}'"))),
        }
    }
}

impl fmt::Display for NoiseDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseDistribution::Normal => f.write_str("normal"),
            NoiseDistribution::Uniform => f.write_str("uniform"),
            NoiseDistribution::Laplace => f.write_str("laplace"),
        }
    }
}

#[cfg(test)]
mod distributions_test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_unit_variance() {
        let mut rng = StdRng::seed_from_u64(99);
        for dist in [
            NoiseDistribution::Normal,
            NoiseDistribution::Uniform,
            NoiseDistribution::Laplace,
        ] {
            let x = dist.sample_n(200_000, &mut rng);
            let n = x.len() as f64;
            let mean = x.iter().sum::<f64>() / n;
            let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            assert!(mean.abs() < 0.02, "{dist}: mean {mean}");
            assert!((var - 1.0).abs() < 0.03, "{dist}: variance {var}");
        }
    }

    #[test]
    fn test_uniform_support() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = 3f64.sqrt();
        assert!(NoiseDistribution::Uniform
            .sample_n(10_000, &mut rng)
            .iter()
            .all(|v| v.abs() <= a));
    }
}
