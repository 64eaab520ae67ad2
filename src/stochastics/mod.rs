//! # Stochastic engine
//!
//! Correlated random perturbations of tracks.
//!
//! Modules
//! -----------------
//! * [`distributions`] – zero-mean, unit-variance samplers (normal, uniform, Laplace).
//! * [`covariance`] – kernel-based covariance matrices with control points.
//! * [`params`] – [`NoiseParams`] and its validating builder.
//! * [`noising`] – Cholesky-based conditional simulation of displacement fields.
//!
//! Seeding
//! -----------------
//! One process-wide generator backs every call that does not receive an explicit
//! `rng`. [`seed`] reseeds it deterministically; [`reseed_from_os`] draws a fresh
//! 32-bit seed from the operating system and keeps it retrievable through
//! [`current_seed`] so that a run can be replayed. Every public sampling function
//! also has a variant taking `rng: &mut impl Rng`, which tests use with a seeded
//! [`StdRng`].
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

pub mod covariance;
pub mod distributions;
pub mod noising;
pub mod params;

pub use covariance::{build_covariance, ControlPoint, DistanceMode};
pub use distributions::NoiseDistribution;
pub use noising::{noise_replicates, NoiseEngine};
pub use params::{Directions, NoiseParams, NoiseParamsBuilder};

struct GlobalRng {
    seed: u64,
    rng: StdRng,
}

static GLOBAL_RNG: Lazy<Mutex<GlobalRng>> = Lazy::new(|| {
    let seed = u64::from(rand::random::<u32>());
    Mutex::new(GlobalRng {
        seed,
        rng: StdRng::seed_from_u64(seed),
    })
});

/// Reseed the process-wide generator.
pub fn seed(n: u64) {
    let mut global = GLOBAL_RNG.lock().unwrap_or_else(|e| e.into_inner());
    global.seed = n;
    global.rng = StdRng::seed_from_u64(n);
}

/// Reseed the process-wide generator with a fresh 32-bit OS seed, and return it.
pub fn reseed_from_os() -> u64 {
    let n = u64::from(rand::random::<u32>());
    seed(n);
    info!(seed = n, "process-wide generator reseeded");
    n
}

/// Seed of the process-wide generator.
pub fn current_seed() -> u64 {
    GLOBAL_RNG.lock().unwrap_or_else(|e| e.into_inner()).seed
}

/// Run `f` with exclusive access to the process-wide generator.
pub fn with_global_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    let mut global = GLOBAL_RNG.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut global.rng)
}
