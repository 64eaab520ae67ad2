//! # Constants and type definitions for tracklib
//!
//! This module centralizes the **numerical sentinels**, **ellipsoid parameters**, and
//! **common type aliases** used throughout the library.
//!
//! ## Overview
//!
//! - No-data sentinels for float features, integer features and raster cells
//! - WGS-84 ellipsoid parameters used by the coordinate conversions
//! - Reserved analytical feature names
//! - Default timestamp patterns
//!
//! These definitions are shared by every subsystem: track model, operators,
//! stochastic engine, comparison, simplification and raster summaries.

// -------------------------------------------------------------------------------------------------
// Sentinels
// -------------------------------------------------------------------------------------------------

/// No-data sentinel written in float features (element-wise anomalies, extensions).
pub const NAN: f64 = f64::NAN;

/// No-data sentinel for integer features and raster cells.
pub const NO_DATA_VALUE: f64 = -999_999.0;

/// Integer flavour of [`NO_DATA_VALUE`].
pub const NO_DATA_INT: i64 = -999_999;

/// Conditioning term added to the diagonal of covariance matrices before factorization.
pub const COVARIANCE_EPSILON: f64 = 1e-12;

/// First diagonal jitter tried when a Cholesky factorization fails, relative to the
/// largest diagonal term. Each retry multiplies it by ten.
pub const COVARIANCE_JITTER: f64 = 1e-10;

/// Number of jittered Cholesky retries.
pub const COVARIANCE_JITTER_STEPS: usize = 5;

/// Largest `-λ_min / λ_max` accepted as truncation residue of a positive definite
/// kernel. Truncating a Gaussian at `3σ` stays around `1e-3`; sinc, uniform and
/// Epanechnikov covariances sit above `2e-2`.
pub const TRUNCATION_TOLERANCE: f64 = 5e-3;

/// Convergence threshold for the iterative central-track fusion.
pub const FUSION_EPSILON: f64 = 1e-16;

/// Maximum number of iterations of the central-track fusion.
pub const FUSION_MAX_ITER: usize = 100;

/// Default fast-DTW band half-width.
pub const FAST_DTW_BAND: usize = 12;

// -------------------------------------------------------------------------------------------------
// WGS-84 ellipsoid
// -------------------------------------------------------------------------------------------------

/// 2π, useful for angle normalization
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Earth equatorial radius in meters (WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Inverse flattening of the WGS84 ellipsoid
pub const EARTH_INV_FLATTENING: f64 = 298.257_223_563;

/// Flattening of the WGS84 ellipsoid
pub const EARTH_FLATTENING: f64 = 1.0 / EARTH_INV_FLATTENING;

/// Earth polar radius in meters (WGS84)
pub const EARTH_MINOR_AXIS: f64 = EARTH_MAJOR_AXIS * (1.0 - EARTH_FLATTENING);

/// First eccentricity squared
pub const EARTH_ECCENTRICITY_SQ: f64 = 2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING;

/// Mean Earth radius used by great-circle distances (IUGG)
pub const EARTH_MEAN_RADIUS: f64 = 6_371_008.8;

// -------------------------------------------------------------------------------------------------
// Reserved feature names
// -------------------------------------------------------------------------------------------------

/// Curvilinear abscissa
pub const ABS_CURV: &str = "abs_curv";
/// Instantaneous speed
pub const SPEED: &str = "speed";
/// Heading (azimuth from previous point)
pub const HEADING: &str = "heading";
/// Distance from previous point
pub const DS: &str = "ds";
/// Acceleration
pub const ACCELERATION: &str = "acceleration";
/// Slope in degrees
pub const SLOPE: &str = "slope";
/// Cumulative positive elevation gain
pub const DENIV_POS: &str = "deniv_pos";
/// Cumulative negative elevation gain
pub const DENIV_NEG: &str = "deniv_neg";

/// Names that kinematics own; user code may read but should not redefine them.
pub const RESERVED_FEATURES: [&str; 4] = [ABS_CURV, SPEED, HEADING, DS];

// -------------------------------------------------------------------------------------------------
// Timestamp patterns
// -------------------------------------------------------------------------------------------------

/// Default read pattern (`DD/MM/YYYY hh:mm:ss`)
pub const DEFAULT_READ_PATTERN: &str = "2D/2M/4Y 2h:2m:2s";

/// Default print pattern
pub const DEFAULT_PRINT_PATTERN: &str = "2D/2M/4Y 2h:2m:2s";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters (or ground units of a local frame)
pub type Meter = f64;
/// Duration in seconds
pub type Seconds = f64;
