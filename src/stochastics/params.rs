use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use super::covariance::{ControlPoint, DistanceMode};
use super::distributions::NoiseDistribution;
use crate::kernel::Kernel;
use crate::tracklib_errors::TrackError;

/// Components receiving noise.
///
/// With `ortho`, the third draw is applied along the horizontal normal of the
/// track instead of the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directions {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub ortho: bool,
}

impl Default for Directions {
    fn default() -> Self {
        Directions {
            x: true,
            y: true,
            z: false,
            ortho: false,
        }
    }
}

impl Directions {
    pub fn horizontal() -> Self {
        Directions::default()
    }

    /// Noise along the track normal only.
    pub fn ortho() -> Self {
        Directions {
            x: false,
            y: false,
            z: false,
            ortho: true,
        }
    }
}

/// Configuration of a noising run.
///
/// Fields
/// -----------------
/// * `components` – `(σ_k, K_k)` pairs, one independent field per pair; fields are summed.
/// * `distribution` – law of the independent draws.
/// * `mode` – distance used by the covariance kernel.
/// * `force` – project covariance matrices on the PSD cone before factorization.
/// * `cycle` – close the loop after noising (circular mode only).
/// * `control` – control points, each index at most once.
/// * `directions` – noised components.
/// * `replicates` – number of realizations drawn by [`noise_replicates`](super::noise_replicates).
///
/// Amplitudes are in the raw units of the track coordinates: convert geodetic
/// tracks to a local frame first for metric noise.
///
/// Defaults
/// -----------------
/// No component, normal draws, linear distance, no forcing, no cycle, no control
/// point, horizontal directions, one replicate.
///
/// ```rust
/// use tracklib::kernel::Kernel;
/// use tracklib::stochastics::NoiseParams;
///
/// let params = NoiseParams::builder()
///     .component(5.0, Kernel::gaussian(20.0).unwrap())
///     .component(1.0, Kernel::gaussian(2.0).unwrap())
///     .replicates(10)
///     .build()
///     .unwrap();
/// assert_eq!(params.components.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseParams {
    pub components: Vec<(f64, Kernel)>,
    pub distribution: NoiseDistribution,
    pub mode: DistanceMode,
    pub force: bool,
    pub cycle: bool,
    pub control: Vec<ControlPoint>,
    pub directions: Directions,
    pub replicates: usize,
}

impl Default for NoiseParams {
    fn default() -> Self {
        NoiseParams {
            components: Vec::new(),
            distribution: NoiseDistribution::Normal,
            mode: DistanceMode::Linear,
            force: false,
            cycle: false,
            control: Vec::new(),
            directions: Directions::default(),
            replicates: 1,
        }
    }
}

impl NoiseParams {
    pub fn builder() -> NoiseParamsBuilder {
        NoiseParamsBuilder::new()
    }

    /// Single-component configuration.
    pub fn simple(sigma: f64, kernel: Kernel) -> Result<Self, TrackError> {
        NoiseParams::builder().component(sigma, kernel).build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoiseParamsBuilder {
    params: NoiseParams,
}

impl NoiseParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(mut self, sigma: f64, kernel: Kernel) -> Self {
        self.params.components.push((sigma, kernel));
        self
    }

    pub fn distribution(mut self, v: NoiseDistribution) -> Self {
        self.params.distribution = v;
        self
    }

    pub fn mode(mut self, v: DistanceMode) -> Self {
        self.params.mode = v;
        self
    }

    pub fn force(mut self, v: bool) -> Self {
        self.params.force = v;
        self
    }

    pub fn cycle(mut self, v: bool) -> Self {
        self.params.cycle = v;
        self
    }

    pub fn control(mut self, v: ControlPoint) -> Self {
        self.params.control.push(v);
        self
    }

    pub fn directions(mut self, v: Directions) -> Self {
        self.params.directions = v;
        self
    }

    pub fn replicates(mut self, v: usize) -> Self {
        self.params.replicates = v;
        self
    }

    /// Validate and return the parameters.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::WrongArgument`] when there is no component, an amplitude is
    ///   negative or not finite, `replicates == 0`, no direction is active, a control
    ///   index repeats, or `cycle` is requested outside circular mode.
    pub fn build(self) -> Result<NoiseParams, TrackError> {
        let p = &self.params;
        if p.components.is_empty() {
            return Err(TrackError::wrong("noise needs at least one (sigma, kernel) component"));
        }
        if let Some((sigma, _)) = p.components.iter().find(|(s, _)| !(s.is_finite() && *s >= 0.0)) {
            return Err(TrackError::wrong(format!(
                "noise amplitude must be finite and >= 0, got {sigma}"
            )));
        }
        if p.replicates == 0 {
            return Err(TrackError::wrong("replicates must be >= 1"));
        }
        let d = p.directions;
        if !(d.x || d.y || d.z || d.ortho) {
            return Err(TrackError::wrong("no noise direction selected"));
        }
        let mut seen = AHashSet::new();
        if let Some(dup) = p.control.iter().find(|c| !seen.insert(c.index)) {
            return Err(TrackError::wrong(format!(
                "control index {} given more than once",
                dup.index
            )));
        }
        if p.cycle && p.mode != DistanceMode::Circular {
            return Err(TrackError::wrong("cycle requires the circular distance mode"));
        }
        Ok(self.params)
    }
}

impl fmt::Display for Directions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axes: Vec<&str> = [(self.x, "x"), (self.y, "y"), (self.z, "z"), (self.ortho, "ortho")]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect();
        write!(f, "{}", axes.join("+"))
    }
}

impl NoiseParams {
    /// Share of the total variance carried by each component, `σ_k² / Σ σ_j²`.
    ///
    /// Control displacements are split among components in these proportions.
    pub fn variance_shares(&self) -> Vec<f64> {
        let total: f64 = self.components.iter().map(|(s, _)| s * s).sum();
        self.components
            .iter()
            .map(|(s, _)| if total > 0.0 { s * s / total } else { 0.0 })
            .collect()
    }
}

/// `{}` prints a one-line summary, `{:#}` one line per component and per control
/// point.
impl fmt::Display for NoiseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !f.alternate() {
            return write!(
                f,
                "NoiseParams(components={}, distribution={}, mode={:?}, replicates={})",
                self.components.len(),
                self.distribution,
                self.mode,
                self.replicates
            );
        }
        writeln!(
            f,
            "{} noise on {} over {:?} distances, {} replicate(s){}{}",
            self.distribution,
            self.directions,
            self.mode,
            self.replicates,
            if self.cycle { ", closed loop" } else { "" },
            if self.force { ", PSD projection" } else { "" },
        )?;
        for ((sigma, kernel), share) in self.components.iter().zip(self.variance_shares()) {
            writeln!(f, "  sigma {sigma:>9.3}  {kernel}  ({:.1}% of variance)", 100.0 * share)?;
        }
        for cp in &self.control {
            match cp.target {
                Some(target) => writeln!(f, "  control #{} through {target}", cp.index)?,
                None => writeln!(f, "  control #{} fixed", cp.index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod params_test {
    use super::*;
    use crate::kernel::KernelKind;

    fn k() -> Kernel {
        Kernel::new(KernelKind::Gaussian, 10.0).unwrap()
    }

    #[test]
    fn test_builder_validation() {
        assert!(NoiseParams::builder().build().is_err());
        assert!(NoiseParams::builder().component(-1.0, k()).build().is_err());
        assert!(NoiseParams::builder().component(1.0, k()).replicates(0).build().is_err());
        assert!(NoiseParams::builder().component(1.0, k()).cycle(true).build().is_err());
        assert!(NoiseParams::builder()
            .component(1.0, k())
            .control(ControlPoint::fixed(3))
            .control(ControlPoint::fixed(3))
            .build()
            .is_err());
        let ok = NoiseParams::builder()
            .component(1.0, k())
            .mode(DistanceMode::Circular)
            .cycle(true)
            .build()
            .unwrap();
        assert!(ok.cycle);
    }

    #[test]
    fn test_variance_shares() {
        let p = NoiseParams::builder()
            .component(3.0, k())
            .component(1.0, k())
            .build()
            .unwrap();
        assert_eq!(p.variance_shares(), vec![0.9, 0.1]);
    }

    #[test]
    fn test_alternate_display() {
        let p = NoiseParams::builder()
            .component(3.0, k())
            .component(1.0, k())
            .control(ControlPoint::fixed(4))
            .directions(Directions::ortho())
            .build()
            .unwrap();
        let text = format!("{p:#}");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains(" on ortho over Linear distances, 1 replicate(s)"));
        assert!(lines[1].contains("sigma     3.000"));
        assert!(lines[1].ends_with("(90.0% of variance)"));
        assert_eq!(lines[3], "  control #4 fixed");
        assert_eq!(Directions::default().to_string(), "x+y");
        assert!(format!("{p}").starts_with("NoiseParams("));
    }
}
