//! # Coordinates
//!
//! A single [`Coord`] type holds three components and a [`CoordKind`] tag telling how to
//! read them:
//!
//! * [`CoordKind::Enu`] – local tangent plane `(east, north, up)` in meters,
//! * [`CoordKind::Geo`] – geodetic `(longitude, latitude, height)`, degrees and meters,
//! * [`CoordKind::Ecef`] – earth-centered earth-fixed `(X, Y, Z)` in meters.
//!
//! Dispatch on the tag is static; there is no trait object in the inner loops of DTW
//! or covariance builds.
//!
//! Conversions between kinds go through ECEF on the WGS-84 ellipsoid. A local frame
//! needs a geodetic anchor (`base`); tracks converted to ENU keep it so the conversion
//! can be reversed.
//!
//! Mixed-kind geometric queries (`distance_2d` between an ENU and a GEO point) read the
//! raw components: tracks guarantee a uniform kind, so this only happens on misuse.
use std::fmt;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{
    Meter, Radian, EARTH_ECCENTRICITY_SQ, EARTH_MAJOR_AXIS, EARTH_MEAN_RADIUS, EARTH_MINOR_AXIS,
    RADEG,
};
use crate::tracklib_errors::TrackError;

/// Symbolic tag of a coordinate system (a.k.a. SRID tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordKind {
    #[serde(rename = "ENU")]
    Enu,
    #[serde(rename = "GEO")]
    Geo,
    #[serde(rename = "ECEF")]
    Ecef,
}

impl std::str::FromStr for CoordKind {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENU" => Ok(CoordKind::Enu),
            "GEO" => Ok(CoordKind::Geo),
            "ECEF" => Ok(CoordKind::Ecef),
            other => Err(TrackError::wrong(format!("unknown SRID tag: {other}"))),
        }
    }
}

impl fmt::Display for CoordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordKind::Enu => write!(f, "ENU"),
            CoordKind::Geo => write!(f, "GEO"),
            CoordKind::Ecef => write!(f, "ECEF"),
        }
    }
}

/// A 3D position tagged with its coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    kind: CoordKind,
    a: f64,
    b: f64,
    c: f64,
}

impl Coord {
    /// Local tangent plane position.
    pub fn enu(east: Meter, north: Meter, up: Meter) -> Self {
        Coord {
            kind: CoordKind::Enu,
            a: east,
            b: north,
            c: up,
        }
    }

    /// Geodetic position, longitude and latitude in degrees.
    pub fn geo(lon: f64, lat: f64, height: Meter) -> Self {
        Coord {
            kind: CoordKind::Geo,
            a: lon,
            b: lat,
            c: height,
        }
    }

    /// Earth-centered earth-fixed position.
    pub fn ecef(x: Meter, y: Meter, z: Meter) -> Self {
        Coord {
            kind: CoordKind::Ecef,
            a: x,
            b: y,
            c: z,
        }
    }

    /// Build a coordinate of a given kind from its raw components.
    pub fn of_kind(kind: CoordKind, a: f64, b: f64, c: f64) -> Self {
        Coord { kind, a, b, c }
    }

    pub fn kind(&self) -> CoordKind {
        self.kind
    }

    /// First component (east, longitude or X).
    pub fn x(&self) -> f64 {
        self.a
    }

    /// Second component (north, latitude or Y).
    pub fn y(&self) -> f64 {
        self.b
    }

    /// Third component (up, height or Z).
    pub fn z(&self) -> f64 {
        self.c
    }

    pub fn set_x(&mut self, v: f64) {
        self.a = v;
    }

    pub fn set_y(&mut self, v: f64) {
        self.b = v;
    }

    pub fn set_z(&mut self, v: f64) {
        self.c = v;
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.a, self.b, self.c)
    }

    // ---------------------------------------------------------------------------------------------
    // Geometry
    // ---------------------------------------------------------------------------------------------

    /// Horizontal distance.
    ///
    /// * ENU / ECEF: planar Euclidean distance on the first two components,
    /// * GEO: great-circle (haversine) distance on the mean Earth sphere.
    pub fn distance_2d(&self, other: &Coord) -> Meter {
        match (self.kind, other.kind) {
            (CoordKind::Geo, CoordKind::Geo) => haversine(self, other),
            _ => ((self.a - other.a).powi(2) + (self.b - other.b).powi(2)).sqrt(),
        }
    }

    /// 3D distance; GEO points are compared in ECEF.
    pub fn distance_3d(&self, other: &Coord) -> Meter {
        match (self.kind, other.kind) {
            (CoordKind::Geo, CoordKind::Geo) => {
                (self.to_ecef().as_vector() - other.to_ecef().as_vector()).norm()
            }
            _ => (self.as_vector() - other.as_vector()).norm(),
        }
    }

    /// Azimuth toward `other`, measured clockwise from north, in `(-π, π]`.
    pub fn azimuth(&self, other: &Coord) -> Radian {
        match (self.kind, other.kind) {
            (CoordKind::Geo, CoordKind::Geo) => {
                let (lon1, lat1) = (self.a * RADEG, self.b * RADEG);
                let (lon2, lat2) = (other.a * RADEG, other.b * RADEG);
                let dlon = lon2 - lon1;
                let y = dlon.sin() * lat2.cos();
                let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
                y.atan2(x)
            }
            (CoordKind::Ecef, CoordKind::Ecef) => self.to_geo().azimuth(&other.to_geo()),
            _ => (other.a - self.a).atan2(other.b - self.b),
        }
    }

    /// Norm of the position vector.
    pub fn norm(&self) -> f64 {
        self.as_vector().norm()
    }

    /// Elevation component (up or height); ECEF points go through GEO.
    pub fn elevation(&self) -> Meter {
        match self.kind {
            CoordKind::Ecef => self.to_geo().c,
            _ => self.c,
        }
    }

    /// Translate in place by `(dx, dy, dz)` expressed in raw components.
    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        self.a += dx;
        self.b += dy;
        self.c += dz;
    }

    /// Counter-clockwise rotation about the origin in the horizontal plane.
    pub fn rotate(&mut self, theta: Radian) {
        let (s, c) = theta.sin_cos();
        let (x, y) = (self.a, self.b);
        self.a = c * x - s * y;
        self.b = s * x + c * y;
    }

    /// Uniform scaling about the origin.
    pub fn scale(&mut self, factor: f64) {
        self.a *= factor;
        self.b *= factor;
        self.c *= factor;
    }

    // ---------------------------------------------------------------------------------------------
    // Conversions
    // ---------------------------------------------------------------------------------------------

    /// Convert to ECEF. ENU points need their anchor, see [`Coord::enu_to_ecef`].
    ///
    /// An ENU point converted without anchor is returned unchanged.
    pub fn to_ecef(&self) -> Coord {
        match self.kind {
            CoordKind::Ecef | CoordKind::Enu => *self,
            CoordKind::Geo => geo_to_ecef(self.a, self.b, self.c),
        }
    }

    /// Convert to GEO. ENU points need their anchor, see [`Coord::to_geo_from`].
    pub fn to_geo(&self) -> Coord {
        match self.kind {
            CoordKind::Geo | CoordKind::Enu => *self,
            CoordKind::Ecef => ecef_to_geo(self.a, self.b, self.c),
        }
    }

    /// Express this point in the local frame anchored at `base` (GEO or ECEF).
    pub fn to_enu(&self, base: &Coord) -> Coord {
        if self.kind == CoordKind::Enu {
            return *self;
        }
        let base_geo = base.to_geo();
        let origin = base_geo.to_ecef().as_vector();
        let delta = self.to_ecef().as_vector() - origin;
        let v = enu_rotation(base_geo.a * RADEG, base_geo.b * RADEG) * delta;
        Coord::enu(v.x, v.y, v.z)
    }

    /// ECEF position of a local point anchored at `base`.
    pub fn enu_to_ecef(&self, base: &Coord) -> Coord {
        if self.kind != CoordKind::Enu {
            return self.to_ecef();
        }
        let base_geo = base.to_geo();
        let origin = base_geo.to_ecef().as_vector();
        let rot = enu_rotation(base_geo.a * RADEG, base_geo.b * RADEG);
        let v = rot.transpose() * self.as_vector() + origin;
        Coord::ecef(v.x, v.y, v.z)
    }

    /// GEO position of a local point anchored at `base`.
    pub fn to_geo_from(&self, base: &Coord) -> Coord {
        self.enu_to_ecef(base).to_geo()
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CoordKind::Enu => write!(f, "[E={:.3}, N={:.3}, U={:.3}]", self.a, self.b, self.c),
            CoordKind::Geo => write!(
                f,
                "[lon={:.8}, lat={:.8}, h={:.3}]",
                self.a, self.b, self.c
            ),
            CoordKind::Ecef => write!(f, "[X={:.3}, Y={:.3}, Z={:.3}]", self.a, self.b, self.c),
        }
    }
}

/// Rotation from ECEF deltas to local (east, north, up) at `(lon, lat)` in radians.
fn enu_rotation(lon: Radian, lat: Radian) -> Matrix3<f64> {
    let (sl, cl) = lon.sin_cos();
    let (sp, cp) = lat.sin_cos();
    Matrix3::new(
        -sl,
        cl,
        0.0,
        -sp * cl,
        -sp * sl,
        cp,
        cp * cl,
        cp * sl,
        sp,
    )
}

fn geo_to_ecef(lon_deg: f64, lat_deg: f64, h: Meter) -> Coord {
    let (lon, lat) = (lon_deg * RADEG, lat_deg * RADEG);
    // prime vertical radius of curvature
    let n = EARTH_MAJOR_AXIS / (1.0 - EARTH_ECCENTRICITY_SQ * lat.sin().powi(2)).sqrt();
    Coord::ecef(
        (n + h) * lat.cos() * lon.cos(),
        (n + h) * lat.cos() * lon.sin(),
        ((1.0 - EARTH_ECCENTRICITY_SQ) * n + h) * lat.sin(),
    )
}

fn ecef_to_geo(x: Meter, y: Meter, z: Meter) -> Coord {
    let lon = y.atan2(x);
    let p = (x * x + y * y).sqrt();

    if p < 1e-9 {
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return Coord::geo(lon / RADEG, lat, z.abs() - EARTH_MINOR_AXIS);
    }

    let mut lat = z.atan2(p * (1.0 - EARTH_ECCENTRICITY_SQ));
    let mut h = 0.0;
    for _ in 0..25 {
        let n = EARTH_MAJOR_AXIS / (1.0 - EARTH_ECCENTRICITY_SQ * lat.sin().powi(2)).sqrt();
        h = p / lat.cos() - n;
        let next = z.atan2(p * (1.0 - EARTH_ECCENTRICITY_SQ * n / (n + h)));
        let converged = (next - lat).abs() < 1e-14;
        lat = next;
        if converged {
            break;
        }
    }
    Coord::geo(lon / RADEG, lat / RADEG, h)
}

fn haversine(p: &Coord, q: &Coord) -> Meter {
    let (lat1, lat2) = (p.b * RADEG, q.b * RADEG);
    let dlat = lat2 - lat1;
    let dlon = (q.a - p.a) * RADEG;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS * h.sqrt().min(1.0).asin()
}
