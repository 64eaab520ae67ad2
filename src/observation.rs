use std::fmt;

use crate::coords::Coord;
use crate::time::Timestamp;

/// A time-stamped position.
///
/// # Fields
///
/// * `position` - where the receiver was
/// * `timestamp` - when it was there
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub position: Coord,
    pub timestamp: Timestamp,
}

impl Observation {
    pub fn new(position: Coord, timestamp: Timestamp) -> Self {
        Observation {
            position,
            timestamp,
        }
    }

    /// Observation without meaningful time, stamped at the Unix epoch.
    pub fn untimed(position: Coord) -> Self {
        Observation {
            position,
            timestamp: Timestamp::zero(),
        }
    }

    pub fn distance_2d(&self, other: &Observation) -> f64 {
        self.position.distance_2d(&other.position)
    }

    pub fn distance_3d(&self, other: &Observation) -> f64 {
        self.position.distance_3d(&other.position)
    }

    /// Elapsed seconds from `other` to `self`.
    pub fn seconds_since(&self, other: &Observation) -> f64 {
        self.timestamp - other.timestamp
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp, self.position)
    }
}
