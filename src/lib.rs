pub mod comparison;
pub mod constants;
pub mod control;
pub mod coords;
pub mod io;
pub mod kernel;
pub mod kinematics;
pub mod observation;
pub mod operators;
pub mod query;
pub mod raster;
pub mod shapes;
pub mod simplification;
pub mod stochastics;
pub mod time;
pub mod track;
pub mod tracklib_errors;

#[cfg(feature = "progress")]
mod progress_bar;

pub use coords::{Coord, CoordKind};
pub use observation::Observation;
pub use time::{FormatContext, Timestamp};
pub use track::{Track, TrackCollection};
pub use tracklib_errors::{ErrorKind, TrackError};
