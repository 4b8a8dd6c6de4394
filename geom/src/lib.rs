//! A compact 2D geometry kernel for extracting road centerlines. Everything here represents
//! world-space in meters, in some projected coordinate system; there is no lon/lat anywhere.

#[macro_use]
extern crate anyhow;

mod angle;
mod bounds;
mod distance;
mod find_closest;
mod line;
mod polygon;
mod polyline;
mod pt;
mod ring;

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::distance::Distance;
pub use crate::find_closest::FindClosest;
pub use crate::line::{InfiniteLine, Line};
pub use crate::polygon::Polygon;
pub use crate::polyline::PolyLine;
pub use crate::pt::{HashablePt2D, Pt2D};
pub use crate::ring::Ring;

/// Below this, distances are considered equal to zero.
pub const EPSILON_DIST: Distance = Distance::const_meters(0.0001);

/// Reduce the precision of an f64 to 0.1mm. This makes point equality deterministic and
/// serialization idempotent.
pub fn trim_f64(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
