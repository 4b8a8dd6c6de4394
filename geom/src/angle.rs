use std::f64;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An angle, stored in radians.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn new_rads(rads: f64) -> Angle {
        // Retain more precision for angles than Pt2D has for points.
        Angle((rads * 10_000_000.0).round() / 10_000_000.0)
    }

    pub fn new_degs(degs: f64) -> Angle {
        Angle::new_rads(degs.to_radians())
    }

    pub fn opposite(self) -> Angle {
        Angle::new_rads(self.0 + f64::consts::PI)
    }

    pub fn normalized_radians(self) -> f64 {
        if self.0 < 0.0 {
            // TODO Be more careful about how we store the angle, to make sure this works
            self.0 + (2.0 * f64::consts::PI)
        } else {
            self.0
        }
    }

    pub fn normalized_degrees(self) -> f64 {
        self.normalized_radians().to_degrees()
    }

    /// The absolute smallest difference between two angles, in degrees, in [0, 180].
    pub fn simple_diff_degrees(self, other: Angle) -> f64 {
        let diff = (self.normalized_degrees() - other.normalized_degrees()).abs() % 360.0;
        if diff > 180.0 {
            360.0 - diff
        } else {
            diff
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_diff() {
        let a = Angle::new_degs(10.0);
        let b = Angle::new_degs(350.0);
        assert!((a.simple_diff_degrees(b) - 20.0).abs() < 1e-6);

        let a = Angle::new_degs(90.0);
        let b = Angle::new_degs(270.0);
        assert!((a.simple_diff_degrees(b) - 180.0).abs() < 1e-6);
    }
}
