use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Bounds, Distance, Pt2D, Ring};

/// A polygon with an outer boundary and zero or more holes. Rings don't cross each other or
/// themselves.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Polygon {
    outer: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(outer: Ring) -> Polygon {
        Polygon {
            outer,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(outer: Ring, holes: Vec<Ring>) -> Polygon {
        Polygon { outer, holes }
    }

    /// Build a rectangle with the bottom-left corner at (x1, y1).
    pub fn rectangle(x1: f64, y1: f64, width: f64, height: f64) -> Polygon {
        Polygon::new(Ring::must_new(vec![
            Pt2D::new(x1, y1),
            Pt2D::new(x1 + width, y1),
            Pt2D::new(x1 + width, y1 + height),
            Pt2D::new(x1, y1 + height),
            Pt2D::new(x1, y1),
        ]))
    }

    pub fn outer(&self) -> &Ring {
        &self.outer
    }

    pub fn holes(&self) -> &Vec<Ring> {
        &self.holes
    }

    /// The outer ring first, then any holes.
    pub fn all_rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Area of the outer ring minus the holes.
    pub fn area(&self) -> f64 {
        let mut area = self.outer.area();
        for hole in &self.holes {
            area -= hole.area();
        }
        area
    }

    /// Even-odd containment; holes count as exterior. Points exactly on the boundary may resolve
    /// either way.
    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        let mut inside = false;
        for ring in self.all_rings() {
            let pts = ring.points();
            for pair in pts.windows(2) {
                let (x1, y1) = (pair[0].x(), pair[0].y());
                let (x2, y2) = (pair[1].x(), pair[1].y());
                if (y1 > pt.y()) != (y2 > pt.y()) {
                    let x_cross = x1 + (pt.y() - y1) / (y2 - y1) * (x2 - x1);
                    if pt.x() < x_cross {
                        inside = !inside;
                    }
                }
            }
        }
        inside
    }

    /// The smallest distance from the query point to any ring of the polygon.
    pub fn dist_to_boundary(&self, pt: Pt2D) -> Distance {
        self.all_rings().map(|r| r.dist_to_pt(pt)).min().unwrap()
    }

    /// Check the rings are well-formed: no ring crosses itself. (Rings being closed and free of
    /// repeated points is enforced by `Ring::new`.)
    pub fn check_valid(&self) -> Result<()> {
        for (idx, ring) in self.all_rings().enumerate() {
            if ring.is_self_intersecting() {
                bail!("ring {} of the polygon is self-intersecting", idx);
            }
        }
        Ok(())
    }

    pub fn get_bounds(&self) -> Bounds {
        self.outer.get_bounds()
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Polygon with {} holes, outer = {}",
            self.holes.len(),
            self.outer
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donut() -> Polygon {
        Polygon::with_holes(
            Ring::must_new(vec![
                Pt2D::new(0.0, 0.0),
                Pt2D::new(20.0, 0.0),
                Pt2D::new(20.0, 20.0),
                Pt2D::new(0.0, 20.0),
                Pt2D::new(0.0, 0.0),
            ]),
            vec![Ring::must_new(vec![
                Pt2D::new(5.0, 5.0),
                Pt2D::new(15.0, 5.0),
                Pt2D::new(15.0, 15.0),
                Pt2D::new(5.0, 15.0),
                Pt2D::new(5.0, 5.0),
            ])],
        )
    }

    #[test]
    fn contains_with_holes() {
        let poly = donut();
        // In the ring of the donut
        assert!(poly.contains_pt(Pt2D::new(2.5, 10.0)));
        // In the hole
        assert!(!poly.contains_pt(Pt2D::new(10.0, 10.0)));
        // Outside entirely
        assert!(!poly.contains_pt(Pt2D::new(25.0, 10.0)));
    }

    #[test]
    fn area_subtracts_holes() {
        assert_eq!(donut().area(), 400.0 - 100.0);
    }

    #[test]
    fn boundary_distance() {
        let poly = donut();
        // Closest ring is the hole
        assert_eq!(
            poly.dist_to_boundary(Pt2D::new(10.0, 4.0)),
            Distance::meters(1.0)
        );
    }
}
