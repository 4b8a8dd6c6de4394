use std::collections::HashSet;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Bounds, Distance, Line, Pt2D};

/// Maybe a misnomer, but like a PolyLine, but closed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ring {
    // first equals last
    pts: Vec<Pt2D>,
}

impl Ring {
    pub fn new(pts: Vec<Pt2D>) -> Result<Ring> {
        if pts.len() < 4 {
            bail!("Can't make a ring with fewer than four points");
        }
        if pts[0] != *pts.last().unwrap() {
            bail!("Can't make a ring with mismatching first/last points");
        }

        if pts.windows(2).any(|pair| pair[0] == pair[1]) {
            bail!("Ring has ~dupe adjacent pts");
        }

        let result = Ring { pts };

        let mut seen_pts = HashSet::new();
        for pt in result.pts.iter().skip(1) {
            if !seen_pts.insert(pt.to_hashable()) {
                bail!("Ring has repeat non-adjacent points");
            }
        }

        Ok(result)
    }

    pub fn must_new(pts: Vec<Pt2D>) -> Ring {
        Ring::new(pts).unwrap()
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.pts
    }

    /// The segments of the ring, in order.
    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.pts
            .windows(2)
            .map(|pair| Line::must_new(pair[0], pair[1]))
    }

    pub fn perimeter(&self) -> Distance {
        self.lines().map(|l| l.length()).sum()
    }

    /// Twice the signed area enclosed by the ring (shoelace formula). Positive for
    /// counter-clockwise winding.
    pub fn doubled_signed_area(&self) -> f64 {
        let mut sum = 0.0;
        for pair in self.pts.windows(2) {
            sum += pair[0].x() * pair[1].y() - pair[1].x() * pair[0].y();
        }
        sum
    }

    pub fn area(&self) -> f64 {
        (self.doubled_signed_area() / 2.0).abs()
    }

    /// Resample the ring so that consecutive points are at most `max_step` apart. The closing
    /// duplicate point is not repeated in the result.
    pub fn densify(&self, max_step: Distance) -> Vec<Pt2D> {
        let mut result = Vec::new();
        for l in self.lines() {
            result.push(l.pt1());
            let len = l.length();
            if len > max_step {
                let pieces = (len / max_step).ceil();
                for i in 1..(pieces as usize) {
                    result.push(l.percent_along((i as f64) / pieces));
                }
            }
        }
        result
    }

    /// The smallest distance from the query point to the ring's boundary.
    pub fn dist_to_pt(&self, pt: Pt2D) -> Distance {
        self.lines().map(|l| l.dist_to_pt(pt)).min().unwrap()
    }

    /// True if any two non-adjacent segments of the ring cross. Quadratic; meant for input
    /// validation, not hot loops.
    pub fn is_self_intersecting(&self) -> bool {
        let lines: Vec<Line> = self.lines().collect();
        let n = lines.len();
        for i in 0..n {
            for j in (i + 2)..n {
                // The last segment is adjacent to the first
                if i == 0 && j == n - 1 {
                    continue;
                }
                if lines[i].intersection(&lines[j]).is_some() {
                    return true;
                }
            }
        }
        false
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.pts)
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Ring::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Ring {
        Ring::must_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(10.0, 10.0),
            Pt2D::new(0.0, 10.0),
            Pt2D::new(0.0, 0.0),
        ])
    }

    #[test]
    fn area_and_perimeter() {
        let r = square();
        assert_eq!(r.area(), 100.0);
        assert_eq!(r.perimeter(), Distance::meters(40.0));
    }

    #[test]
    fn densify_spacing() {
        let pts = square().densify(Distance::meters(0.5));
        assert_eq!(pts.len(), 80);
        for pair in pts.windows(2) {
            assert!(pair[0].dist_to(pair[1]) <= Distance::meters(0.5001));
        }
    }

    #[test]
    fn self_intersection() {
        assert!(!square().is_self_intersecting());
        // A bowtie
        let bowtie = Ring::must_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(10.0, 10.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(0.0, 10.0),
            Pt2D::new(0.0, 0.0),
        ]);
        assert!(bowtie.is_self_intersecting());
    }
}
