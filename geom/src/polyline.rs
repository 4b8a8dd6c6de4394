use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Bounds, Distance, Line, Pt2D, EPSILON_DIST};

/// An ordered sequence of at least two distinct points, with nonzero total length. The first and
/// last points are the endpoints; interior points are shape vertices.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PolyLine {
    pts: Vec<Pt2D>,
    length: Distance,
}

impl PolyLine {
    pub fn new(mut pts: Vec<Pt2D>) -> Result<PolyLine> {
        pts.dedup();
        if pts.len() < 2 {
            bail!("Need at least two points for a PolyLine");
        }
        let length = pts.windows(2).fold(Distance::ZERO, |so_far, pair| {
            so_far + pair[0].dist_to(pair[1])
        });
        if length <= EPSILON_DIST {
            bail!("PolyLine has ~zero length: {:?}", pts);
        }
        Ok(PolyLine { pts, length })
    }

    /// Equivalent to `PolyLine::new(pts).unwrap()`. Use this to effectively document an assertion
    /// at the call-site.
    pub fn must_new(pts: Vec<Pt2D>) -> PolyLine {
        PolyLine::new(pts).unwrap()
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.pts
    }

    pub fn into_points(self) -> Vec<Pt2D> {
        self.pts
    }

    pub fn length(&self) -> Distance {
        self.length
    }

    pub fn first_pt(&self) -> Pt2D {
        self.pts[0]
    }

    pub fn last_pt(&self) -> Pt2D {
        *self.pts.last().unwrap()
    }

    pub fn reversed(&self) -> PolyLine {
        let mut pts = self.pts.clone();
        pts.reverse();
        PolyLine::must_new(pts)
    }

    /// The individual segments of this polyline.
    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        self.pts
            .windows(2)
            .map(|pair| Line::must_new(pair[0], pair[1]))
    }

    /// Glue together two polylines in order. The last point of `self` must be the first point of
    /// `other`.
    pub fn extend(self, other: PolyLine) -> Result<PolyLine> {
        if self.last_pt() != other.first_pt() {
            bail!(
                "can't extend PolyLine; last pt is {}, other's first is {}",
                self.last_pt(),
                other.first_pt()
            );
        }
        let mut pts = self.pts;
        pts.extend(other.pts.into_iter().skip(1));
        PolyLine::new(pts)
    }

    /// A new polyline with the first point replaced. The result might collapse to fewer points.
    pub fn with_first_pt(&self, pt: Pt2D) -> Result<PolyLine> {
        let mut pts = self.pts.clone();
        pts[0] = pt;
        PolyLine::new(pts)
    }

    /// A new polyline with the last point replaced.
    pub fn with_last_pt(&self, pt: Pt2D) -> Result<PolyLine> {
        let mut pts = self.pts.clone();
        *pts.last_mut().unwrap() = pt;
        PolyLine::new(pts)
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.pts)
    }

    /// The smallest distance from the query point to any point on this polyline.
    pub fn dist_to_pt(&self, pt: Pt2D) -> Distance {
        self.lines()
            .map(|l| l.dist_to_pt(pt))
            .min()
            .unwrap_or_else(|| self.first_pt().dist_to(pt))
    }

    /// The largest distance from any vertex of this polyline to the other polyline. When `other`
    /// keeps a subset of this polyline's vertices (Douglas-Peucker output), this is the Hausdorff
    /// distance between the two.
    pub fn max_vertex_dist_to(&self, other: &PolyLine) -> Distance {
        self.pts
            .iter()
            .map(|pt| other.dist_to_pt(*pt))
            .max()
            .unwrap_or(Distance::ZERO)
    }

    /// Ramer-Douglas-Peucker simplification. Endpoints never move; the result's vertices are a
    /// subset of the input's.
    pub fn simplify(&self, epsilon: f64) -> PolyLine {
        let pts = Pt2D::simplify_rdp(self.pts.clone(), epsilon);
        if pts.len() < 2 {
            return self.clone();
        }
        PolyLine::must_new(pts)
    }
}

impl fmt::Display for PolyLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "PolyLine::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}
