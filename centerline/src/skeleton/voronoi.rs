use anyhow::Result;
use boostvoronoi::builder::Builder;

use geom::{Bounds, Pt2D};

// boostvoronoi wants integer input coordinates. Sites are translated to the polygon's min corner
// and snapped to a 0.1mm grid, which matches Pt2D's resolution.
const SCALE: f64 = 10_000.0;

/// Computes the Voronoi diagram of the given point sites and returns the finite edges as straight
/// segments in world space. Infinite edges (rays separating hull-adjacent sites) never contribute
/// to an interior skeleton and are discarded here.
pub fn voronoi_segments(sites: &[Pt2D], bounds: &Bounds) -> Result<Vec<(Pt2D, Pt2D)>> {
    let x0 = bounds.min_x;
    let y0 = bounds.min_y;
    let input: Vec<boostvoronoi::geometry::Point<i32>> = sites
        .iter()
        .map(|pt| boostvoronoi::geometry::Point {
            x: ((pt.x() - x0) * SCALE).round() as i32,
            y: ((pt.y() - y0) * SCALE).round() as i32,
        })
        .collect();

    let mut vb = Builder::<i32, f64>::default();
    vb.with_vertices(input.iter())?;
    let diagram = vb.build()?;

    let mut result = Vec::new();
    for it in diagram.edges().iter() {
        let edge = it.get();
        let edge_id = edge.id();
        // Every edge shows up twice, as a twin pair; keep one representative.
        if let Ok(twin) = diagram.edge_get_twin(edge_id) {
            if twin.0 < edge_id.0 {
                continue;
            }
        }
        if !edge.is_primary() {
            continue;
        }
        if !diagram.edge_is_finite(edge_id).unwrap_or(false) {
            continue;
        }
        // With point sites, every finite primary edge is a straight segment between two diagram
        // vertices.
        let v0 = diagram.vertex_get(edge.vertex0().unwrap()).unwrap().get();
        let v1 = diagram
            .vertex_get(diagram.edge_get_vertex1(edge_id).unwrap().unwrap())
            .unwrap()
            .get();
        let pt1 = Pt2D::new(v0.x() / SCALE + x0, v0.y() / SCALE + y0);
        let pt2 = Pt2D::new(v1.x() / SCALE + x0, v1.y() / SCALE + y0);
        if pt1 != pt2 {
            result.push((pt1, pt2));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_rows_of_sites() {
        // Two horizontal rows of aligned points. The finite Voronoi edges include the midline
        // segments between the rows.
        let mut sites = Vec::new();
        for i in 0..21 {
            sites.push(Pt2D::new(i as f64, 0.0));
            sites.push(Pt2D::new(i as f64, 4.0));
        }
        let bounds = Bounds::from(&sites);
        let segments = voronoi_segments(&sites, &bounds).unwrap();
        assert!(!segments.is_empty());

        let on_midline = segments
            .iter()
            .filter(|(a, b)| (a.y() - 2.0).abs() < 0.01 && (b.y() - 2.0).abs() < 0.01)
            .count();
        assert!(on_midline >= 10, "only {} midline segments", on_midline);
    }
}
