//! Turns one road polygon into a pruned medial skeleton: densify the boundary, build a Voronoi
//! diagram over the boundary points, keep the finite edges that fall inside the polygon, annotate
//! them with clearance radii, then prune the Voronoi artifacts away.

mod prune;
mod voronoi;

use anyhow::Result;

use geom::{Distance, FindClosest, Line, PolyLine, Polygon, Pt2D, EPSILON_DIST};

use crate::config::Config;
use crate::error::PipelineError;
use crate::graph::{Graph, PolygonId};
use crate::transform::collapse_degree_two;
use crate::transform::merge_intersections::collapse_short_edges;

/// Nodes grazing the boundary get a floor on their radius, so ratio tests stay meaningful.
pub const MIN_NODE_RADIUS: Distance = Distance::const_meters(0.1);

/// How far away a boundary can be before we stop caring about the exact distance. Road polygons
/// top out around 40m of width, so 20m of clearance; this leaves slack.
const MAX_RADIUS_QUERY: Distance = Distance::const_meters(100.0);

/// Distance from a point to the polygon's boundary (any ring), floored at `MIN_NODE_RADIUS`.
pub struct BoundaryIndex {
    closest: FindClosest<usize>,
}

impl BoundaryIndex {
    pub fn new(polygon: &Polygon) -> BoundaryIndex {
        let mut closest = FindClosest::new(&polygon.get_bounds().pad(MAX_RADIUS_QUERY));
        for (idx, ring) in polygon.all_rings().enumerate() {
            closest.add(idx, ring.points());
        }
        BoundaryIndex { closest }
    }

    pub fn dist_to_boundary(&self, pt: Pt2D) -> Distance {
        self.closest
            .closest_dist(pt, MAX_RADIUS_QUERY)
            .unwrap_or(MAX_RADIUS_QUERY)
    }

    pub fn radius_at(&self, pt: Pt2D) -> Distance {
        self.dist_to_boundary(pt).max(MIN_NODE_RADIUS)
    }
}

/// The raw medial skeleton of one polygon, pruned and collapsed to maximal polyline edges.
///
/// An empty graph is a valid result (tiny polygon, or everything pruned away). A Voronoi failure
/// surfaces as `NumericDegenerate`; the pipeline driver degrades it to an empty skeleton so one
/// bad polygon never poisons the batch.
pub fn skeletonize(
    config: &Config,
    id: PolygonId,
    polygon: &Polygon,
) -> Result<Graph, PipelineError> {
    let area = polygon.area();
    if area < config.min_polygon_area {
        warn!(
            "skipping {}: area {:.2} m^2 is below min_polygon_area",
            id, area
        );
        return Ok(Graph::new());
    }

    let mut sites: Vec<Pt2D> = Vec::new();
    for ring in polygon.all_rings() {
        sites.extend(ring.densify(config.segmentize_max_length));
    }

    let segments = match voronoi::voronoi_segments(&sites, &polygon.get_bounds()) {
        Ok(segments) => segments,
        Err(err) => {
            return Err(PipelineError::NumericDegenerate {
                polygon: id,
                message: err.to_string(),
            });
        }
    };

    let boundary = BoundaryIndex::new(polygon);

    let mut graph = Graph::new();
    // Near-degenerate Voronoi vertices trim onto the same 0.1mm grid point, which would turn
    // their edges into exact duplicates; keep one of each.
    let mut seen_segments = std::collections::BTreeSet::new();
    for (pt1, pt2) in segments {
        for (a, b) in clip_to_interior(polygon, pt1, pt2) {
            let mut key = (a.to_hashable(), b.to_hashable());
            if key.1 < key.0 {
                key = (key.1, key.0);
            }
            if !seen_segments.insert(key) {
                continue;
            }
            let r1 = boundary.radius_at(a);
            let r2 = boundary.radius_at(b);
            let pl = match PolyLine::new(vec![a, b]) {
                Ok(pl) => pl,
                Err(_) => {
                    continue;
                }
            };
            graph
                .add_edge_from_geometry(
                    pl,
                    |pt| boundary.radius_at(pt),
                    r1.min(r2),
                    (r1 + r2) / 2.0,
                    id,
                )
                .map_err(|err| PipelineError::InvariantViolation {
                    stage: "skeleton".to_string(),
                    message: err.to_string(),
                })?;
        }
    }
    info!(
        "{}: raw skeleton has {} segments",
        id,
        graph.num_edges()
    );

    // Degenerate vertex clusters show up as sub-centimeter blobs that would fool the chain
    // walks; fold them into single nodes before pruning.
    collapse_short_edges(&mut graph, config.min_edge_length);

    let mut graph = prune::prune_skeleton(config, graph);

    // Stitch the chopped Voronoi pieces into proper polyline edges.
    collapse_degree_two::collapse(&mut graph);
    Ok(graph.compact())
}

/// Clips a segment to the polygon's interior, treating holes as exterior. One input segment can
/// come back as several disjoint pieces.
fn clip_to_interior(polygon: &Polygon, pt1: Pt2D, pt2: Pt2D) -> Vec<(Pt2D, Pt2D)> {
    let seg = match Line::new(pt1, pt2) {
        Some(l) => l,
        None => {
            return Vec::new();
        }
    };
    let len = seg.length();

    // Where does the segment cross a ring? 0 and 1 bracket the candidate intervals.
    let mut cuts: Vec<(f64, Pt2D)> = vec![(0.0, pt1), (1.0, pt2)];
    for ring in polygon.all_rings() {
        for boundary_line in ring.lines() {
            if let Some(hit) = seg.intersection(&boundary_line) {
                if let Some(dist) = seg.dist_along_of_point(hit) {
                    cuts.push((dist / len, hit));
                }
            }
        }
    }
    cuts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    cuts.dedup_by(|a, b| (a.0 - b.0).abs() < 1e-9);

    let mut result = Vec::new();
    for pair in cuts.windows(2) {
        let (t1, a) = pair[0];
        let (t2, b) = pair[1];
        if a.dist_to(b) <= EPSILON_DIST {
            continue;
        }
        let midpoint = seg.percent_along((t1 + t2) / 2.0);
        if polygon.contains_pt(midpoint) {
            result.push((a, b));
        }
    }
    result
}
