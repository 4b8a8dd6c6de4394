//! Final vertex-count reduction. Douglas-Peucker per edge, with two hard guarantees on top: the
//! simplified network stays planar, and no edge strays from its original shape by more than
//! `simplify_max_hausdorff`.

use std::collections::BTreeMap;

use aabb_quadtree::QuadTree;

use geom::{Bounds, Distance, PolyLine};

use crate::graph::{EdgeId, Graph};
use crate::pipeline::PipelineContext;
use crate::transform::merge_intersections::collapse_short_edges;
use crate::transform::planarize::polylines_conflict;

/// Simplification retries halve the tolerance down to here, then give up on the edge.
const MIN_TOLERANCE: Distance = Distance::const_meters(0.05);

pub fn simplify(ctx: &PipelineContext, graph: &Graph) -> Graph {
    let g = graph.compact();
    let ids = g.edge_ids();
    if ids.is_empty() {
        return g;
    }
    let snap = ctx.config.snap_tolerance;

    let mut bounds = Bounds::new();
    for id in &ids {
        bounds.union(g.edge(*id).pl.get_bounds());
    }
    let mut quadtree: QuadTree<EdgeId> =
        QuadTree::default(bounds.pad(Distance::meters(1.0)).as_bbox());
    for id in &ids {
        quadtree.insert_with_box(
            *id,
            g.edge(*id).pl.get_bounds().pad(Distance::meters(0.1)).as_bbox(),
        );
    }

    // Edges are simplified one at a time against the evolving set, so an accepted result can
    // never cross an earlier one.
    let mut current: BTreeMap<EdgeId, PolyLine> = ids
        .iter()
        .map(|id| (*id, g.edge(*id).pl.clone()))
        .collect();

    let mut simplified_edges = 0;
    let mut skipped = 0;
    for id in &ids {
        let original = &g.edge(*id).pl;
        if original.points().len() <= 2 {
            continue;
        }

        let mut tolerance = ctx.config.simplify_tolerance;
        let accepted = loop {
            let candidate = original.simplify(tolerance.inner_meters());
            if candidate.points().len() == original.points().len() {
                break Some(candidate);
            }
            let within_shape_bound =
                original.max_vertex_dist_to(&candidate) <= ctx.config.simplify_max_hausdorff;
            if within_shape_bound && !crosses_anything(&quadtree, &current, *id, &candidate, snap)
            {
                break Some(candidate);
            }
            tolerance = tolerance / 2.0;
            if tolerance < MIN_TOLERANCE {
                break None;
            }
        };
        match accepted {
            Some(pl) => {
                if pl.points().len() < original.points().len() {
                    simplified_edges += 1;
                }
                current.insert(*id, pl);
            }
            None => {
                skipped += 1;
            }
        }
    }
    info!(
        "simplified {} edges ({} skipped to preserve planarity)",
        simplified_edges, skipped
    );

    let mut result = Graph::new();
    for id in &ids {
        let edge = g.edge(*id);
        let n1 = result.get_or_create_node(g.node(edge.n1).pt, g.node(edge.n1).radius);
        let n2 = result.get_or_create_node(g.node(edge.n2).pt, g.node(edge.n2).radius);
        result
            .add_edge(
                n1,
                n2,
                current.remove(id).unwrap(),
                edge.min_radius,
                edge.mean_radius,
                edge.source,
            )
            .unwrap();
    }
    // Straightening can only shrink an edge; sweep anything now under the length floor.
    collapse_short_edges(&mut result, ctx.config.min_edge_length);
    result.compact()
}

fn crosses_anything(
    quadtree: &QuadTree<EdgeId>,
    current: &BTreeMap<EdgeId, PolyLine>,
    id: EdgeId,
    candidate: &PolyLine,
    snap: Distance,
) -> bool {
    let mut others: Vec<EdgeId> = Vec::new();
    for (other, _, _) in
        quadtree.query(candidate.get_bounds().pad(Distance::meters(0.1)).as_bbox())
    {
        if *other != id {
            others.push(*other);
        }
    }
    others.sort();
    others.dedup();
    others
        .into_iter()
        .any(|other| polylines_conflict(candidate, &current[&other], snap).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::PolygonId;
    use crate::io::{InputPolygon, PolygonLayer};
    use geom::{Polygon, Pt2D};

    fn ctx() -> PipelineContext {
        let layer = PolygonLayer {
            polygons: vec![InputPolygon {
                id: PolygonId(0),
                polygon: Polygon::rectangle(-10.0, -10.0, 60.0, 30.0),
            }],
            crs: "EPSG:32633".to_string(),
        };
        PipelineContext::new(Config::default(), layer).unwrap()
    }

    fn add(g: &mut Graph, pts: Vec<(f64, f64)>) {
        let pts: Vec<Pt2D> = pts.into_iter().map(|(x, y)| Pt2D::new(x, y)).collect();
        let n1 = g.get_or_create_node(pts[0], Distance::meters(2.0));
        let n2 = g.get_or_create_node(*pts.last().unwrap(), Distance::meters(2.0));
        g.add_edge(
            n1,
            n2,
            PolyLine::must_new(pts),
            Distance::meters(2.0),
            Distance::meters(2.0),
            PolygonId(0),
        )
        .unwrap();
    }

    #[test]
    fn wobble_flattened_within_bound() {
        let ctx = ctx();
        let mut g = Graph::new();
        add(
            &mut g,
            vec![
                (0.0, 0.0),
                (5.0, 0.2),
                (10.0, -0.2),
                (15.0, 0.1),
                (20.0, 0.0),
            ],
        );
        let out = simplify(&ctx, &g);
        let e = out.edge(out.edge_ids()[0]);
        assert_eq!(e.pl.points().len(), 2);
        assert!(
            g.edge(g.edge_ids()[0])
                .pl
                .max_vertex_dist_to(&e.pl)
                <= ctx.config.simplify_max_hausdorff
        );
    }

    #[test]
    fn crossing_blocked() {
        let ctx = ctx();
        let mut g = Graph::new();
        // A gently bowed edge, and a dangling edge whose tip pokes into the gap between the bow
        // and its chord. Flattening the bow to the chord would cross the dangler.
        add(
            &mut g,
            vec![(0.0, 0.0), (5.0, 0.3), (10.0, 0.3), (15.0, 0.0)],
        );
        add(&mut g, vec![(7.5, 0.15), (7.5, -5.0)]);
        let out = simplify(&ctx, &g);
        // The bow can lose a vertex at a reduced tolerance, but never flatten to the chord that
        // would cut through the neighbor
        let bow = out.edge(out.edge_ids()[0]);
        assert!(bow.pl.points().len() > 2);
        for id in out.edge_ids() {
            for other in out.edge_ids() {
                if other.0 > id.0 {
                    assert!(polylines_conflict(
                        &out.edge(id).pl,
                        &out.edge(other).pl,
                        ctx.config.snap_tolerance
                    )
                    .is_none());
                }
            }
        }
    }

    #[test]
    fn endpoints_never_move() {
        let ctx = ctx();
        let mut g = Graph::new();
        add(&mut g, vec![(0.0, 0.0), (3.0, 0.3), (7.0, 0.0)]);
        let out = simplify(&ctx, &g);
        let e = out.edge(out.edge_ids()[0]);
        assert_eq!(e.pl.first_pt(), Pt2D::new(0.0, 0.0));
        assert_eq!(e.pl.last_pt(), Pt2D::new(7.0, 0.0));
    }
}
