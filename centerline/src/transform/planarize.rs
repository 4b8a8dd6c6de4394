//! Splits every geometric edge crossing into a shared node. After this stage, two distinct edges
//! only ever touch at endpoint nodes.

use std::collections::BTreeMap;

use aabb_quadtree::QuadTree;
use anyhow::Result;

use geom::{Bounds, Distance, PolyLine, Pt2D};

use crate::graph::{EdgeId, Graph};
use crate::pipeline::PipelineContext;

pub fn planarize(ctx: &PipelineContext, graph: &Graph) -> Result<Graph> {
    let ids = graph.edge_ids();
    if ids.is_empty() {
        return Ok(graph.compact());
    }
    let snap = ctx.config.snap_tolerance;

    let mut bounds = Bounds::new();
    for id in &ids {
        bounds.union(graph.edge(*id).pl.get_bounds());
    }
    let mut quadtree: QuadTree<EdgeId> = QuadTree::default(bounds.pad(Distance::meters(1.0)).as_bbox());
    for id in &ids {
        quadtree.insert_with_box(
            *id,
            graph.edge(*id).pl.get_bounds().pad(Distance::meters(0.1)).as_bbox(),
        );
    }

    // Gather split points per edge, as (distance along the edge, exact point). Both halves of a
    // crossing get the same Pt2D, so the rebuilt endpoints unify into one node.
    let mut splits: BTreeMap<EdgeId, Vec<(Distance, Pt2D)>> = BTreeMap::new();
    for a in &ids {
        let a_pl = &graph.edge(*a).pl;
        let mut candidates: Vec<EdgeId> = Vec::new();
        for (b, _, _) in quadtree.query(a_pl.get_bounds().pad(Distance::meters(0.1)).as_bbox()) {
            if b.0 > a.0 {
                candidates.push(*b);
            }
        }
        candidates.sort();
        candidates.dedup();

        for b in candidates {
            let b_pl = &graph.edge(b).pl;

            // Proper crossings
            let mut base_a = Distance::ZERO;
            for la in a_pl.lines() {
                let mut base_b = Distance::ZERO;
                for lb in b_pl.lines() {
                    if let Some(hit) = la.intersection(&lb) {
                        if let Some(d) = la.dist_along_of_point(hit) {
                            record_split(&mut splits, *a, a_pl, base_a + d, hit, snap);
                        }
                        if let Some(d) = lb.dist_along_of_point(hit) {
                            record_split(&mut splits, b, b_pl, base_b + d, hit, snap);
                        }
                    }
                    base_b += lb.length();
                }
                base_a += la.length();
            }

            // T-touches: an endpoint of one edge resting on the other's interior. The strict
            // crossing test can't see these (the segments are collinear at the touch).
            for pt in [a_pl.first_pt(), a_pl.last_pt()] {
                if let Some(d) = dist_along_polyline(b_pl, pt, snap) {
                    record_split(&mut splits, b, b_pl, d, pt, snap);
                }
            }
            for pt in [b_pl.first_pt(), b_pl.last_pt()] {
                if let Some(d) = dist_along_polyline(a_pl, pt, snap) {
                    record_split(&mut splits, *a, a_pl, d, pt, snap);
                }
            }
        }
    }

    // Rebuild, cutting each edge at its split points.
    let mut result = Graph::new();
    let mut new_nodes = 0;
    for id in &ids {
        let edge = graph.edge(*id);
        let mut cuts = splits.remove(id).unwrap_or_default();
        cuts.sort_by_key(|(d, _)| *d);
        cuts.dedup_by(|a, b| a.1.approx_eq(b.1, snap));
        if !cuts.is_empty() {
            new_nodes += cuts.len();
        }
        for piece in cut_polyline(&edge.pl, &cuts) {
            let radii: Vec<Distance> = piece.points().iter().map(|pt| ctx.radius_at(*pt)).collect();
            let min_radius = radii.iter().copied().min().unwrap();
            let mean_radius = radii.iter().copied().sum::<Distance>() / (radii.len() as f64);
            result.add_edge_from_geometry(
                piece,
                |pt| ctx.radius_at(pt),
                min_radius,
                mean_radius,
                edge.source,
            )?;
        }
    }
    info!("planarized: {} intersection nodes introduced", new_nodes);
    Ok(result)
}

/// Ignore splits that would land on (or nearly on) the edge's own endpoints.
fn record_split(
    splits: &mut BTreeMap<EdgeId, Vec<(Distance, Pt2D)>>,
    id: EdgeId,
    pl: &PolyLine,
    dist: Distance,
    pt: Pt2D,
    snap: Distance,
) {
    if pt.approx_eq(pl.first_pt(), snap) || pt.approx_eq(pl.last_pt(), snap) {
        return;
    }
    splits.entry(id).or_default().push((dist, pt));
}

/// If `pt` sits on the polyline's interior (within `snap`), the distance along to reach it.
fn dist_along_polyline(pl: &PolyLine, pt: Pt2D, snap: Distance) -> Option<Distance> {
    if pt.approx_eq(pl.first_pt(), snap) || pt.approx_eq(pl.last_pt(), snap) {
        return None;
    }
    let mut base = Distance::ZERO;
    for l in pl.lines() {
        if l.dist_to_pt(pt) <= snap {
            let d = l.pt1().dist_to(pt);
            return Some(base + d);
        }
        base += l.length();
    }
    None
}

/// Cut a polyline at the given (sorted) points, yielding the pieces in order. Degenerate pieces
/// are dropped.
fn cut_polyline(pl: &PolyLine, cuts: &[(Distance, Pt2D)]) -> Vec<PolyLine> {
    if cuts.is_empty() {
        return vec![pl.clone()];
    }
    let mut raw_pieces: Vec<Vec<Pt2D>> = Vec::new();
    let mut current: Vec<Pt2D> = vec![pl.first_pt()];
    let mut cut_iter = cuts.iter().peekable();
    let mut base = Distance::ZERO;
    for l in pl.lines() {
        let seg_len = l.length();
        while let Some((d, pt)) = cut_iter.peek() {
            if *d <= base + seg_len {
                current.push(*pt);
                raw_pieces.push(std::mem::replace(&mut current, vec![*pt]));
                cut_iter.next();
            } else {
                break;
            }
        }
        current.push(l.pt2());
        base += seg_len;
    }
    raw_pieces.push(current);

    raw_pieces
        .into_iter()
        .filter_map(|pts| PolyLine::new(pts).ok())
        .collect()
}

/// Do two polylines touch anywhere besides a shared endpoint? Used both to verify the planarity
/// invariant and to reject simplifications that would break it.
pub fn polylines_conflict(a: &PolyLine, b: &PolyLine, snap: Distance) -> Option<Pt2D> {
    // Proper crossings
    for la in a.lines() {
        for lb in b.lines() {
            if let Some(hit) = la.intersection(&lb) {
                let shared = [a.first_pt(), a.last_pt()]
                    .iter()
                    .any(|pt| hit.approx_eq(*pt, snap))
                    && [b.first_pt(), b.last_pt()]
                        .iter()
                        .any(|pt| hit.approx_eq(*pt, snap));
                if !shared {
                    return Some(hit);
                }
            }
        }
    }
    // Foreign endpoint resting on an interior
    for pt in [b.first_pt(), b.last_pt()] {
        if dist_along_polyline(a, pt, snap).is_some() {
            return Some(pt);
        }
    }
    for pt in [a.first_pt(), a.last_pt()] {
        if dist_along_polyline(b, pt, snap).is_some() {
            return Some(pt);
        }
    }
    None
}

/// Check the planarity invariant over the whole graph.
pub fn verify_planar(graph: &Graph, snap: Distance) -> Result<()> {
    let ids = graph.edge_ids();
    if ids.is_empty() {
        return Ok(());
    }
    let mut bounds = Bounds::new();
    for id in &ids {
        bounds.union(graph.edge(*id).pl.get_bounds());
    }
    let mut quadtree: QuadTree<EdgeId> = QuadTree::default(bounds.pad(Distance::meters(1.0)).as_bbox());
    for id in &ids {
        quadtree.insert_with_box(
            *id,
            graph.edge(*id).pl.get_bounds().pad(Distance::meters(0.1)).as_bbox(),
        );
    }
    for a in &ids {
        let a_pl = &graph.edge(*a).pl;
        let mut candidates: Vec<EdgeId> = Vec::new();
        for (b, _, _) in quadtree.query(a_pl.get_bounds().pad(Distance::meters(0.1)).as_bbox()) {
            if b.0 > a.0 {
                candidates.push(*b);
            }
        }
        candidates.sort();
        candidates.dedup();
        for b in candidates {
            if let Some(hit) = polylines_conflict(a_pl, &graph.edge(b).pl, snap) {
                bail!("{} and {} touch away from a shared endpoint, at {}", a, b, hit);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_in_the_middle() {
        let pl = PolyLine::must_new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 0.0)]);
        let pieces = cut_polyline(
            &pl,
            &[(Distance::meters(4.0), Pt2D::new(4.0, 0.0))],
        );
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].last_pt(), Pt2D::new(4.0, 0.0));
        assert_eq!(pieces[1].first_pt(), Pt2D::new(4.0, 0.0));
    }

    #[test]
    fn cut_at_existing_vertex() {
        let pl = PolyLine::must_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(5.0, 0.0),
            Pt2D::new(10.0, 0.0),
        ]);
        let pieces = cut_polyline(
            &pl,
            &[(Distance::meters(5.0), Pt2D::new(5.0, 0.0))],
        );
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].points().len(), 2);
        assert_eq!(pieces[1].points().len(), 2);
    }

    #[test]
    fn conflict_detection() {
        let snap = Distance::const_meters(1e-6);
        let a = PolyLine::must_new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 0.0)]);
        let b = PolyLine::must_new(vec![Pt2D::new(5.0, -5.0), Pt2D::new(5.0, 5.0)]);
        assert!(polylines_conflict(&a, &b, snap).is_some());

        // Sharing an endpoint is fine
        let c = PolyLine::must_new(vec![Pt2D::new(10.0, 0.0), Pt2D::new(15.0, 5.0)]);
        assert!(polylines_conflict(&a, &c, snap).is_none());

        // An endpoint resting mid-polyline is not
        let d = PolyLine::must_new(vec![Pt2D::new(3.0, 0.0), Pt2D::new(3.0, 8.0)]);
        assert!(polylines_conflict(&a, &d, snap).is_some());
    }
}
