//! Collapse degenerate pass-through nodes: a node of degree 2 adds nothing to the topology, so
//! its two edges become one edge whose polyline runs through the old node's position. Runs after
//! skeleton assembly (the raw Voronoi output is chopped at boundary-sampling granularity) and
//! again late in the pipeline (junction merging and fork cleaning leave pass-throughs behind).

use std::collections::BTreeSet;

use geom::Distance;

use crate::graph::{Graph, NodeId};

pub fn collapse(graph: &mut Graph) {
    let mut merged = 0;
    loop {
        let mut changed = false;
        for n in graph.node_ids() {
            if !graph.has_node(n) || graph.degree(n) != 2 {
                continue;
            }
            if collapse_node(graph, n) {
                merged += 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    graph.remove_isolated_nodes();
    info!("collapsed {} degree-2 nodes", merged);
}

fn collapse_node(graph: &mut Graph, n: NodeId) -> bool {
    let incident = graph.node(n).edges().clone();
    if incident.len() != 2 {
        // A single self-loop also reads as degree 2; leave it alone.
        return false;
    }
    let (r1, r2) = (incident[0], incident[1]);

    // Skip loops; they break. Easiest way to detect is to count distinct endpoints.
    let mut endpts = BTreeSet::new();
    endpts.insert(graph.edge(r1).n1);
    endpts.insert(graph.edge(r1).n2);
    endpts.insert(graph.edge(r2).n1);
    endpts.insert(graph.edge(r2).n2);
    if endpts.len() != 3 {
        return false;
    }

    let e1 = graph.remove_edge(r1);
    let e2 = graph.remove_edge(r2);

    // Four cases, easy to understand on paper. Orient both polylines away from n.
    let (pl, n1, n2) = if e1.n2 == n && e2.n1 == n {
        (e1.pl.clone().extend(e2.pl.clone()), e1.n1, e2.n2)
    } else if e1.n2 == n && e2.n2 == n {
        (e1.pl.clone().extend(e2.pl.reversed()), e1.n1, e2.n1)
    } else if e1.n1 == n && e2.n1 == n {
        (e1.pl.reversed().extend(e2.pl.clone()), e1.n2, e2.n2)
    } else {
        (e2.pl.clone().extend(e1.pl.clone()), e2.n1, e1.n2)
    };
    // The shared endpoint is n's exact position on both edges, so stitching can't fail.
    let pl = pl.unwrap();

    let (l1, l2) = (e1.pl.length(), e2.pl.length());
    let mean_radius = Distance::meters(
        (e1.mean_radius.inner_meters() * l1.inner_meters()
            + e2.mean_radius.inner_meters() * l2.inner_meters())
            / (l1 + l2).inner_meters(),
    );
    // Fragments from different polygons only meet where polygons touch; keep the longer side's
    // attribution, like keeping the longer road's way id.
    let source = if l1 >= l2 { e1.source } else { e2.source };

    graph
        .add_edge(n1, n2, pl, e1.min_radius.min(e2.min_radius), mean_radius, source)
        .unwrap();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PolygonId;
    use geom::{PolyLine, Pt2D};

    fn add(g: &mut Graph, pts: Vec<(f64, f64)>) {
        let pts: Vec<Pt2D> = pts.into_iter().map(|(x, y)| Pt2D::new(x, y)).collect();
        let n1 = g.get_or_create_node(pts[0], Distance::meters(1.0));
        let n2 = g.get_or_create_node(*pts.last().unwrap(), Distance::meters(1.0));
        g.add_edge(
            n1,
            n2,
            PolyLine::must_new(pts),
            Distance::meters(1.0),
            Distance::meters(1.0),
            PolygonId(0),
        )
        .unwrap();
    }

    #[test]
    fn chain_becomes_one_edge() {
        let mut g = Graph::new();
        add(&mut g, vec![(0.0, 0.0), (1.0, 0.0)]);
        add(&mut g, vec![(1.0, 0.0), (2.0, 0.0)]);
        add(&mut g, vec![(2.0, 0.0), (3.0, 1.0)]);

        collapse(&mut g);
        let g = g.compact();
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.num_nodes(), 2);
        let e = g.edge(g.edge_ids()[0]);
        assert_eq!(e.pl.points().len(), 4);
        assert!(g.check_invariants(None).is_ok());
    }

    #[test]
    fn junctions_are_kept() {
        let mut g = Graph::new();
        add(&mut g, vec![(0.0, 0.0), (5.0, 0.0)]);
        add(&mut g, vec![(5.0, 0.0), (10.0, 0.0)]);
        add(&mut g, vec![(5.0, 0.0), (5.0, 5.0)]);
        add(&mut g, vec![(5.0, 5.0), (5.0, 10.0)]);

        collapse(&mut g);
        let g = g.compact();
        // The branch chain merges, but the degree-3 node survives
        assert_eq!(g.num_edges(), 3);
        let junction = g.find_node(Pt2D::new(5.0, 0.0)).unwrap();
        assert_eq!(g.degree(junction), 3);
    }

    #[test]
    fn two_edge_cycle_untouched() {
        let mut g = Graph::new();
        add(&mut g, vec![(0.0, 0.0), (5.0, 1.0), (10.0, 0.0)]);
        add(&mut g, vec![(0.0, 0.0), (5.0, -1.0), (10.0, 0.0)]);

        collapse(&mut g);
        assert_eq!(g.num_edges(), 2);
    }
}
