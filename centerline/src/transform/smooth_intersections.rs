//! Straightens the approach geometry into junctions. Voronoi centerlines wobble where roads
//! widen into an intersection; replacing the last few nearly-collinear vertices with a chord
//! makes edges meet the junction cleanly without moving anything far from the original shape.

use geom::{Line, Pt2D};

use crate::config::Config;
use crate::graph::Graph;

pub fn smooth(config: &Config, graph: &Graph) -> Graph {
    let mut result = Graph::new();
    let mut smoothed_ends = 0;
    for id in graph.edge_ids() {
        let edge = graph.edge(id);
        let mut pts = edge.pl.points().clone();

        if graph.degree(edge.n1) >= 3 && smooth_end(&mut pts, config) {
            smoothed_ends += 1;
        }
        if graph.degree(edge.n2) >= 3 {
            pts.reverse();
            let did = smooth_end(&mut pts, config);
            pts.reverse();
            if did {
                smoothed_ends += 1;
            }
        }

        let pl = match geom::PolyLine::new(pts) {
            Ok(pl) => pl,
            Err(_) => edge.pl.clone(),
        };
        let n1 = result.get_or_create_node(graph.node(edge.n1).pt, graph.node(edge.n1).radius);
        let n2 = result.get_or_create_node(graph.node(edge.n2).pt, graph.node(edge.n2).radius);
        result
            .add_edge(n1, n2, pl, edge.min_radius, edge.mean_radius, edge.source)
            .unwrap();
    }
    info!("smoothed {} junction approaches", smoothed_ends);
    result
}

/// If the first `smoothing_window` vertices barely deviate from the chord (junction to vertex K),
/// cut them out. The junction end is pts[0].
fn smooth_end(pts: &mut Vec<Pt2D>, config: &Config) -> bool {
    let interior = pts.len().saturating_sub(2);
    if interior == 0 {
        return false;
    }
    let k = config.smoothing_window.min(interior);
    if k < 2 {
        // One interior vertex means the "window" is a single segment; nothing to straighten.
        return false;
    }
    let chord = match Line::new(pts[0], pts[k]) {
        Some(l) => l,
        None => {
            return false;
        }
    };
    if (1..k).all(|i| chord.dist_to_pt(pts[i]) < config.smoothing_tolerance) {
        pts.drain(1..k);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PolygonId;
    use geom::{Distance, PolyLine};

    fn junction_graph(approach: Vec<(f64, f64)>) -> Graph {
        let mut g = Graph::new();
        let mut add = |pts: Vec<(f64, f64)>| {
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
        };
        // Three branches make (0, 0) a junction
        add(vec![(0.0, 0.0), (-10.0, 5.0)]);
        add(vec![(0.0, 0.0), (-10.0, -5.0)]);
        add(approach);
        g
    }

    #[test]
    fn wobbly_approach_straightened() {
        let g = junction_graph(vec![
            (0.0, 0.0),
            (1.0, 0.1),
            (2.0, -0.1),
            (3.0, 0.05),
            (10.0, 0.0),
        ]);
        let smoothed = smooth(&Config::default(), &g);
        let junction = smoothed.find_node(Pt2D::new(0.0, 0.0)).unwrap();
        let e = smoothed
            .node(junction)
            .edges()
            .iter()
            .copied()
            .find(|e| smoothed.edge(*e).length() > Distance::meters(8.0))
            .unwrap();
        // Vertices 1 and 2 are gone; the chord runs straight to vertex 3
        assert_eq!(smoothed.edge(e).pl.points().len(), 3);
        assert_eq!(smoothed.edge(e).pl.points()[1], Pt2D::new(3.0, 0.05));
    }

    #[test]
    fn sharp_approach_left_alone() {
        let g = junction_graph(vec![
            (0.0, 0.0),
            (1.0, 1.0),
            (2.0, -1.0),
            (3.0, 0.0),
            (10.0, 0.0),
        ]);
        let smoothed = smooth(&Config::default(), &g);
        let junction = smoothed.find_node(Pt2D::new(0.0, 0.0)).unwrap();
        let e = smoothed
            .node(junction)
            .edges()
            .iter()
            .copied()
            .find(|e| smoothed.edge(*e).length() > Distance::meters(8.0))
            .unwrap();
        assert_eq!(smoothed.edge(e).pl.points().len(), 5);
    }
}
