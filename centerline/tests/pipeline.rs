//! End-to-end runs over synthetic road polygons, checking the network's structure and the
//! universal invariants: endpoint coincidence, planarity, minimum edge length, containment,
//! determinism, and the terminal/shape bounds.

use centerline::{
    Config, Graph, InputPolygon, Pipeline, PipelineError, PipelineOutput, PolygonId, PolygonLayer,
};
use geom::{Distance, Polygon, Pt2D, Ring};

fn layer_of(polygons: Vec<Polygon>) -> PolygonLayer {
    PolygonLayer {
        polygons: polygons
            .into_iter()
            .enumerate()
            .map(|(idx, polygon)| InputPolygon {
                id: PolygonId(idx),
                polygon,
            })
            .collect(),
        crs: "EPSG:32633".to_string(),
    }
}

fn run(layer: PolygonLayer) -> PipelineOutput {
    Pipeline::new(Config::default())
        .unwrap()
        .run(layer, &|| false, None)
        .unwrap()
}

/// Every point of every final edge lies inside (or on) one of the input polygons.
fn assert_contained(graph: &Graph, polygons: &[Polygon]) {
    for id in graph.edge_ids() {
        for pt in graph.edge(id).pl.points() {
            let ok = polygons.iter().any(|poly| {
                poly.contains_pt(*pt) || poly.dist_to_boundary(*pt) <= Distance::meters(0.05)
            });
            assert!(ok, "{} escapes every input polygon", pt);
        }
    }
}

/// Canonical form for comparing two runs: each edge as its point list, flipped into a consistent
/// direction, the whole set sorted.
fn canonical_edges(graph: &Graph) -> Vec<Vec<(String, String)>> {
    let mut edges: Vec<Vec<(String, String)>> = graph
        .edge_ids()
        .into_iter()
        .map(|id| {
            let pts: Vec<(String, String)> = graph
                .edge(id)
                .pl
                .points()
                .iter()
                .map(|pt| (format!("{:.4}", pt.x()), format!("{:.4}", pt.y())))
                .collect();
            let mut pts = pts;
            if pts.last() < pts.first() {
                pts.reverse();
            }
            pts
        })
        .collect();
    edges.sort();
    edges
}

// S1: a straight 100m x 5m corridor reduces to one spine edge between the two end caps.
#[test]
fn straight_corridor() {
    let poly = Polygon::rectangle(0.0, 0.0, 100.0, 5.0);
    let out = run(layer_of(vec![poly.clone()]));
    let g = &out.graph;

    assert_eq!(g.num_edges(), 1, "expected a single spine edge");
    assert_eq!(g.num_nodes(), 2);
    assert_eq!(out.report.components, 1);
    assert_eq!(out.report.degree_distribution.degree_1, 2);

    let mut xs: Vec<f64> = g.node_ids().iter().map(|n| g.node(*n).pt.x()).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert!(xs[0] > 1.5 && xs[0] < 10.0, "left terminal at x={}", xs[0]);
    assert!(xs[1] > 90.0 && xs[1] < 98.5, "right terminal at x={}", xs[1]);
    for n in g.node_ids() {
        assert!((g.node(n).pt.y() - 2.5).abs() < 0.3);
    }

    // A 5m-wide road ends 2.5m from its cap, which is past the 2m terminal gap bound, so both
    // terminals get flagged.
    assert_eq!(out.report.warnings.len(), 2);
    assert_contained(g, &[poly]);
}

// S2: a T-shaped polygon yields exactly one 3-way junction and three arms.
#[test]
fn t_junction() {
    // Horizontal bar 10m x 4m, vertical bar 10m x 4m on top of its middle
    let poly = Polygon::new(Ring::must_new(vec![
        Pt2D::new(0.0, 0.0),
        Pt2D::new(10.0, 0.0),
        Pt2D::new(10.0, 4.0),
        Pt2D::new(7.0, 4.0),
        Pt2D::new(7.0, 14.0),
        Pt2D::new(3.0, 14.0),
        Pt2D::new(3.0, 4.0),
        Pt2D::new(0.0, 4.0),
        Pt2D::new(0.0, 0.0),
    ]));
    let out = run(layer_of(vec![poly.clone()]));
    let g = &out.graph;

    assert_eq!(out.report.components, 1);
    assert_eq!(g.num_edges(), 3);
    assert_eq!(out.report.degree_distribution.degree_1, 3);
    assert_eq!(out.report.degree_distribution.degree_3, 1);

    let junction = g
        .node_ids()
        .into_iter()
        .find(|n| g.degree(*n) == 3)
        .unwrap();
    let pt = g.node(junction).pt;
    assert!(
        pt.dist_to(Pt2D::new(5.0, 2.5)) < Distance::meters(0.8),
        "junction landed at {}",
        pt
    );
    assert_contained(g, &[poly]);
}

// S3: two narrow rectangles crossing slightly off-center produce one 4-way node.
#[test]
fn staggered_cross() {
    let a = Polygon::rectangle(0.0, 8.5, 40.0, 3.0);
    let b = Polygon::rectangle(19.5, -9.0, 3.0, 40.0);
    let out = run(layer_of(vec![a.clone(), b.clone()]));
    let g = &out.graph;

    assert_eq!(out.report.components, 1);
    assert_eq!(g.num_edges(), 4);
    assert_eq!(out.report.degree_distribution.degree_4, 1);
    assert_eq!(out.report.degree_distribution.degree_1, 4);

    let crossing = g
        .node_ids()
        .into_iter()
        .find(|n| g.degree(*n) == 4)
        .unwrap();
    assert!(g.node(crossing).pt.dist_to(Pt2D::new(21.0, 10.0)) < Distance::meters(0.5));

    // 1.5m-wide clearance at the caps is inside the terminal gap bound; nothing to flag
    assert!(out.report.warnings.is_empty());
    assert_contained(g, &[a, b]);
}

// S4: a nub on the side of a wide corridor is pruned away entirely.
#[test]
fn spur_laden_polygon() {
    // 50m x 6m with a 1m x 1m nub poking out of the top side
    let poly = Polygon::new(Ring::must_new(vec![
        Pt2D::new(0.0, 0.0),
        Pt2D::new(50.0, 0.0),
        Pt2D::new(50.0, 6.0),
        Pt2D::new(25.0, 6.0),
        Pt2D::new(25.0, 7.0),
        Pt2D::new(24.0, 7.0),
        Pt2D::new(24.0, 6.0),
        Pt2D::new(0.0, 6.0),
        Pt2D::new(0.0, 0.0),
    ]));
    let out = run(layer_of(vec![poly.clone()]));
    let g = &out.graph;

    assert_eq!(g.num_edges(), 1, "the nub spur should be pruned");
    assert_eq!(g.num_nodes(), 2);
    assert_eq!(out.report.components, 1);
    for id in g.edge_ids() {
        for pt in g.edge(id).pl.points() {
            assert!((pt.y() - 3.0).abs() < 0.6, "spine wanders to {}", pt);
        }
    }
    assert_contained(g, &[poly]);
}

// S5: disconnected inputs stay disconnected.
#[test]
fn two_disconnected_polygons() {
    let a = Polygon::rectangle(0.0, 0.0, 30.0, 5.0);
    let b = Polygon::rectangle(0.0, 20.0, 30.0, 5.0);
    let out = run(layer_of(vec![a, b]));

    assert_eq!(out.report.components, 2);
    assert_eq!(out.graph.num_edges(), 2);
    assert_eq!(out.report.degree_distribution.degree_1, 4);
}

// S6: an annular sector's centerline follows the arc at the middle radius, within the
// simplification shape bound.
#[test]
fn curved_arc() {
    let mut outer: Vec<Pt2D> = Vec::new();
    let mut inner: Vec<Pt2D> = Vec::new();
    let steps = 45;
    for i in 0..=steps {
        let angle = (i as f64) / (steps as f64) * std::f64::consts::FRAC_PI_2;
        outer.push(Pt2D::new(25.0 * angle.cos(), 25.0 * angle.sin()));
        inner.push(Pt2D::new(20.0 * angle.cos(), 20.0 * angle.sin()));
    }
    inner.reverse();
    let mut ring_pts = outer;
    ring_pts.extend(inner);
    ring_pts.push(ring_pts[0]);
    let poly = Polygon::new(Ring::must_new(ring_pts));

    let out = run(layer_of(vec![poly.clone()]));
    let g = &out.graph;

    assert_eq!(out.report.components, 1);
    assert_eq!(g.num_edges(), 1, "expected one edge along the arc");

    // Stay near radius 22.5 the whole way: the allowed drift is the Voronoi wobble plus the
    // simplification bound (0.7m)
    for id in g.edge_ids() {
        for pt in g.edge(id).pl.points() {
            let r = (pt.x().powi(2) + pt.y().powi(2)).sqrt();
            assert!((r - 22.5).abs() <= 0.75, "point {} at radius {:.2}", pt, r);
        }
    }
    assert_contained(g, &[poly]);
}

#[test]
fn pipeline_is_deterministic() {
    let make_layer = || {
        layer_of(vec![Polygon::new(Ring::must_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(10.0, 4.0),
            Pt2D::new(7.0, 4.0),
            Pt2D::new(7.0, 14.0),
            Pt2D::new(3.0, 14.0),
            Pt2D::new(3.0, 4.0),
            Pt2D::new(0.0, 4.0),
            Pt2D::new(0.0, 0.0),
        ]))])
    };
    let out1 = run(make_layer());
    let out2 = run(make_layer());
    assert_eq!(canonical_edges(&out1.graph), canonical_edges(&out2.graph));
}

#[test]
fn minimum_edge_length_holds() {
    let config = Config::default();
    let out = run(layer_of(vec![Polygon::rectangle(0.0, 0.0, 40.0, 4.0)]));
    for id in out.graph.edge_ids() {
        assert!(out.graph.edge(id).length() >= config.min_edge_length);
    }
}

#[test]
fn endpoint_coincidence_holds() {
    let out = run(layer_of(vec![Polygon::rectangle(0.0, 0.0, 40.0, 4.0)]));
    let g = &out.graph;
    for id in g.edge_ids() {
        let edge = g.edge(id);
        assert_eq!(
            edge.pl.first_pt().to_hashable(),
            g.node(edge.n1).pt.to_hashable()
        );
        assert_eq!(
            edge.pl.last_pt().to_hashable(),
            g.node(edge.n2).pt.to_hashable()
        );
    }
}

#[test]
fn empty_layer_rejected() {
    let pipeline = Pipeline::new(Config::default()).unwrap();
    let err = pipeline
        .run(
            PolygonLayer {
                polygons: Vec::new(),
                crs: "EPSG:32633".to_string(),
            },
            &|| false,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::InputInvalid(_)));
}

#[test]
fn self_intersecting_polygon_rejected() {
    let bowtie = Polygon::new(Ring::must_new(vec![
        Pt2D::new(0.0, 0.0),
        Pt2D::new(10.0, 10.0),
        Pt2D::new(10.0, 0.0),
        Pt2D::new(0.0, 10.0),
        Pt2D::new(0.0, 0.0),
    ]));
    let pipeline = Pipeline::new(Config::default()).unwrap();
    let err = pipeline
        .run(layer_of(vec![bowtie]), &|| false, None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::InputInvalid(_)));
}

#[test]
fn default_config_is_accepted() {
    assert!(Pipeline::new(Config::default()).is_ok());
}

#[test]
fn invalid_config_rejected() {
    let mut config = Config::default();
    config.simplify_max_hausdorff = Distance::meters(0.01);
    assert!(matches!(
        Pipeline::new(config),
        Err(PipelineError::ConfigurationInvalid(_))
    ));
}

#[test]
fn cancellation_surfaces_between_stages() {
    let pipeline = Pipeline::new(Config::default()).unwrap();
    let err = pipeline
        .run(
            layer_of(vec![Polygon::rectangle(0.0, 0.0, 40.0, 4.0)]),
            &|| true,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled { .. }));
}

#[test]
fn tiny_polygon_yields_empty_network() {
    let pipeline = Pipeline::new(Config::default()).unwrap();
    let out = pipeline
        .run(
            layer_of(vec![Polygon::rectangle(0.0, 0.0, 0.5, 0.5)]),
            &|| false,
            None,
        )
        .unwrap();
    assert_eq!(out.graph.num_edges(), 0);
    assert_eq!(out.report.warnings, vec!["final network is empty".to_string()]);
}
