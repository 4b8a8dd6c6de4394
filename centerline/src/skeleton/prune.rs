//! The pruner chain. Raw Voronoi skeletons are full of artifacts: fans reaching into every
//! polygon corner, stubs along concave kinks, crumbs disconnected from the main network. Each
//! pruner removes one family of them. The unit of removal is always a maximal leaf chain (the
//! walk from a degree-1 node inward to the first real junction), because the raw skeleton is
//! chopped at boundary-sampling granularity and removing single edges would just shift the leaf.

use crate::config::Config;
use crate::graph::{ChainEnd, Graph, LeafChain};

pub fn prune_skeleton(config: &Config, mut graph: Graph) -> Graph {
    // One round of the chain isn't always enough: stripping boundary-hugging noise can expose a
    // stub that only the ratio test recognizes (nested corner artifacts do this). Re-run the
    // chain, in its fixed order, until the graph settles.
    loop {
        let edges_before = graph.num_edges();
        ratio_prune(config, &mut graph);
        boundary_near_prune(config, &mut graph);
        component_prune(config, &mut graph);
        spur_prune(config, &mut graph);
        if graph.num_edges() == edges_before {
            break;
        }
    }
    graph
}

/// Remove leaf chains that are short relative to the local road width AND end in pinched
/// clearance.
///
/// The length measure is a flat multiple of the junction radius, `chain.length <
/// junction_radius * prune_limit`. `ratio_threshold` counts how far a spur must reach BEYOND the
/// junction's clearance disk, so the flat limit is one radius higher: `1 + ratio_threshold`
/// (2.2 radii at the default). A corner fan's diagonal spans about 1.27 radii, so it goes.
///
/// The leaf-clearance gate is what keeps genuine short stubs alive: a real arm ends at a cap
/// center where the leaf radius stays comparable to the junction's, while fans and boundary
/// spurs run towards the boundary and their leaf radius collapses. The gate is load-bearing: a
/// T-junction with 4m-wide, 10m arms has arm chains of ~1.22 junction radii, inside any flat
/// limit wide enough to catch the 1.27-radius corner fans, so length alone would strip real
/// arms along with the noise.
///
/// Iterated to a fixed point, since removing all branches of a junction turns it into a new
/// leaf.
fn ratio_prune(config: &Config, graph: &mut Graph) {
    let mut removed_chains = 0;
    let mut removed_edges = 0;
    loop {
        let mut eligible: Vec<LeafChain> = Vec::new();
        for leaf in graph.leaves() {
            let chain = graph.leaf_chain(leaf);
            if let ChainEnd::Junction(j) = chain.end {
                let junction_radius = graph.node(j).radius;
                let leaf_radius = graph.node(chain.nodes[0]).radius;
                let prune_limit = junction_radius * (1.0 + config.ratio_threshold);
                if leaf_radius < junction_radius / 2.0 && chain.length < prune_limit {
                    eligible.push(chain);
                }
            }
        }
        if eligible.is_empty() {
            break;
        }
        sort_chains(&mut eligible);
        for chain in &eligible {
            removed_edges += remove_chain(graph, chain);
            removed_chains += 1;
        }
        graph.remove_isolated_nodes();
    }
    info!(
        "ratio pruning: removed {} chains ({} edges)",
        removed_chains, removed_edges
    );
}

/// Remove leaf chains that hug the boundary for their entire run. Voronoi spurs along concave
/// boundary kinks look exactly like this: every vertex within `boundary_near_distance` of the
/// polygon edge. The chain's inner end is exempt from the band test (it sits on the real
/// skeleton, mid-road). The pruners run before degree-2 collapse, so chain nodes are exactly the
/// polyline vertices and the stored node radii tell the whole story.
fn boundary_near_prune(config: &Config, graph: &mut Graph) {
    let mut removed_chains = 0;
    let mut removed_edges = 0;
    loop {
        let mut eligible: Vec<LeafChain> = Vec::new();
        for leaf in graph.leaves() {
            let chain = graph.leaf_chain(leaf);
            if chain.edges.is_empty() {
                continue;
            }
            if chain.nodes[..chain.nodes.len() - 1]
                .iter()
                .all(|n| graph.node(*n).radius <= config.boundary_near_distance)
            {
                eligible.push(chain);
            }
        }
        if eligible.is_empty() {
            break;
        }
        sort_chains(&mut eligible);
        for chain in &eligible {
            removed_edges += remove_chain(graph, chain);
            removed_chains += 1;
        }
        graph.remove_isolated_nodes();
    }
    info!(
        "boundary-near pruning: removed {} chains ({} edges)",
        removed_chains, removed_edges
    );
}

/// Drop connected components whose total length is too small to be road. Isolated micro-skeletons
/// come from slivers and odd pockets of the polygon.
fn component_prune(config: &Config, graph: &mut Graph) {
    let mut removed_components = 0;
    let mut removed_edges = 0;
    for component in graph.connected_components() {
        let total = component.total_length(graph);
        if total >= config.min_component_length {
            continue;
        }
        for e in &component.edges {
            graph.remove_edge(*e);
            removed_edges += 1;
        }
        removed_components += 1;
    }
    graph.remove_isolated_nodes();
    info!(
        "component pruning: removed {} components ({} edges)",
        removed_components, removed_edges
    );
}

/// Catch-all: any remaining leaf chain shorter than `spur_absolute_length` goes, regardless of
/// the local radius. Iterated to a fixed point like the ratio pruner.
fn spur_prune(config: &Config, graph: &mut Graph) {
    let mut removed_chains = 0;
    let mut removed_edges = 0;
    loop {
        let mut eligible: Vec<LeafChain> = Vec::new();
        for leaf in graph.leaves() {
            let chain = graph.leaf_chain(leaf);
            if matches!(chain.end, ChainEnd::Junction(_))
                && chain.length < config.spur_absolute_length
            {
                eligible.push(chain);
            }
        }
        if eligible.is_empty() {
            break;
        }
        sort_chains(&mut eligible);
        for chain in &eligible {
            removed_edges += remove_chain(graph, chain);
            removed_chains += 1;
        }
        graph.remove_isolated_nodes();
    }
    info!(
        "spur pruning: removed {} chains ({} edges)",
        removed_chains, removed_edges
    );
}

/// Shortest chains go first; ties break on the first edge id. Keeps removal order stable from run
/// to run.
fn sort_chains(chains: &mut Vec<LeafChain>) {
    chains.sort_by_key(|chain| (chain.length, chain.edges.first().copied()));
}

/// Removing one chain can race with another chain selected in the same round (two leaves whose
/// walks meet), so tolerate already-removed edges.
fn remove_chain(graph: &mut Graph, chain: &LeafChain) -> usize {
    let mut removed = 0;
    for e in &chain.edges {
        if graph.has_edge(*e) {
            graph.remove_edge(*e);
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, PolygonId};
    use geom::{Distance, PolyLine, Pt2D};

    fn add_edge_with_radii(g: &mut Graph, pts: Vec<(f64, f64)>, radii: (f64, f64)) -> EdgeId {
        let pts: Vec<Pt2D> = pts.into_iter().map(|(x, y)| Pt2D::new(x, y)).collect();
        let (r1, r2) = radii;
        let n1 = g.get_or_create_node(pts[0], Distance::meters(r1));
        let n2 = g.get_or_create_node(*pts.last().unwrap(), Distance::meters(r2));
        let pl = PolyLine::must_new(pts);
        let min = Distance::meters(r1.min(r2));
        let mean = Distance::meters((r1 + r2) / 2.0);
        g.add_edge(n1, n2, pl, min, mean, PolygonId(0)).unwrap()
    }

    /// A 20m spine with a 2m stub hanging off a junction whose clearance radius is 2.5m.
    fn spine_with_stub() -> Graph {
        let mut g = Graph::new();
        add_edge_with_radii(&mut g, vec![(0.0, 0.0), (10.0, 0.0)], (2.5, 2.5));
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (20.0, 0.0)], (2.5, 2.5));
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (10.0, 2.0)], (2.5, 0.3));
        g
    }

    #[test]
    fn ratio_prunes_stub_but_not_spine() {
        let mut g = spine_with_stub();
        let config = Config::default();
        ratio_prune(&config, &mut g);
        // The stub (2m) is under (1 + 1.2) * 2.5m, so it goes. The spine is a pure path
        // afterwards and pure paths are never ratio-pruned.
        assert_eq!(g.num_edges(), 2);
        assert!(g.find_node(Pt2D::new(10.0, 2.0)).is_none());
    }

    #[test]
    fn stub_with_road_like_clearance_survives() {
        let mut g = Graph::new();
        add_edge_with_radii(&mut g, vec![(0.0, 0.0), (10.0, 0.0)], (2.5, 2.5));
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (20.0, 0.0)], (2.5, 2.5));
        // Short, but its leaf still has road-like clearance (2.0 vs the junction's 2.5): a real
        // arm ending at a cap center, not a spur reaching for the boundary
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (10.0, 3.0)], (2.5, 2.0));
        let config = Config::default();
        ratio_prune(&config, &mut g);
        assert_eq!(g.num_edges(), 3);
    }

    #[test]
    fn ratio_prune_is_idempotent() {
        let mut g = spine_with_stub();
        let config = Config::default();
        ratio_prune(&config, &mut g);
        let edges_after_once = g.num_edges();
        ratio_prune(&config, &mut g);
        assert_eq!(g.num_edges(), edges_after_once);
    }

    #[test]
    fn boundary_near_prunes_hugging_chain() {
        let mut g = Graph::new();
        // A spine with healthy clearance
        add_edge_with_radii(&mut g, vec![(0.0, 0.0), (10.0, 0.0)], (2.0, 2.0));
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (20.0, 0.0)], (2.0, 2.0));
        // A boundary-hugging stub off the junction: gone (the junction end itself is exempt from
        // the band test)
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (11.0, 1.0)], (2.0, 0.2));
        // A branch that leaves the boundary band partway: kept
        add_edge_with_radii(&mut g, vec![(0.0, 0.0), (-2.0, 2.0)], (2.0, 1.5));
        add_edge_with_radii(&mut g, vec![(-2.0, 2.0), (-3.0, 3.0)], (1.5, 0.2));
        let config = Config::default();
        boundary_near_prune(&config, &mut g);
        assert_eq!(g.num_edges(), 4);
        assert!(g.find_node(Pt2D::new(11.0, 1.0)).is_none());
        assert!(g.find_node(Pt2D::new(-3.0, 3.0)).is_some());

        // A detached chain that's boundary-near over its whole run also goes
        add_edge_with_radii(&mut g, vec![(50.0, 0.0), (51.0, 0.0)], (0.1, 0.15));
        add_edge_with_radii(&mut g, vec![(51.0, 0.0), (52.0, 0.0)], (0.15, 0.1));
        boundary_near_prune(&config, &mut g);
        assert_eq!(g.num_edges(), 4);
        assert!(g.find_node(Pt2D::new(50.0, 0.0)).is_none());
    }

    #[test]
    fn component_prune_drops_crumbs() {
        let mut g = Graph::new();
        add_edge_with_radii(&mut g, vec![(0.0, 0.0), (10.0, 0.0)], (2.0, 2.0));
        // 3m total, below the 5m default
        add_edge_with_radii(&mut g, vec![(50.0, 50.0), (53.0, 50.0)], (1.0, 1.0));
        let config = Config::default();
        component_prune(&config, &mut g);
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.connected_components().len(), 1);
    }

    #[test]
    fn spur_prune_fixed_point() {
        let mut g = Graph::new();
        // A cross with one arm made of two 0.9m pieces; the chain totals 1.8m < 2m
        add_edge_with_radii(&mut g, vec![(0.0, 0.0), (10.0, 0.0)], (3.0, 3.0));
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (20.0, 0.0)], (3.0, 3.0));
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (10.0, 5.0)], (3.0, 3.0));
        add_edge_with_radii(&mut g, vec![(10.0, 0.0), (10.0, -0.9)], (3.0, 1.0));
        add_edge_with_radii(&mut g, vec![(10.0, -0.9), (10.0, -1.8)], (1.0, 0.5));
        let config = Config::default();
        spur_prune(&config, &mut g);
        assert_eq!(g.num_edges(), 3);
        assert!(g.find_node(Pt2D::new(10.0, -1.8)).is_none());
    }
}
