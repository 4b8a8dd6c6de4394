//! Removes terminal noise near polygon corners: Y-shaped forks whose dead-end prong hugs the
//! boundary, and short sharply-bent terminal hooks. Both are artifacts of the boundary geometry,
//! not real road.

use geom::PolyLine;

use crate::graph::{ChainEnd, Graph, LeafChain};
use crate::pipeline::PipelineContext;

pub fn clean(ctx: &PipelineContext, graph: &Graph) -> Graph {
    let mut g = graph.compact();
    let mut removed_forks = 0;
    let mut removed_bends = 0;
    loop {
        let mut changed = false;
        for leaf in g.leaves() {
            if !g.has_node(leaf) || g.degree(leaf) != 1 {
                continue;
            }
            let chain = g.leaf_chain(leaf);
            if chain.edges.is_empty() {
                continue;
            }
            let fork = is_boundary_fork_branch(ctx, &g, &chain);
            let bend = !fork && is_single_bend(ctx, &g, &chain);
            if fork || bend {
                for e in &chain.edges {
                    if g.has_edge(*e) {
                        g.remove_edge(*e);
                    }
                }
                g.remove_isolated_nodes();
                if fork {
                    removed_forks += 1;
                } else {
                    removed_bends += 1;
                }
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    info!(
        "terminal fork cleaning: removed {} fork branches, {} single bends",
        removed_forks, removed_bends
    );
    g
}

/// A leaf branch is corner noise when it reaches a fork within the walk limit, hugs the source
/// polygon's boundary the whole way (the fork itself sits mid-road and is exempt), and the fork
/// has at least two other branches that head inward.
fn is_boundary_fork_branch(ctx: &PipelineContext, g: &Graph, chain: &LeafChain) -> bool {
    let j = match chain.end {
        ChainEnd::Junction(j) => j,
        ChainEnd::DeadEnd(_) => {
            return false;
        }
    };
    if chain.length > ctx.config.fork_walk_max_length {
        return false;
    }

    let source = g.edge(chain.edges[0]).source;
    let junction_pt = g.node(j).pt;
    for e in &chain.edges {
        for pt in g.edge(*e).pl.points() {
            if *pt == junction_pt {
                continue;
            }
            if ctx.dist_to_polygon_boundary(source, *pt) > ctx.config.terminal_near_boundary {
                return false;
            }
        }
    }

    let mut inward = 0;
    for e in g.node(j).edges() {
        if chain.edges.contains(e) {
            continue;
        }
        let (len, end_node) = g.walk_branch(j, *e, ctx.config.inward_continuation);
        if len >= ctx.config.inward_continuation
            && ctx.dist_to_boundary(g.node(end_node).pt) > ctx.config.terminal_near_boundary
        {
            inward += 1;
        }
    }
    inward >= 2
}

/// A terminal chain of two edges meeting at a single pass-through node with a hard turn, over a
/// short total length: the classic hooked-end artifact from a beveled polygon corner.
fn is_single_bend(ctx: &PipelineContext, g: &Graph, chain: &LeafChain) -> bool {
    if chain.edges.len() != 2 || chain.length >= ctx.config.bend_max_length {
        return false;
    }
    let pl = chain_polyline(g, chain);
    let pts = pl.points();
    let node_pt = g.node(chain.nodes[1]).pt;
    let idx = match pts.iter().position(|pt| *pt == node_pt) {
        Some(idx) if idx > 0 && idx + 1 < pts.len() => idx,
        _ => {
            return false;
        }
    };
    let turn = pts[idx - 1]
        .angle_to(pts[idx])
        .simple_diff_degrees(pts[idx].angle_to(pts[idx + 1]));
    turn > ctx.config.bend_angle_threshold
}

/// Stitch the chain's edges into one polyline, oriented leaf-first.
fn chain_polyline(g: &Graph, chain: &LeafChain) -> PolyLine {
    let mut pl: Option<PolyLine> = None;
    let mut current = chain.nodes[0];
    for e in &chain.edges {
        let edge = g.edge(*e);
        let piece = if edge.n1 == current {
            edge.pl.clone()
        } else {
            edge.pl.reversed()
        };
        current = edge.other_endpoint(current);
        pl = Some(match pl {
            None => piece,
            Some(p) => p.extend(piece).unwrap(),
        });
    }
    pl.unwrap()
}
