//! Collapses staggered junctions. Two crossings a meter apart are one intersection that the
//! polygon geometry happened to split; gluing them back gives routing-grade topology.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use geom::{Distance, Pt2D};

use crate::graph::{EdgeId, Graph, NodeId};
use crate::pipeline::PipelineContext;

pub fn merge(ctx: &PipelineContext, graph: &Graph) -> Result<Graph> {
    let mut g = graph.compact();

    // A cluster is a connected run of short junction-to-junction edges.
    let candidate_edges: Vec<EdgeId> = g
        .edge_ids()
        .into_iter()
        .filter(|e| {
            let edge = g.edge(*e);
            !edge.is_loop()
                && edge.length() <= ctx.config.merge_threshold
                && g.degree(edge.n1) >= 3
                && g.degree(edge.n2) >= 3
        })
        .collect();
    if candidate_edges.is_empty() {
        info!("no staggered junctions to merge");
        return Ok(g);
    }

    let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for e in &candidate_edges {
        let edge = g.edge(*e);
        adjacency.entry(edge.n1).or_default().push(edge.n2);
        adjacency.entry(edge.n2).or_default().push(edge.n1);
    }

    let mut clusters: Vec<BTreeSet<NodeId>> = Vec::new();
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    for start in adjacency.keys() {
        if seen.contains(start) {
            continue;
        }
        let mut cluster = BTreeSet::new();
        let mut queue = vec![*start];
        while let Some(n) = queue.pop() {
            if !seen.insert(n) {
                continue;
            }
            cluster.insert(n);
            for next in &adjacency[&n] {
                if !seen.contains(next) {
                    queue.push(*next);
                }
            }
        }
        clusters.push(cluster);
    }

    // Bigger clusters first, then by centroid position, for run-to-run stability.
    clusters.sort_by(|a, b| {
        let ca = raw_centroid(&g, a);
        let cb = raw_centroid(&g, b);
        b.len()
            .cmp(&a.len())
            .then(ca.0.partial_cmp(&cb.0).unwrap())
            .then(ca.1.partial_cmp(&cb.1).unwrap())
    });

    let mut merged = 0;
    for cluster in clusters {
        merge_cluster(ctx, &mut g, &cluster)?;
        collapse_short_edges(&mut g, ctx.config.min_edge_length);
        merged += 1;
    }
    collapse_short_edges(&mut g, ctx.config.min_edge_length);
    g.remove_isolated_nodes();
    info!("merged {} staggered junction clusters", merged);
    Ok(g.compact())
}

fn raw_centroid(g: &Graph, cluster: &BTreeSet<NodeId>) -> (f64, f64) {
    let mut x = 0.0;
    let mut y = 0.0;
    for n in cluster {
        x += g.node(*n).pt.x();
        y += g.node(*n).pt.y();
    }
    (x / cluster.len() as f64, y / cluster.len() as f64)
}

fn merge_cluster(ctx: &PipelineContext, g: &mut Graph, cluster: &BTreeSet<NodeId>) -> Result<()> {
    // Degree-weighted centroid: the busier junction pulls the merged node towards itself.
    let mut x = 0.0;
    let mut y = 0.0;
    let mut weight = 0.0;
    for n in cluster {
        let w = g.degree(*n) as f64;
        x += g.node(*n).pt.x() * w;
        y += g.node(*n).pt.y() * w;
        weight += w;
    }
    let centroid = Pt2D::new(x / weight, y / weight);

    // Internal edges vanish
    for n in cluster {
        for e in g.node(*n).edges().clone() {
            if !g.has_edge(e) {
                continue;
            }
            let edge = g.edge(e);
            if cluster.contains(&edge.n1) && cluster.contains(&edge.n2) {
                g.remove_edge(e);
            }
        }
    }

    let new_node = g.get_or_create_node(centroid, ctx.radius_at(centroid));

    // External edges get their terminal coordinate rewritten to the centroid
    for n in cluster {
        if *n == new_node || !g.has_node(*n) {
            continue;
        }
        for e in g.node(*n).edges().clone() {
            if !g.has_edge(e) {
                continue;
            }
            let edge = g.remove_edge(e);
            let (pl, n1, n2) = if edge.n1 == *n {
                (edge.pl.with_first_pt(centroid), new_node, edge.n2)
            } else {
                (edge.pl.with_last_pt(centroid), edge.n1, new_node)
            };
            match pl {
                Ok(pl) => {
                    g.add_edge(n1, n2, pl, edge.min_radius, edge.mean_radius, edge.source)?;
                }
                Err(_) => {
                    // The whole edge sat inside the cluster's footprint; nothing left to keep.
                }
            }
        }
    }
    g.remove_isolated_nodes();
    Ok(())
}

/// Collapse every edge shorter than `min_len`, unifying its endpoints into the higher-degree one
/// (ties break on position). Runs to a fixed point; each collapse removes an edge, so it
/// terminates.
pub fn collapse_short_edges(g: &mut Graph, min_len: Distance) {
    loop {
        let candidate = g
            .edge_ids()
            .into_iter()
            .filter(|e| g.edge(*e).length() < min_len)
            .min_by_key(|e| (g.edge(*e).length(), *e));
        let e = match candidate {
            Some(e) => e,
            None => {
                break;
            }
        };
        if g.edge(e).is_loop() {
            g.remove_edge(e);
            continue;
        }
        let edge = g.remove_edge(e);

        let (keep, lose) = {
            let d1 = g.degree(edge.n1);
            let d2 = g.degree(edge.n2);
            if d1 > d2 {
                (edge.n1, edge.n2)
            } else if d2 > d1 {
                (edge.n2, edge.n1)
            } else {
                let p1 = g.node(edge.n1).pt;
                let p2 = g.node(edge.n2).pt;
                if (p1.x(), p1.y()) <= (p2.x(), p2.y()) {
                    (edge.n1, edge.n2)
                } else {
                    (edge.n2, edge.n1)
                }
            }
        };
        let keep_pt = g.node(keep).pt;

        for e2 in g.node(lose).edges().clone() {
            if !g.has_edge(e2) {
                continue;
            }
            let old = g.remove_edge(e2);
            let mut pl = Ok(old.pl.clone());
            let mut n1 = old.n1;
            let mut n2 = old.n2;
            if old.n1 == lose {
                pl = pl.and_then(|p| p.with_first_pt(keep_pt));
                n1 = keep;
            }
            if old.n2 == lose {
                pl = pl.and_then(|p| p.with_last_pt(keep_pt));
                n2 = keep;
            }
            if let Ok(pl) = pl {
                g.add_edge(n1, n2, pl, old.min_radius, old.mean_radius, old.source)
                    .unwrap();
            }
        }
        g.remove_isolated_nodes();
    }
}
