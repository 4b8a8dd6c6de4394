//! Read-only QA over the final network. Nothing here mutates the graph; the output is a list of
//! human-readable warnings that land in the diagnostics report.

use crate::graph::Graph;
use crate::pipeline::PipelineContext;

pub fn validate(ctx: &PipelineContext, graph: &Graph) -> Vec<String> {
    let mut warnings = Vec::new();

    if graph.num_edges() == 0 {
        warnings.push("final network is empty".to_string());
        return warnings;
    }

    let components = graph.connected_components();
    info!(
        "validator: {} nodes, {} edges, {} components, {:.1}m total",
        graph.num_nodes(),
        graph.num_edges(),
        components.len(),
        graph.total_edge_length().inner_meters()
    );

    let leaves = graph.leaves();
    let mut gap_failures = 0;
    for n in &leaves {
        let pt = graph.node(*n).pt;
        let gap = ctx.dist_to_boundary(pt);
        if gap > ctx.config.terminal_gap_warn {
            gap_failures += 1;
            warnings.push(format!(
                "terminal {} at {} is {:.2}m from the nearest polygon boundary (allowed {})",
                n,
                pt,
                gap.inner_meters(),
                ctx.config.terminal_gap_warn
            ));
        }
    }
    if gap_failures == 0 {
        info!(
            "validator: all {} terminals sit close to a polygon boundary",
            leaves.len()
        );
    } else {
        warn!(
            "validator: {} of {} terminals end far from any polygon boundary",
            gap_failures,
            leaves.len()
        );
    }

    warnings
}
