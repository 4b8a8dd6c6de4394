//! The topology stages that turn a union of pruned skeletons into a clean network. The stage
//! list is a closed enum dispatched in one fixed order, so the sequencing constraint lives in the
//! type rather than in the call sites.

pub mod clean_forks;
pub mod collapse_degree_two;
pub mod merge_intersections;
pub mod planarize;
pub mod simplify;
pub mod smooth_intersections;

use anyhow::Result;

use crate::graph::Graph;
use crate::pipeline::PipelineContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Planarize,
    MergeIntersections,
    SmoothIntersections,
    CleanTerminalForks,
    CollapseDegreeTwo,
    Simplify,
}

impl Stage {
    pub const IN_ORDER: [Stage; 6] = [
        Stage::Planarize,
        Stage::MergeIntersections,
        Stage::SmoothIntersections,
        Stage::CleanTerminalForks,
        Stage::CollapseDegreeTwo,
        Stage::Simplify,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Planarize => "planarize",
            Stage::MergeIntersections => "merge intersections",
            Stage::SmoothIntersections => "smooth intersections",
            Stage::CleanTerminalForks => "clean terminal forks",
            Stage::CollapseDegreeTwo => "collapse degree-2 nodes",
            Stage::Simplify => "simplify",
        }
    }

    /// Stages are pure: consume one graph, produce the next.
    pub fn apply(self, ctx: &PipelineContext, graph: Graph) -> Result<Graph> {
        match self {
            Stage::Planarize => planarize::planarize(ctx, &graph),
            Stage::MergeIntersections => merge_intersections::merge(ctx, &graph),
            Stage::SmoothIntersections => Ok(smooth_intersections::smooth(&ctx.config, &graph)),
            Stage::CleanTerminalForks => Ok(clean_forks::clean(ctx, &graph)),
            Stage::CollapseDegreeTwo => {
                let mut g = graph;
                collapse_degree_two::collapse(&mut g);
                Ok(g)
            }
            Stage::Simplify => Ok(simplify::simplify(ctx, &graph)),
        }
    }
}
