//! The pipeline driver: owns the context, runs the skeletonizer per polygon, then dispatches the
//! topology stages in their fixed order. Stages are pure graph-to-graph functions; the driver
//! swaps results in, checks invariants, honors cooperative cancellation between stages, and emits
//! debug snapshots at the named checkpoints.

use std::collections::BTreeMap;

use geom::{Bounds, Distance, FindClosest, Polygon, Pt2D};

use crate::config::Config;
use crate::diagnostics::{self, DiagnosticsReport};
use crate::error::PipelineError;
use crate::graph::{Graph, PolygonId};
use crate::io::{CenterlineEdge, PolygonLayer, SnapshotSink};
use crate::skeleton::{self, MIN_NODE_RADIUS};
use crate::transform::planarize::verify_planar;
use crate::transform::Stage;
use crate::validate;

/// Cap on boundary-distance queries; beyond this the exact value doesn't matter.
const MAX_BOUNDARY_QUERY: Distance = Distance::const_meters(100.0);

/// Everything the stages read: the immutable config, the input polygons, and a spatial index
/// over all their boundaries. Owned by the driver, passed by reference.
pub struct PipelineContext {
    pub config: Config,
    polygons: BTreeMap<PolygonId, Polygon>,
    crs: String,
    boundary: FindClosest<(PolygonId, usize)>,
}

impl PipelineContext {
    pub fn new(config: Config, layer: PolygonLayer) -> Result<PipelineContext, PipelineError> {
        config.validate()?;
        if layer.polygons.is_empty() {
            return Err(PipelineError::InputInvalid(
                "the input layer has no polygons".to_string(),
            ));
        }

        let mut polygons = BTreeMap::new();
        let mut bounds = Bounds::new();
        for input in &layer.polygons {
            input.polygon.check_valid().map_err(|err| {
                PipelineError::InputInvalid(format!("{}: {}", input.id, err))
            })?;
            if polygons.insert(input.id, input.polygon.clone()).is_some() {
                return Err(PipelineError::InputInvalid(format!(
                    "duplicate {}",
                    input.id
                )));
            }
            bounds.union(input.polygon.get_bounds());
        }

        let mut boundary = FindClosest::new(&bounds.pad(MAX_BOUNDARY_QUERY));
        for (id, polygon) in &polygons {
            for (ring_idx, ring) in polygon.all_rings().enumerate() {
                boundary.add((*id, ring_idx), ring.points());
            }
        }

        Ok(PipelineContext {
            config,
            polygons,
            crs: layer.crs,
            boundary,
        })
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn polygon_ids(&self) -> Vec<PolygonId> {
        self.polygons.keys().copied().collect()
    }

    pub fn polygon(&self, id: PolygonId) -> &Polygon {
        &self.polygons[&id]
    }

    /// Distance from a point to the nearest boundary of any input polygon.
    pub fn dist_to_boundary(&self, pt: Pt2D) -> Distance {
        self.boundary
            .closest_dist(pt, MAX_BOUNDARY_QUERY)
            .unwrap_or(MAX_BOUNDARY_QUERY)
    }

    /// Distance from a point to one specific polygon's boundary.
    pub fn dist_to_polygon_boundary(&self, id: PolygonId, pt: Pt2D) -> Distance {
        self.polygons[&id].dist_to_boundary(pt)
    }

    /// Clearance radius for nodes created after skeleton time (intersection points, merged
    /// junctions).
    pub fn radius_at(&self, pt: Pt2D) -> Distance {
        self.dist_to_boundary(pt).max(MIN_NODE_RADIUS)
    }
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub graph: Graph,
    pub report: DiagnosticsReport,
}

impl PipelineOutput {
    pub fn centerline_edges(&self) -> Vec<CenterlineEdge> {
        crate::io::centerline_edges(&self.graph)
    }
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Pipeline, PipelineError> {
        config.validate()?;
        Ok(Pipeline { config })
    }

    /// Runs the whole thing: skeletons per polygon, the topology stages over their union, then
    /// validation and diagnostics. `should_cancel` is polled between stages only; a stage always
    /// runs to completion.
    pub fn run(
        &self,
        layer: PolygonLayer,
        should_cancel: &dyn Fn() -> bool,
        mut snapshots: Option<&mut dyn SnapshotSink>,
    ) -> Result<PipelineOutput, PipelineError> {
        let ctx = PipelineContext::new(self.config.clone(), layer)?;

        let mut graph = Graph::new();
        for id in ctx.polygon_ids() {
            match skeleton::skeletonize(&ctx.config, id, ctx.polygon(id)) {
                Ok(fragment) => {
                    graph.absorb(&fragment);
                }
                Err(PipelineError::NumericDegenerate { polygon, message }) => {
                    warn!("{}: Voronoi construction failed ({}); skipping it", polygon, message);
                }
                Err(err) => {
                    return Err(err);
                }
            }
        }
        info!(
            "skeleton stage done: {} nodes, {} edges",
            graph.num_nodes(),
            graph.num_edges()
        );
        self.checkpoint("skeleton", &ctx, &graph, should_cancel, &mut snapshots)?;

        for stage in Stage::IN_ORDER {
            graph = stage
                .apply(&ctx, graph)
                .map_err(|err| PipelineError::InvariantViolation {
                    stage: stage.name().to_string(),
                    message: err.to_string(),
                })?;
            graph = graph.compact();

            graph
                .check_invariants(match stage {
                    Stage::Simplify => Some(ctx.config.min_edge_length),
                    _ => None,
                })
                .map_err(|err| PipelineError::InvariantViolation {
                    stage: stage.name().to_string(),
                    message: err.to_string(),
                })?;
            if matches!(stage, Stage::Planarize | Stage::Simplify) {
                verify_planar(&graph, ctx.config.snap_tolerance).map_err(|err| {
                    PipelineError::InvariantViolation {
                        stage: stage.name().to_string(),
                        message: err.to_string(),
                    }
                })?;
            }
            info!(
                "{} done: {} nodes, {} edges",
                stage.name(),
                graph.num_nodes(),
                graph.num_edges()
            );

            let snapshot_name = match stage {
                Stage::Planarize => Some("planarized"),
                Stage::CollapseDegreeTwo => Some("cleaned"),
                Stage::Simplify => Some("final"),
                _ => None,
            };
            if let Some(name) = snapshot_name {
                self.checkpoint(name, &ctx, &graph, should_cancel, &mut snapshots)?;
            } else if should_cancel() {
                return Err(PipelineError::Cancelled {
                    after: stage.name().to_string(),
                });
            }
        }

        let warnings = validate::validate(&ctx, &graph);
        let report = diagnostics::report(&ctx, &graph, warnings);
        Ok(PipelineOutput { graph, report })
    }

    fn checkpoint(
        &self,
        name: &str,
        _ctx: &PipelineContext,
        graph: &Graph,
        should_cancel: &dyn Fn() -> bool,
        snapshots: &mut Option<&mut dyn SnapshotSink>,
    ) -> Result<(), PipelineError> {
        if self.config.debug_export_intermediate {
            if let Some(sink) = snapshots.as_deref_mut() {
                if let Err(err) = sink.write(name, graph) {
                    warn!("snapshot '{}' failed: {}", name, err);
                }
            }
        }
        if should_cancel() {
            return Err(PipelineError::Cancelled {
                after: name.to_string(),
            });
        }
        Ok(())
    }
}
