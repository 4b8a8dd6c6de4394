use geom::Distance;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// All the tunables for the pipeline, in meters (the input must be in a projected CRS). Built
/// once, validated once, then immutable for the whole run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum spacing of boundary points fed to the Voronoi construction.
    pub segmentize_max_length: Distance,
    /// Point coincidence threshold for proximity decisions (splitting, invariant checks). Held
    /// untrimmed so the configured value round-trips; build sub-grid values with
    /// `Distance::const_meters` (the `meters` constructor snaps to the kernel's 0.1mm grid,
    /// which would silently turn 1e-6 into zero). Coordinates themselves live on that grid, so
    /// every tolerance below 1e-4m behaves as exact grid coincidence.
    pub snap_tolerance: Distance,
    /// Polygons smaller than this (m^2) are skipped with a warning.
    pub min_polygon_area: f64,
    /// A leaf chain survives pruning only if it extends at least this fraction of the junction
    /// radius beyond the junction's clearance disk.
    pub ratio_threshold: f64,
    /// Leaf chains entirely within this band of the polygon boundary are Voronoi noise.
    pub boundary_near_distance: Distance,
    /// Connected components with less total edge length than this are dropped.
    pub min_component_length: Distance,
    /// Any remaining leaf chain shorter than this is dropped, regardless of ratio.
    pub spur_absolute_length: Distance,
    /// Junction-to-junction edges at most this long form staggered-intersection clusters.
    pub merge_threshold: Distance,
    /// Edges shorter than this are collapsed after merging.
    pub min_edge_length: Distance,
    /// How many vertices next to a junction the smoother may replace.
    pub smoothing_window: usize,
    /// Maximum lateral deviation for the smoother's chord replacement.
    pub smoothing_tolerance: Distance,
    /// How far the terminal fork cleaner walks inward from a leaf.
    pub fork_walk_max_length: Distance,
    /// A leaf branch is only deletable if it hugs the boundary within this band.
    pub terminal_near_boundary: Distance,
    /// The fork's other branches must continue inward at least this far.
    pub inward_continuation: Distance,
    /// Turning angle (degrees) that makes a short terminal chain a "single bend" artifact.
    pub bend_angle_threshold: f64,
    /// Maximum total length of a single-bend chain.
    pub bend_max_length: Distance,
    /// Douglas-Peucker tolerance for the final simplification.
    pub simplify_tolerance: Distance,
    /// Hard cap on shape deviation introduced by simplification.
    pub simplify_max_hausdorff: Distance,
    /// Degree-1 nodes farther than this from any polygon boundary get flagged.
    pub terminal_gap_warn: Distance,
    /// Emit snapshots after the Skeleton/Planarized/Cleaned/Final stages.
    pub debug_export_intermediate: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            segmentize_max_length: Distance::meters(0.5),
            snap_tolerance: Distance::const_meters(1e-6),
            min_polygon_area: 1.0,
            ratio_threshold: 1.2,
            boundary_near_distance: Distance::meters(0.3),
            min_component_length: Distance::meters(5.0),
            spur_absolute_length: Distance::meters(2.0),
            merge_threshold: Distance::meters(1.5),
            min_edge_length: Distance::meters(0.05),
            smoothing_window: 3,
            smoothing_tolerance: Distance::meters(0.25),
            fork_walk_max_length: Distance::meters(8.0),
            terminal_near_boundary: Distance::meters(0.5),
            inward_continuation: Distance::meters(3.0),
            bend_angle_threshold: 60.0,
            bend_max_length: Distance::meters(4.0),
            simplify_tolerance: Distance::meters(0.35),
            simplify_max_hausdorff: Distance::meters(0.70),
            terminal_gap_warn: Distance::meters(2.0),
            debug_export_intermediate: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let positive_distances = [
            ("segmentize_max_length", self.segmentize_max_length),
            ("snap_tolerance", self.snap_tolerance),
            ("boundary_near_distance", self.boundary_near_distance),
            ("min_component_length", self.min_component_length),
            ("spur_absolute_length", self.spur_absolute_length),
            ("merge_threshold", self.merge_threshold),
            ("min_edge_length", self.min_edge_length),
            ("smoothing_tolerance", self.smoothing_tolerance),
            ("fork_walk_max_length", self.fork_walk_max_length),
            ("terminal_near_boundary", self.terminal_near_boundary),
            ("inward_continuation", self.inward_continuation),
            ("bend_max_length", self.bend_max_length),
            ("simplify_tolerance", self.simplify_tolerance),
            ("simplify_max_hausdorff", self.simplify_max_hausdorff),
            ("terminal_gap_warn", self.terminal_gap_warn),
        ];
        for (name, value) in positive_distances {
            if value <= Distance::ZERO {
                return Err(PipelineError::ConfigurationInvalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.min_polygon_area <= 0.0 {
            return Err(PipelineError::ConfigurationInvalid(format!(
                "min_polygon_area must be positive, got {}",
                self.min_polygon_area
            )));
        }
        if self.ratio_threshold <= 0.0 {
            return Err(PipelineError::ConfigurationInvalid(format!(
                "ratio_threshold must be positive, got {}",
                self.ratio_threshold
            )));
        }
        if self.smoothing_window == 0 {
            return Err(PipelineError::ConfigurationInvalid(
                "smoothing_window must be at least 1".to_string(),
            ));
        }
        if self.bend_angle_threshold <= 0.0 || self.bend_angle_threshold >= 180.0 {
            return Err(PipelineError::ConfigurationInvalid(format!(
                "bend_angle_threshold must be in (0, 180) degrees, got {}",
                self.bend_angle_threshold
            )));
        }
        if self.simplify_max_hausdorff < self.simplify_tolerance {
            return Err(PipelineError::ConfigurationInvalid(format!(
                "simplify_max_hausdorff ({}) can't be below simplify_tolerance ({})",
                self.simplify_max_hausdorff, self.simplify_tolerance
            )));
        }
        if self.min_edge_length > self.merge_threshold {
            return Err(PipelineError::ConfigurationInvalid(format!(
                "min_edge_length ({}) can't exceed merge_threshold ({})",
                self.min_edge_length, self.merge_threshold
            )));
        }
        Ok(())
    }
}
