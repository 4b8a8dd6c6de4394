//! Turns road-surface polygons into a topologically clean centerline network.
//!
//! The input is a layer of paved-footprint polygons (arbitrary concavities and holes, widths in
//! the 2-40m range, projected CRS in meters). The output is a planar graph of polylines
//! approximating each polygon's medial axis, fit for routing, cartography, or conflation.
//!
//! The stages run strictly in order, each a pure function from graph to graph:
//!
//! ```text
//! polygons -> skeletonize (Voronoi over densified boundaries, clipped, pruned)
//!          -> planarize -> merge staggered junctions -> smooth junction approaches
//!          -> clean terminal forks -> collapse pass-through nodes -> simplify
//!          -> validate + diagnose
//! ```
//!
//! ```no_run
//! use centerline::{Config, Pipeline, PolygonLayer, InputPolygon, PolygonId};
//! use geom::Polygon;
//!
//! let layer = PolygonLayer {
//!     polygons: vec![InputPolygon {
//!         id: PolygonId(0),
//!         polygon: Polygon::rectangle(0.0, 0.0, 100.0, 5.0),
//!     }],
//!     crs: "EPSG:32633".to_string(),
//! };
//! let pipeline = Pipeline::new(Config::default()).unwrap();
//! let output = pipeline.run(layer, &|| false, None).unwrap();
//! println!("{} centerlines", output.centerline_edges().len());
//! ```

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod config;
mod diagnostics;
mod error;
mod graph;
mod io;
mod pipeline;
mod skeleton;
mod transform;
mod validate;

pub use crate::config::Config;
pub use crate::diagnostics::{
    DegreeDistribution, DiagnosticsReport, LengthBucket, RiskCandidate,
};
pub use crate::error::PipelineError;
pub use crate::graph::{ChainEnd, Edge, EdgeId, Graph, LeafChain, Node, NodeId, PolygonId};
pub use crate::io::{
    centerline_edges, CenterlineEdge, CenterlineSink, GeoJsonSnapshotWriter, InputPolygon,
    PolygonLayer, PolygonSource, SnapshotSink,
};
pub use crate::pipeline::{Pipeline, PipelineContext, PipelineOutput};
pub use crate::skeleton::skeletonize;
pub use crate::transform::Stage;
