//! The seams to the outside world. Loading geodata files, UI, and worker dispatch live with the
//! caller; the pipeline only sees these traits. Constructing a `geom::Polygon` already enforces
//! closed, non-repeating rings, so a `PolygonSource` can't hand over structurally broken input.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use geom::{Distance, Polygon, Pt2D};

use crate::graph::{Graph, PolygonId};

#[derive(Clone, Debug)]
pub struct InputPolygon {
    pub id: PolygonId,
    pub polygon: Polygon,
}

/// One layer of road-surface polygons, in a projected CRS with meter units. The pipeline never
/// reprojects; `crs` is carried through for the caller's bookkeeping.
#[derive(Clone, Debug)]
pub struct PolygonLayer {
    pub polygons: Vec<InputPolygon>,
    pub crs: String,
}

pub trait PolygonSource {
    fn load(&mut self) -> Result<PolygonLayer>;
}

/// One finished centerline, ready for writing.
#[derive(Clone, Debug)]
pub struct CenterlineEdge {
    pub points: Vec<Pt2D>,
    pub length: Distance,
    pub source: PolygonId,
}

pub trait CenterlineSink {
    fn write(&mut self, edges: &[CenterlineEdge]) -> Result<()>;
}

/// Receives the intermediate graphs when `debug_export_intermediate` is on.
pub trait SnapshotSink {
    fn write(&mut self, stage_name: &str, graph: &Graph) -> Result<()>;
}

/// Dumps each snapshot as `<dir>/<stage>.geojson`, one LineString feature per edge with its
/// stats as properties.
pub struct GeoJsonSnapshotWriter {
    pub dir: PathBuf,
}

impl GeoJsonSnapshotWriter {
    pub fn new(dir: PathBuf) -> GeoJsonSnapshotWriter {
        GeoJsonSnapshotWriter { dir }
    }
}

impl SnapshotSink for GeoJsonSnapshotWriter {
    fn write(&mut self, stage_name: &str, graph: &Graph) -> Result<()> {
        let mut features = Vec::new();
        for id in graph.edge_ids() {
            let edge = graph.edge(id);
            let coords: Vec<Vec<f64>> = edge
                .pl
                .points()
                .iter()
                .map(|pt| vec![pt.x(), pt.y()])
                .collect();
            let mut properties = serde_json::Map::new();
            properties.insert(
                "length".to_string(),
                serde_json::json!(edge.length().inner_meters()),
            );
            properties.insert(
                "min_radius".to_string(),
                serde_json::json!(edge.min_radius.inner_meters()),
            );
            properties.insert(
                "mean_radius".to_string(),
                serde_json::json!(edge.mean_radius.inner_meters()),
            );
            properties.insert("source".to_string(), serde_json::json!(edge.source.0));
            properties.insert(
                "degrees".to_string(),
                serde_json::json!(vec![graph.degree(edge.n1), graph.degree(edge.n2)]),
            );
            features.push(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::LineString(coords))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }
        let collection = geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.geojson", stage_name));
        fs::write(&path, geojson::GeoJson::FeatureCollection(collection).to_string())?;
        info!("wrote snapshot {}", path.display());
        Ok(())
    }
}

/// Extract the final edges in a sink-friendly form.
pub fn centerline_edges(graph: &Graph) -> Vec<CenterlineEdge> {
    graph
        .edge_ids()
        .into_iter()
        .map(|id| {
            let edge = graph.edge(id);
            CenterlineEdge {
                points: edge.pl.points().clone(),
                length: edge.length(),
                source: edge.source,
            }
        })
        .collect()
}
