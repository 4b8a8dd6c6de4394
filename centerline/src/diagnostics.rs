//! Structural statistics over the final network: degree and length distributions, how much of
//! the network hugs a polygon boundary, and a shortlist of edges that smell like residual noise.
//! Read-only, like the validator.

use serde::Serialize;

use geom::Distance;

use crate::graph::Graph;
use crate::pipeline::PipelineContext;

/// Histogram bin upper bounds, in meters. Everything longer lands in the open-ended last bucket.
const LENGTH_BINS_METERS: [f64; 7] = [1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0];

/// An edge counts as boundary-near when any of its vertices is within this of a polygon boundary.
const BOUNDARY_NEAR_METERS: f64 = 0.5;

/// Short and boundary-near: the signature of leftover skeleton noise.
const RISK_MAX_LENGTH_METERS: f64 = 3.0;
const RISK_MAX_BOUNDARY_DIST_METERS: f64 = 0.25;
const RISK_TOP_N: usize = 20;

#[derive(Clone, Debug, Default, Serialize)]
pub struct DegreeDistribution {
    pub degree_1: usize,
    pub degree_2: usize,
    pub degree_3: usize,
    pub degree_4: usize,
    pub degree_5_plus: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct LengthBucket {
    /// None for the open-ended last bucket.
    pub up_to_meters: Option<f64>,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RiskCandidate {
    pub edge: usize,
    pub length_meters: f64,
    pub boundary_dist_meters: f64,
    pub endpoint_degrees: (usize, usize),
}

#[derive(Clone, Debug, Serialize)]
pub struct DiagnosticsReport {
    pub components: usize,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_length_meters: f64,
    pub degree_distribution: DegreeDistribution,
    pub edge_length_histogram: Vec<LengthBucket>,
    pub pct_edges_near_boundary: f64,
    pub risk_candidates: Vec<RiskCandidate>,
    pub warnings: Vec<String>,
}

pub fn report(ctx: &PipelineContext, graph: &Graph, warnings: Vec<String>) -> DiagnosticsReport {
    let mut degree_distribution = DegreeDistribution::default();
    for n in graph.node_ids() {
        match graph.degree(n) {
            0 => {}
            1 => degree_distribution.degree_1 += 1,
            2 => degree_distribution.degree_2 += 1,
            3 => degree_distribution.degree_3 += 1,
            4 => degree_distribution.degree_4 += 1,
            _ => degree_distribution.degree_5_plus += 1,
        }
    }

    let mut bucket_counts = vec![0; LENGTH_BINS_METERS.len() + 1];
    let mut near_boundary = 0;
    let mut risk: Vec<RiskCandidate> = Vec::new();
    let edge_ids = graph.edge_ids();
    for id in &edge_ids {
        let edge = graph.edge(*id);
        let length = edge.length().inner_meters();
        let bucket = LENGTH_BINS_METERS
            .iter()
            .position(|bin| length <= *bin)
            .unwrap_or(LENGTH_BINS_METERS.len());
        bucket_counts[bucket] += 1;

        let boundary_dist = edge
            .pl
            .points()
            .iter()
            .map(|pt| ctx.dist_to_boundary(*pt))
            .min()
            .unwrap_or(Distance::ZERO)
            .inner_meters();
        if boundary_dist < BOUNDARY_NEAR_METERS {
            near_boundary += 1;
        }
        if boundary_dist < RISK_MAX_BOUNDARY_DIST_METERS && length < RISK_MAX_LENGTH_METERS {
            risk.push(RiskCandidate {
                edge: id.0,
                length_meters: length,
                boundary_dist_meters: boundary_dist,
                endpoint_degrees: (graph.degree(edge.n1), graph.degree(edge.n2)),
            });
        }
    }
    risk.sort_by(|a, b| {
        a.boundary_dist_meters
            .partial_cmp(&b.boundary_dist_meters)
            .unwrap()
            .then(a.length_meters.partial_cmp(&b.length_meters).unwrap())
    });
    risk.truncate(RISK_TOP_N);

    let edge_length_histogram = bucket_counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| LengthBucket {
            up_to_meters: LENGTH_BINS_METERS.get(idx).copied(),
            count,
        })
        .collect();

    let total_edges = edge_ids.len();
    let pct_edges_near_boundary = if total_edges == 0 {
        0.0
    } else {
        100.0 * (near_boundary as f64) / (total_edges as f64)
    };

    let report = DiagnosticsReport {
        components: graph.connected_components().len(),
        total_nodes: graph.num_nodes(),
        total_edges,
        total_length_meters: graph.total_edge_length().inner_meters(),
        degree_distribution,
        edge_length_histogram,
        pct_edges_near_boundary,
        risk_candidates: risk,
        warnings,
    };
    info!(
        "diagnostics: {} components, degrees 1/2/3/4/5+ = {}/{}/{}/{}/{}, {:.1}% of edges near a boundary, {} risk candidates",
        report.components,
        report.degree_distribution.degree_1,
        report.degree_distribution.degree_2,
        report.degree_distribution.degree_3,
        report.degree_distribution.degree_4,
        report.degree_distribution.degree_5_plus,
        report.pct_edges_near_boundary,
        report.risk_candidates.len()
    );
    report
}
