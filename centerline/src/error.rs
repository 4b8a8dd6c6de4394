use thiserror::Error;

use crate::graph::PolygonId;

/// Everything that can stop (or degrade) a pipeline run.
///
/// Per-polygon numeric failures never poison a batch: the driver logs them and continues with an
/// empty skeleton for the offending polygon. The variant exists for callers invoking the
/// skeletonizer directly. Invariant violations indicate a bug and always abort.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("Voronoi construction failed on {polygon}: {message}")]
    NumericDegenerate { polygon: PolygonId, message: String },

    #[error("internal invariant violated ({stage}): {message}")]
    InvariantViolation { stage: String, message: String },

    #[error("cancelled after the {after} stage")]
    Cancelled { after: String },

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}
