//! Parse phase: JSON → pipeline types + dependency graph construction.

pub mod graph;
pub mod types;

pub use graph::PipelineGraph;
pub use types::*;

use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};

/// Deserialize a full pipeline document (`metadata` + `spec`).
pub fn parse(json: &str) -> Result<Pipeline, FieldErrors> {
    serde_json::from_str::<Pipeline>(json).map_err(|e| parse_error("pipeline", e))
}

/// Deserialize a bare pipeline spec.
pub fn parse_spec(json: &str) -> Result<PipelineSpec, FieldErrors> {
    serde_json::from_str::<PipelineSpec>(json).map_err(|e| parse_error("pipeline spec", e))
}

fn parse_error(what: &str, e: serde_json::Error) -> FieldErrors {
    FieldError::new(
        ErrorKind::Structural,
        format!("failed to parse {} JSON: {}", what, e),
        [CURRENT_FIELD],
    )
    .into()
}
