//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::config::FeatureFlags;
use crate::error::{ErrorKind, FieldError, FieldErrors};

/// Validate a pipeline JSON document (`metadata` + `spec`).
/// `flags_json` may be empty for default feature flags.
/// Returns a JSON array of `{kind, message, paths, details}` objects.
#[wasm_bindgen]
pub fn validate_pipeline(pipeline_json: &str, flags_json: &str) -> JsValue {
    let result = validate_pipeline_inner(pipeline_json, flags_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Same as [`validate_pipeline`] for a bare spec document.
#[wasm_bindgen]
pub fn validate_pipeline_spec(spec_json: &str, flags_json: &str) -> JsValue {
    let result = validate_spec_inner(spec_json, flags_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_pipeline_inner(pipeline_json: &str, flags_json: &str) -> Vec<ErrorDto> {
    let flags = match parse_flags(flags_json) {
        Ok(flags) => flags,
        Err(errors) => return to_dtos(errors),
    };
    let pipeline = match crate::parse::parse(pipeline_json) {
        Ok(p) => p,
        Err(errors) => return to_dtos(errors),
    };
    to_dtos(crate::validate::validate_pipeline(&flags, &pipeline))
}

fn validate_spec_inner(spec_json: &str, flags_json: &str) -> Vec<ErrorDto> {
    let flags = match parse_flags(flags_json) {
        Ok(flags) => flags,
        Err(errors) => return to_dtos(errors),
    };
    let spec = match crate::parse::parse_spec(spec_json) {
        Ok(s) => s,
        Err(errors) => return to_dtos(errors),
    };
    to_dtos(crate::validate::validate_spec(&flags, &spec))
}

fn parse_flags(flags_json: &str) -> Result<FeatureFlags, FieldErrors> {
    if flags_json.trim().is_empty() {
        return Ok(FeatureFlags::default());
    }
    serde_json::from_str::<FeatureFlags>(flags_json).map_err(|e| {
        FieldError::new(
            ErrorKind::Structural,
            format!("failed to parse feature flags JSON: {}", e),
            [crate::error::CURRENT_FIELD],
        )
        .into()
    })
}

fn to_dtos(errors: FieldErrors) -> Vec<ErrorDto> {
    errors.merged().into_iter().map(ErrorDto::from).collect()
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ErrorDto {
    kind: String,
    message: String,
    paths: Vec<String>,
    details: Option<String>,
}

impl From<FieldError> for ErrorDto {
    fn from(e: FieldError) -> Self {
        ErrorDto {
            kind: e.kind.to_string(),
            message: e.message,
            paths: e.paths,
            details: e.details,
        }
    }
}
