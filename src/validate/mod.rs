//! Static validation of a pipeline before anything runs.
//!
//! Every analysis returns a [`FieldErrors`] and nothing short-circuits: the
//! caller gets all violations at once. The one exception is the dependency
//! graph, which is only built when DAG task names are non-empty and unique.

pub mod finally;
pub mod graph;
pub mod params;
pub mod results;
pub mod tasks;
pub mod variables;
pub mod when;
pub mod workspaces;

use std::collections::HashSet;

pub use finally::{validate_final_tasks, validate_tasks_and_finally_section};
pub use graph::validate_graph;
pub use params::validate_param_specs;
pub use results::{validate_execution_status_variables, validate_param_results, validate_pipeline_results};
pub use tasks::{validate_pipeline_task, validate_pipeline_tasks};
pub use variables::validate_parameter_variables;
pub use when::validate_when_expressions;
pub use workspaces::{validate_workspace_declarations, validate_workspace_usage};

use crate::config::FeatureFlags;
use crate::error::{ErrorKind, FieldError, FieldErrors};
use crate::parse::types::{ObjectMeta, Phase, Pipeline, PipelineSpec, PipelineTask};

/// Run every analysis over a spec. Paths are relative to the spec.
pub fn validate_spec(flags: &FeatureFlags, spec: &PipelineSpec) -> FieldErrors {
    tracing::debug!(
        tasks = spec.tasks.len(),
        finally = spec.finally.len(),
        params = spec.params.len(),
        "validating pipeline spec"
    );

    if spec.is_empty() {
        return FieldError::new(
            ErrorKind::Structural,
            "expected at least one, got none",
            ["description", "params", "tasks", "workspaces"],
        )
        .into();
    }

    let mut errors = validate_pipeline_tasks(flags, &spec.tasks, &spec.finally);
    errors.extend(validate_tasks_and_finally_section(spec));

    if graph_identity_is_sound(&spec.tasks) {
        errors.extend(validate_graph(&spec.tasks));
    } else {
        tracing::debug!("skipping dependency graph: DAG task names are empty or duplicated");
    }

    errors.extend(validate_param_specs(&spec.params));
    errors.extend(validate_workspace_declarations(&spec.workspaces));

    for phase in [Phase::Dag, Phase::Finally] {
        let tasks = spec.phase_tasks(phase);
        errors.extend(validate_parameter_variables(flags, phase, tasks, &spec.params));
        errors.extend(validate_workspace_usage(flags, &spec.workspaces, phase, tasks));
        errors.extend(validate_when_expressions(phase, tasks));
        errors.extend(validate_param_results(phase, tasks));
    }

    errors.extend(validate_pipeline_results(&spec.results, &spec.tasks));
    errors.extend(validate_execution_status_variables(&spec.tasks, &spec.finally));
    errors.extend(validate_final_tasks(&spec.tasks, &spec.finally));

    tracing::debug!(errors = errors.len(), "pipeline spec validated");
    errors
}

/// Validate object metadata and the spec; spec paths are prefixed `spec.`.
pub fn validate_pipeline(flags: &FeatureFlags, pipeline: &Pipeline) -> FieldErrors {
    tracing::debug!(name = %pipeline.metadata.name, "validating pipeline");

    let mut errors = validate_metadata(&pipeline.metadata);
    errors.extend(validate_spec(flags, &pipeline.spec).via_field("spec"));
    errors
}

fn validate_metadata(metadata: &ObjectMeta) -> FieldErrors {
    let name = metadata.name.as_str();
    let error = if name.is_empty() {
        FieldError::missing_field(["name"])
    } else if name.contains('.') {
        FieldError::invalid_value(
            ErrorKind::Structural,
            "Invalid resource name: special character . must not be present",
            "name",
        )
    } else if name.len() > tasks::DNS_LABEL_MAX_LEN {
        FieldError::invalid_value(
            ErrorKind::Structural,
            "Invalid resource name: length must be no more than 63 characters",
            "name",
        )
    } else if !tasks::is_dns_label(name) {
        FieldError::new(
            ErrorKind::Structural,
            format!("invalid resource name \"{}\": must be a valid DNS label", name),
            ["name"],
        )
    } else {
        return FieldErrors::new();
    };
    FieldErrors::from(error).via_field("metadata")
}

fn graph_identity_is_sound(tasks: &[PipelineTask]) -> bool {
    let mut seen = HashSet::new();
    tasks
        .iter()
        .all(|t| !t.name.is_empty() && seen.insert(t.name.as_str()))
}
