use pipeline_check::config::FeatureFlags;
use pipeline_check::error::FieldErrors;
use pipeline_check::parse::types::*;

// =============================================================================
// Task builders
// =============================================================================

/// Task referencing a cluster task by name.
pub fn task(name: &str) -> PipelineTask {
    PipelineTask {
        name: name.into(),
        task_ref: Some(TaskRef::named(format!("{}-task", name))),
        ..PipelineTask::default()
    }
}

pub fn run_after(mut t: PipelineTask, deps: &[&str]) -> PipelineTask {
    t.run_after = deps.iter().map(|d| d.to_string()).collect();
    t
}

pub fn with_param(mut t: PipelineTask, name: &str, value: ParamValue) -> PipelineTask {
    t.params.push(Param::new(name, value));
    t
}

pub fn with_when(mut t: PipelineTask, input: &str, operator: &str, values: &[&str]) -> PipelineTask {
    t.when
        .push(WhenExpression::new(input, operator, values.iter().copied()));
    t
}

pub fn with_workspace(mut t: PipelineTask, name: &str, workspace: &str) -> PipelineTask {
    t.workspaces.push(WorkspaceBinding {
        name: name.into(),
        workspace: workspace.into(),
        ..WorkspaceBinding::default()
    });
    t
}

// =============================================================================
// Spec builders
// =============================================================================

pub fn spec(tasks: Vec<PipelineTask>) -> PipelineSpec {
    PipelineSpec {
        tasks,
        ..PipelineSpec::default()
    }
}

pub fn spec_with_finally(tasks: Vec<PipelineTask>, finally: Vec<PipelineTask>) -> PipelineSpec {
    PipelineSpec {
        tasks,
        finally,
        ..PipelineSpec::default()
    }
}

pub fn string_param(name: &str) -> ParamSpec {
    ParamSpec::new(name, ParamType::String)
}

pub fn array_param(name: &str) -> ParamSpec {
    ParamSpec::new(name, ParamType::Array)
}

pub fn workspace(name: &str) -> WorkspaceDeclaration {
    WorkspaceDeclaration {
        name: name.into(),
        ..WorkspaceDeclaration::default()
    }
}

pub fn result(name: &str, value: &str) -> PipelineResult {
    PipelineResult {
        name: name.into(),
        value: ParamValue::string(value),
        ..PipelineResult::default()
    }
}

// =============================================================================
// Assertions
// =============================================================================

pub fn validate(spec: &PipelineSpec) -> FieldErrors {
    pipeline_check::validate_spec(&FeatureFlags::default(), spec)
}

pub fn assert_has_error(errors: &FieldErrors, message: &str, path: &str) {
    let found = errors
        .merged()
        .iter()
        .any(|e| e.message == message && e.paths.iter().any(|p| p == path));
    assert!(
        found,
        "expected error {:?} at {:?}, got:\n{}",
        message, path, errors
    );
}

pub fn assert_no_errors(errors: &FieldErrors) {
    assert!(errors.is_empty(), "expected no errors, got:\n{}", errors);
}
