//! Workspace declarations and task bindings.

use std::collections::HashSet;

use crate::config::FeatureFlags;
use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};
use crate::parse::types::{Phase, PipelineTask, WorkspaceDeclaration};

/// Declared names must be non-empty and unique. Paths are `workspaces[i]`.
pub fn validate_workspace_declarations(decls: &[WorkspaceDeclaration]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let mut seen = HashSet::new();

    for (i, decl) in decls.iter().enumerate() {
        if decl.name.is_empty() {
            errors.push(
                FieldError::invalid_value(
                    ErrorKind::Workspace,
                    format!("workspace {} has empty name", i),
                    CURRENT_FIELD,
                )
                .via_field_index("workspaces", i),
            );
        }
        if !seen.insert(decl.name.as_str()) {
            errors.push(
                FieldError::invalid_value(
                    ErrorKind::Workspace,
                    format!("workspace with name \"{}\" appears more than once", decl.name),
                    CURRENT_FIELD,
                )
                .via_field_index("workspaces", i),
            );
        }
    }

    errors
}

/// Every binding in `tasks` must point at a declared workspace, and a task may
/// bind each of its own workspace names once. Skipped when declarations are
/// expected to be propagated later.
pub fn validate_workspace_usage(
    flags: &FeatureFlags,
    decls: &[WorkspaceDeclaration],
    phase: Phase,
    tasks: &[PipelineTask],
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !flags.validate_declarations() {
        return errors;
    }

    let declared: HashSet<&str> = decls.iter().map(|d| d.name.as_str()).collect();
    for (i, task) in tasks.iter().enumerate() {
        let mut bound = HashSet::new();
        let mut task_errors = FieldErrors::new();
        for (j, binding) in task.workspaces.iter().enumerate() {
            let workspace = binding.pipeline_workspace();
            if !declared.contains(workspace) {
                task_errors.push(
                    FieldError::invalid_value(
                        ErrorKind::Workspace,
                        format!(
                            "pipeline task \"{}\" expects workspace with name \"{}\" but none exists in pipeline spec",
                            task.name, workspace
                        ),
                        CURRENT_FIELD,
                    )
                    .via_field_index("workspaces", j),
                );
            }
            if !bound.insert(binding.name.as_str()) {
                task_errors.push(
                    FieldError::new(
                        ErrorKind::Workspace,
                        format!("workspace name \"{}\" must be unique", binding.name),
                        [CURRENT_FIELD],
                    )
                    .via_field_index("workspaces", j),
                );
            }
        }
        errors.extend(task_errors.via_field_index(phase.field(), i));
    }

    errors
}
