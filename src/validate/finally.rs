//! Rules specific to the finally phase.

use std::collections::HashSet;

use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};
use crate::parse::types::{PipelineSpec, PipelineTask};
use crate::reference::{self, Reference};

/// A finally section needs a DAG phase to follow.
pub fn validate_tasks_and_finally_section(spec: &PipelineSpec) -> FieldErrors {
    if !spec.finally.is_empty() && spec.tasks.is_empty() {
        return FieldError::invalid_value(
            ErrorKind::PhaseRule,
            format!(
                "spec.tasks is empty but spec.finally has {} tasks",
                spec.finally.len()
            ),
            "finally",
        )
        .into();
    }
    FieldErrors::new()
}

/// Finally tasks are unordered: no `runAfter`, and result references only to
/// DAG tasks. Paths are rooted at `finally`.
pub fn validate_final_tasks(tasks: &[PipelineTask], finally: &[PipelineTask]) -> FieldErrors {
    let dag_names: HashSet<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let final_names: HashSet<&str> = finally.iter().map(|t| t.name.as_str()).collect();

    let mut errors = FieldErrors::new();
    for (i, task) in finally.iter().enumerate() {
        let mut task_errors = FieldErrors::new();
        no_run_after(task, &mut task_errors);
        result_refs_to_dag(task, &dag_names, &final_names, &mut task_errors);
        errors.extend(task_errors.via_field_index("finally", i));
    }
    errors
}

fn no_run_after(task: &PipelineTask, errors: &mut FieldErrors) {
    if !task.run_after.is_empty() {
        errors.push(FieldError::invalid_value(
            ErrorKind::PhaseRule,
            format!(
                "no runAfter allowed under spec.finally, final task {} has runAfter specified",
                task.name
            ),
            CURRENT_FIELD,
        ));
    }
}

fn result_refs_to_dag(
    task: &PipelineTask,
    dag_names: &HashSet<&str>,
    final_names: &HashSet<&str>,
    errors: &mut FieldErrors,
) {
    let check = |values: Vec<&str>| -> FieldErrors {
        values
            .into_iter()
            .flat_map(reference::expressions)
            .filter_map(|expr| match expr.reference() {
                Reference::Result { task: dep, .. } if final_names.contains(dep) => Some(format!(
                    "invalid task result reference, final task has task result reference from a final task {}",
                    dep
                )),
                Reference::Result { task: dep, .. } if !dag_names.contains(dep) => Some(format!(
                    "invalid task result reference, final task has task result reference from a task {} which is not defined in the pipeline",
                    dep
                )),
                _ => None,
            })
            .map(|message| FieldError::invalid_value(ErrorKind::PhaseRule, message, CURRENT_FIELD))
            .collect()
    };

    for param in &task.params {
        errors.extend(
            check(param.value.strings())
                .via_field("value")
                .via_field_key("params", &param.name),
        );
    }
    for (j, when) in task.when.iter().enumerate() {
        errors.extend(check(when.strings().collect()).via_field_index("when", j));
    }
}
