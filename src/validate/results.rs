//! Task result and execution status references.

use std::collections::HashSet;

use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};
use crate::parse::types::{Phase, PipelineResult, PipelineTask};
use crate::reference::{self, Expression, Reference};

/// `invalid value: expected all of the expressions [..] to be result
/// expressions but only [..] were`, when some result-like expression in
/// `values` does not parse as a result reference.
pub(crate) fn unparsed_result_refs<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<FieldError> {
    let mut candidates: Vec<Expression<'a>> = Vec::new();
    let mut parsed: Vec<Expression<'a>> = Vec::new();
    for value in values {
        let (c, p) = reference::result_like(value);
        candidates.extend(c);
        parsed.extend(p);
    }
    if candidates.len() == parsed.len() {
        return None;
    }

    Some(FieldError::invalid_value(
        ErrorKind::Reference,
        format!(
            "expected all of the expressions [{}] to be result expressions but only [{}] were",
            join(&candidates),
            join(&parsed)
        ),
        CURRENT_FIELD,
    ))
}

fn join(expressions: &[Expression<'_>]) -> String {
    expressions
        .iter()
        .map(Expression::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result-like expressions in task params must parse. Paths are
/// `PHASE[i].params[P].value`.
pub fn validate_param_results(phase: Phase, tasks: &[PipelineTask]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (i, task) in tasks.iter().enumerate() {
        for param in &task.params {
            if let Some(error) = unparsed_result_refs(param.value.strings()) {
                errors.push(
                    error
                        .via_field("value")
                        .via_field_key("params", &param.name)
                        .via_field_index(phase.field(), i),
                );
            }
        }
    }
    errors
}

/// Every string of a pipeline result value must be exactly one result
/// reference to a DAG task.
///
/// Each applicable condition is reported on its own, so a plain literal gets
/// the "no expressions", "invalid expressions" and "nonexistent task" errors
/// together.
pub fn validate_pipeline_results(results: &[PipelineResult], tasks: &[PipelineTask]) -> FieldErrors {
    let task_names: HashSet<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let mut errors = FieldErrors::new();

    for (i, result) in results.iter().enumerate() {
        let values = result.value.strings();
        let expressions: Vec<Expression<'_>> = values
            .iter()
            .flat_map(|v| reference::expressions(v))
            .collect();

        let mut result_errors = FieldErrors::new();
        if expressions.is_empty() {
            result_errors.push(FieldError::invalid_value(
                ErrorKind::Reference,
                "expected pipeline results to be task result expressions but no expressions were found",
                CURRENT_FIELD,
            ));
        }
        if !expressions.iter().any(Expression::looks_like_result_ref) {
            result_errors.push(FieldError::invalid_value(
                ErrorKind::Reference,
                "expected pipeline results to be task result expressions but an invalid expressions was found",
                CURRENT_FIELD,
            ));
        }
        if let Some(error) = unparsed_result_refs(values.iter().copied()) {
            result_errors.push(error);
        }
        if values.iter().any(|v| !is_single_expression(v)) && !expressions.is_empty() {
            result_errors.push(FieldError::invalid_value(
                ErrorKind::Reference,
                "expected each pipeline result value to be exactly one task result expression",
                CURRENT_FIELD,
            ));
        }
        if !values.iter().all(|v| references_only_tasks(v, &task_names)) {
            result_errors.push(FieldError::invalid_value(
                ErrorKind::Reference,
                "referencing a nonexistent task",
                CURRENT_FIELD,
            ));
        }

        errors.extend(result_errors.via_field("value").via_field_index("results", i));
    }

    errors
}

/// `value` is nothing but one `$(...)` expression.
fn is_single_expression(value: &str) -> bool {
    let mut exprs = reference::expressions(value);
    match (exprs.next(), exprs.next()) {
        (Some(expr), None) => expr.is_isolated_in(value),
        _ => false,
    }
}

/// `value` holds at least one expression and every expression is a result
/// reference to one of `task_names`.
fn references_only_tasks(value: &str, task_names: &HashSet<&str>) -> bool {
    let mut exprs = reference::expressions(value).peekable();
    exprs.peek().is_some()
        && exprs.all(|expr| {
            matches!(
                expr.reference(),
                Reference::Result { task, .. } if task_names.contains(task)
            )
        })
}

/// DAG tasks may not read execution status at all; finally tasks may only
/// read the status of DAG tasks.
pub fn validate_execution_status_variables(
    tasks: &[PipelineTask],
    finally: &[PipelineTask],
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let dag_names: HashSet<&str> = tasks.iter().map(|t| t.name.as_str()).collect();

    for (i, task) in tasks.iter().enumerate() {
        errors.extend(
            status_refs(task, &|reference: Reference<'_>| {
                reference.is_status().then(|| {
                    "pipeline tasks can not refer to execution status of any other pipeline task or aggregate status of tasks".to_string()
                })
            })
            .via_field_index(Phase::Dag.field(), i),
        );
    }

    for (i, task) in finally.iter().enumerate() {
        errors.extend(
            status_refs(task, &|reference: Reference<'_>| match reference {
                Reference::TaskStatus { task } if !dag_names.contains(task) => {
                    Some(format!("pipeline task {} is not defined in the pipeline", task))
                }
                _ => None,
            })
            .via_field_index(Phase::Finally.field(), i),
        );
    }

    errors
}

/// Apply `check` to every expression in the task's params (reported at
/// `params[P].value`) and when-expressions (reported at `when[j]`).
fn status_refs(task: &PipelineTask, check: &dyn Fn(Reference<'_>) -> Option<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for param in &task.params {
        errors.extend(
            status_errors(param.value.strings(), check)
                .via_field("value")
                .via_field_key("params", &param.name),
        );
    }
    for (j, when) in task.when.iter().enumerate() {
        errors.extend(status_errors(when.strings(), check).via_field_index("when", j));
    }
    errors
}

fn status_errors<'a>(
    values: impl IntoIterator<Item = &'a str>,
    check: &dyn Fn(Reference<'_>) -> Option<String>,
) -> FieldErrors {
    values
        .into_iter()
        .flat_map(reference::expressions)
        .filter_map(|expr| check(expr.reference()))
        .map(|message| FieldError::invalid_value(ErrorKind::PhaseRule, message, CURRENT_FIELD))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::types::{Param, ParamValue, TaskRef, WhenExpression};

    fn task(name: &str) -> PipelineTask {
        PipelineTask {
            name: name.into(),
            task_ref: Some(TaskRef::named("t")),
            ..PipelineTask::default()
        }
    }

    fn with_param(mut t: PipelineTask, value: &str) -> PipelineTask {
        t.params.push(Param::new("a-param", ParamValue::string(value)));
        t
    }

    fn result(value: &str) -> PipelineResult {
        PipelineResult {
            name: "my-result".into(),
            value: ParamValue::string(value),
            ..PipelineResult::default()
        }
    }

    #[test]
    fn typo_in_result_reference() {
        let tasks = vec![
            task("a-task"),
            with_param(task("b-task"), "$(tasks.a-task.resultTypo.bResult)"),
        ];
        assert_eq!(
            validate_param_results(Phase::Dag, &tasks).to_string(),
            "invalid value: expected all of the expressions [tasks.a-task.resultTypo.bResult] to be result expressions but only [] were: tasks[1].params[a-param].value"
        );
    }

    #[test]
    fn valid_pipeline_results() {
        let tasks = vec![task("a-task")];
        let results = vec![
            result("$(tasks.a-task.results.output)"),
            result("$(tasks.a-task.results.gitrepo.commit)"),
        ];
        assert!(validate_pipeline_results(&results, &tasks).is_empty());
    }

    #[test]
    fn excess_segments_emit_arity_and_nonexistent_task() {
        let tasks = vec![task("a-task")];
        let results = vec![result("$(tasks.a-task.results.output.key1.extra)")];
        assert_eq!(
            validate_pipeline_results(&results, &tasks).to_string(),
            "invalid value: expected all of the expressions [tasks.a-task.results.output.key1.extra] to be result expressions but only [] were: results[0].value\n\
             invalid value: referencing a nonexistent task: results[0].value"
        );
    }

    #[test]
    fn literal_result_emits_every_applicable_error() {
        let errors = validate_pipeline_results(&[result("foo")], &[task("a-task")]);
        assert_eq!(errors.len(), 3);
        assert!(errors.has_message(
            "invalid value: expected pipeline results to be task result expressions but no expressions were found"
        ));
        assert!(errors.has_message(
            "invalid value: expected pipeline results to be task result expressions but an invalid expressions was found"
        ));
        assert!(errors.has_message("invalid value: referencing a nonexistent task"));
    }

    #[test]
    fn result_value_must_be_a_single_isolated_expression() {
        let tasks = vec![task("a-task")];
        let wrong_count =
            "invalid value: expected each pipeline result value to be exactly one task result expression: results[0].value";
        for value in [
            "$(tasks.a-task.results.out) trailing",
            "prefix $(tasks.a-task.results.out)",
            "$(tasks.a-task.results.out)-$(tasks.a-task.results.other)",
        ] {
            assert_eq!(
                validate_pipeline_results(&[result(value)], &tasks).to_string(),
                wrong_count,
                "{value}"
            );
        }
    }

    #[test]
    fn array_result_checks_every_element() {
        let tasks = vec![task("a-task")];
        let valid = PipelineResult {
            name: "all".into(),
            value: ParamValue::array(["$(tasks.a-task.results.one)", "$(tasks.a-task.results.two)"]),
            ..PipelineResult::default()
        };
        assert!(validate_pipeline_results(&[valid], &tasks).is_empty());

        let partial = PipelineResult {
            name: "all".into(),
            value: ParamValue::array(["$(tasks.a-task.results.one)", "x-$(tasks.missing.results.two)"]),
            ..PipelineResult::default()
        };
        assert_eq!(
            validate_pipeline_results(&[partial], &tasks).to_string(),
            "invalid value: expected each pipeline result value to be exactly one task result expression: results[0].value\n\
             invalid value: referencing a nonexistent task: results[0].value"
        );
    }

    #[test]
    fn unknown_task_in_result() {
        let errors = validate_pipeline_results(&[result("$(tasks.missing.results.out)")], &[task("a-task")]);
        assert_eq!(errors.to_string(), "invalid value: referencing a nonexistent task: results[0].value");
    }

    #[test]
    fn dag_task_cannot_read_status() {
        let tasks = vec![task("bar"), with_param(task("foo"), "$(tasks.bar.status)")];
        assert_eq!(
            validate_execution_status_variables(&tasks, &[]).to_string(),
            "invalid value: pipeline tasks can not refer to execution status of any other pipeline task or aggregate status of tasks: tasks[1].params[a-param].value"
        );

        let mut t = task("foo");
        t.when.push(WhenExpression::new("$(tasks.status)", "in", ["Succeeded"]));
        assert!(validate_execution_status_variables(&[t], &[]).has_message(
            "invalid value: pipeline tasks can not refer to execution status of any other pipeline task or aggregate status of tasks"
        ));
    }

    #[test]
    fn result_named_status_is_not_a_status_ref() {
        let tasks = vec![task("foo"), with_param(task("bar"), "$(tasks.foo.results.status)")];
        assert!(validate_execution_status_variables(&tasks, &[]).is_empty());
    }

    #[test]
    fn finally_status_of_unknown_task() {
        let tasks = vec![task("foo")];
        let finally = vec![with_param(task("final"), "$(tasks.foo.status) $(tasks.notask.status) $(tasks.status)")];
        assert_eq!(
            validate_execution_status_variables(&tasks, &finally).to_string(),
            "invalid value: pipeline task notask is not defined in the pipeline: finally[0].params[a-param].value"
        );
    }
}
