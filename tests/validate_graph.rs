//! Integration tests for dependency graph validation.

#[allow(dead_code)]
mod helpers;

use helpers::*;
use pipeline_check::parse::types::ParamValue;
use pipeline_check::validate;

#[test]
fn acyclic_pipeline_passes() {
    let tasks = vec![
        task("a"),
        run_after(task("b"), &["a"]),
        with_param(task("c"), "x", ParamValue::string("$(tasks.b.results.out)")),
    ];
    assert_no_errors(&validate(&spec(tasks)));
}

#[test]
fn three_task_cycle_reports_closing_edge() {
    let json = include_str!("fixtures/cycle_pipeline.json");
    let pipeline = pipeline_check::parse::parse(json).unwrap();
    let errors = validate::validate_graph(&pipeline.spec.tasks);
    assert_has_error(
        &errors,
        "invalid value: cycle detected; task \"bar\" depends on \"foo\"",
        "tasks",
    );
}

#[test]
fn cycle_through_result_reference() {
    let tasks = vec![
        with_param(task("foo"), "x", ParamValue::string("$(tasks.bar.results.out)")),
        run_after(task("bar"), &["foo"]),
    ];
    let errors = validate(&spec(tasks));
    assert_has_error(
        &errors,
        "invalid value: cycle detected; task \"bar\" depends on \"foo\"",
        "tasks",
    );
}

#[test]
fn self_reference_is_a_cycle() {
    let errors = validate(&spec(vec![run_after(task("foo"), &["foo"])]));
    assert_has_error(
        &errors,
        "invalid value: cycle detected; task \"foo\" depends on \"foo\"",
        "tasks",
    );
}

#[test]
fn dangling_run_after() {
    let errors = validate(&spec(vec![run_after(task("foo"), &["bar"])]));
    assert_has_error(
        &errors,
        "invalid value: couldn't add link between foo and bar: task foo depends on bar but bar wasn't present in Pipeline",
        "tasks",
    );
}

#[test]
fn dangling_result_reference() {
    let t = with_when(task("foo"), "$(tasks.ghost.results.out)", "in", &["x"]);
    let errors = validate(&spec(vec![t]));
    assert_has_error(
        &errors,
        "invalid value: couldn't add link between foo and ghost: task foo depends on ghost but ghost wasn't present in Pipeline",
        "tasks",
    );
}

#[test]
fn finally_tasks_do_not_join_the_graph() {
    let s = spec_with_finally(
        vec![task("foo")],
        vec![with_param(task("final"), "x", ParamValue::string("$(tasks.foo.results.out)"))],
    );
    assert_no_errors(&validate(&s));
}
