//! Dependency graph validation for the DAG phase: dangling links and cycles.

use std::collections::HashSet;

use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};
use crate::parse::graph::PipelineGraph;
use crate::parse::types::PipelineTask;

/// Build the graph over `tasks` and reject missing dependencies and cycles.
/// Errors are reported at `tasks`.
pub fn validate_graph(tasks: &[PipelineTask]) -> FieldErrors {
    let mut errors = FieldErrors::new();

    match PipelineGraph::build(tasks) {
        Ok(graph) => no_cycles(tasks, &graph, &mut errors),
        Err(link_errors) => errors.extend(link_errors),
    }

    errors.via_field("tasks")
}

/// Depth-first search from every task in declaration order. The first edge
/// that reaches a task still on the stack closes the cycle and is reported.
fn no_cycles(tasks: &[PipelineTask], graph: &PipelineGraph, errors: &mut FieldErrors) {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();

    for task in tasks {
        if visited.contains(task.name.as_str()) {
            continue;
        }
        if let Some((from, to)) = find_cycle(&task.name, graph, &mut visited, &mut on_stack) {
            errors.push(FieldError::invalid_value(
                ErrorKind::Graph,
                format!("cycle detected; task \"{}\" depends on \"{}\"", from, to),
                CURRENT_FIELD,
            ));
            return;
        }
    }
}

fn find_cycle<'a>(
    node: &'a str,
    graph: &'a PipelineGraph,
    visited: &mut HashSet<&'a str>,
    on_stack: &mut HashSet<&'a str>,
) -> Option<(&'a str, &'a str)> {
    visited.insert(node);
    on_stack.insert(node);

    for dep in graph.dependencies(node) {
        if on_stack.contains(dep) {
            return Some((node, dep));
        }
        if !visited.contains(dep) {
            if let Some(edge) = find_cycle(dep, graph, visited, on_stack) {
                return Some(edge);
            }
        }
    }

    on_stack.remove(node);
    None
}
