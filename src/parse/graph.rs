//! petgraph-based dependency graph over the DAG-phase tasks.
//!
//! Edges point from a dependency to the task that runs after it. Finally
//! tasks are never part of the graph.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::PipelineTask;
use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};
use crate::reference::{self, Reference};

#[derive(Debug, Clone)]
pub struct PipelineGraph {
    pub graph: DiGraph<String, ()>,
    pub node_indices: HashMap<String, NodeIndex>,
    /// Per task, dependency names in discovery order.
    dependencies: HashMap<String, Vec<String>>,
}

/// Dependencies of a task: `runAfter` entries first, then tasks whose results
/// are referenced from params and when-expressions. Duplicates keep their
/// first position.
pub fn task_dependencies(task: &PipelineTask) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    let mut add = |name: &str| {
        if !deps.iter().any(|d| d == name) {
            deps.push(name.to_string());
        }
    };

    for name in &task.run_after {
        add(name);
    }

    let param_strings = task.params.iter().flat_map(|p| p.value.strings());
    let when_strings = task.when.iter().flat_map(|w| w.strings());
    for value in param_strings.chain(when_strings) {
        for expr in reference::expressions(value) {
            if let Reference::Result { task: dep, .. } = expr.reference() {
                add(dep);
            }
        }
    }

    deps
}

impl PipelineGraph {
    /// Every dependency must name a task in `tasks`; missing ones are all
    /// reported. Cycles are accepted here and detected by validation.
    pub fn build(tasks: &[PipelineTask]) -> Result<Self, FieldErrors> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let mut dependencies = HashMap::new();
        let mut errors = FieldErrors::new();

        for task in tasks {
            let idx = graph.add_node(task.name.clone());
            node_indices.insert(task.name.clone(), idx);
        }

        for task in tasks {
            let deps = task_dependencies(task);
            let target = node_indices[&task.name];
            for dep in &deps {
                match node_indices.get(dep) {
                    Some(&source) => {
                        graph.add_edge(source, target, ());
                    }
                    None => {
                        errors.push(FieldError::invalid_value(
                            ErrorKind::Graph,
                            format!(
                                "couldn't add link between {task} and {dep}: task {task} depends on {dep} but {dep} wasn't present in Pipeline",
                                task = task.name,
                            ),
                            CURRENT_FIELD,
                        ));
                    }
                }
            }
            tracing::trace!(task = %task.name, dependencies = deps.len(), "linked task");
            dependencies.insert(task.name.clone(), deps);
        }

        errors.into_result()?;
        Ok(PipelineGraph {
            graph,
            node_indices,
            dependencies,
        })
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    /// Tasks `name` runs after, in discovery order.
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.dependencies
            .get(name)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Tasks that run after `name`, in declaration order.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(name) else {
            return vec![];
        };
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        out.sort();
        out.dedup();
        out.into_iter().map(|n| self.graph[n].as_str()).collect()
    }

    /// Tasks with no dependencies, in declaration order.
    pub fn roots(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    /// Tasks nothing depends on, in declaration order.
    pub fn leaves(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    /// A linearization where every task follows its dependencies, or the name
    /// of a task on a cycle.
    pub fn execution_order(&self) -> Result<Vec<&str>, String> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx].as_str()).collect())
            .map_err(|cycle| self.graph[cycle.node_id()].clone())
    }
}
