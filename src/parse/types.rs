//! Rust types for the declarative pipeline document.
//!
//! These are the serde target for pipeline JSON (camelCase keys). Validation
//! treats them as read-only; nothing in this crate mutates a parsed pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// TOP-LEVEL PIPELINE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pipeline {
    pub metadata: ObjectMeta,
    pub spec: PipelineSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSpec {
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub tasks: Vec<PipelineTask>,
    pub finally: Vec<PipelineTask>,
    pub workspaces: Vec<WorkspaceDeclaration>,
    pub results: Vec<PipelineResult>,
}

impl PipelineSpec {
    pub fn is_empty(&self) -> bool {
        self == &PipelineSpec::default()
    }

    pub fn phase_tasks(&self, phase: Phase) -> &[PipelineTask] {
        match phase {
            Phase::Dag => &self.tasks,
            Phase::Finally => &self.finally,
        }
    }
}

/// Which section of the spec a task lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Ordered by the dependency graph.
    Dag,
    /// Unordered; runs after the whole DAG phase.
    Finally,
}

impl Phase {
    /// Field name of the phase in the spec, used as a path segment.
    pub fn field(&self) -> &'static str {
        match self {
            Phase::Dag => "tasks",
            Phase::Finally => "finally",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field())
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Declared parameter type. Unrecognized tags are kept so they can be reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParamType {
    #[default]
    String,
    Array,
    Object,
    Unknown(String),
}

impl ParamType {
    pub fn as_str(&self) -> &str {
        match self {
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ParamType::Unknown(_))
    }
}

impl From<String> for ParamType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "string" => ParamType::String,
            "array" => ParamType::Array,
            "object" => ParamType::Object,
            _ => ParamType::Unknown(tag),
        }
    }
}

impl From<ParamType> for String {
    fn from(t: ParamType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParamType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertySpec>>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        ParamSpec {
            name: name.into(),
            param_type: Some(param_type),
            ..ParamSpec::default()
        }
    }

    /// Explicit type, else the default value's type, else string.
    pub fn declared_type(&self) -> ParamType {
        match (&self.param_type, &self.default) {
            (Some(t), _) => t.clone(),
            (None, Some(default)) => default.param_type(),
            (None, None) => ParamType::String,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
}

/// A parameter value as written by the author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Array(Vec<String>),
    Object(BTreeMap<String, String>),
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::String(String::new())
    }
}

impl ParamValue {
    pub fn string(value: impl Into<String>) -> Self {
        ParamValue::String(value.into())
    }

    pub fn array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamValue::Array(values.into_iter().map(Into::into).collect())
    }

    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ParamValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::String(_) => ParamType::String,
            ParamValue::Array(_) => ParamType::Array,
            ParamValue::Object(_) => ParamType::Object,
        }
    }

    /// Every string carried by the value, in a stable order.
    pub fn strings(&self) -> Vec<&str> {
        match self {
            ParamValue::String(s) => vec![s.as_str()],
            ParamValue::Array(items) => items.iter().map(String::as_str).collect(),
            ParamValue::Object(entries) => entries.values().map(String::as_str).collect(),
        }
    }
}

/// A task-side parameter binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

impl Param {
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Param {
            name: name.into(),
            value,
        }
    }
}

// =============================================================================
// TASKS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineTask {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_ref: Option<TaskRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_spec: Option<EmbeddedTask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub when: Vec<WhenExpression>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_after: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<WorkspaceBinding>,
}

/// How a task's steps are provided. Only available once exactly one of
/// `taskRef` / `taskSpec` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskBody<'a> {
    Ref(&'a TaskRef),
    Embedded(&'a EmbeddedTask),
}

impl PipelineTask {
    pub fn body(&self) -> Option<TaskBody<'_>> {
        match (&self.task_ref, &self.task_spec) {
            (Some(r), None) => Some(TaskBody::Ref(r)),
            (None, Some(s)) => Some(TaskBody::Embedded(s)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRef {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

impl TaskRef {
    pub fn named(name: impl Into<String>) -> Self {
        TaskRef {
            name: name.into(),
            ..TaskRef::default()
        }
    }

    /// References anything other than the built-in task kinds.
    pub fn is_custom(&self) -> bool {
        !self.api_version.is_empty() || !matches!(self.kind.as_str(), "" | "Task" | "ClusterTask")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddedTask {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<TaskResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskResult {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub result_type: Option<ParamType>,
}

// =============================================================================
// WHEN EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenOperator {
    In,
    NotIn,
}

impl WhenOperator {
    pub const VALID: [&'static str; 2] = ["in", "notin"];

    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "in" => Some(WhenOperator::In),
            "notin" => Some(WhenOperator::NotIn),
            _ => None,
        }
    }
}

/// Conditional guard. The operator is kept verbatim so that unknown operators
/// can be reported as written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhenExpression {
    pub input: String,
    pub operator: String,
    pub values: Vec<String>,
}

impl WhenExpression {
    pub fn new<I, S>(input: impl Into<String>, operator: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WhenExpression {
            input: input.into(),
            operator: operator.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.input.is_empty() && self.operator.is_empty() && self.values.is_empty()
    }

    pub fn operator(&self) -> Option<WhenOperator> {
        WhenOperator::parse(&self.operator)
    }

    /// Input followed by values.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.input.as_str()).chain(self.values.iter().map(String::as_str))
    }
}

// =============================================================================
// RESULTS & WORKSPACES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineResult {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceDeclaration {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub optional: bool,
}

/// Binds a task-side workspace name to a pipeline-level declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceBinding {
    pub name: String,
    /// Pipeline-level workspace; empty means "same as `name`".
    pub workspace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sub_path: String,
}

impl WorkspaceBinding {
    pub fn pipeline_workspace(&self) -> &str {
        if self.workspace.is_empty() {
            &self.name
        } else {
            &self.workspace
        }
    }
}
