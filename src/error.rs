//! Field-scoped validation errors shared by every analysis.
//!
//! Every pass returns a [`FieldErrors`] aggregate instead of failing fast. Paths
//! are built bottom-up: a rule reports the field it looked at (often the empty
//! "current field") and callers prefix it with `via_*` as the error travels up
//! through the task list, the phase and finally the spec.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

pub const CURRENT_FIELD: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Missing one-of field, duplicate name, empty required field.
    Structural,
    /// Unrecognized type tag, type/default mismatch, scalar/array confusion.
    Type,
    /// Undefined parameter/task/property, malformed expression, wrong arity.
    Reference,
    Graph,
    PhaseRule,
    Workspace,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Structural => write!(f, "Structural"),
            ErrorKind::Type => write!(f, "Type"),
            ErrorKind::Reference => write!(f, "Reference"),
            ErrorKind::Graph => write!(f, "Graph"),
            ErrorKind::PhaseRule => write!(f, "Phase rule"),
            ErrorKind::Workspace => write!(f, "Workspace"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub message: String,
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.paths.join(", "))?;
        if let Some(details) = &self.details {
            write!(f, "\n{}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldError {}

impl FieldError {
    pub fn new<I, S>(kind: ErrorKind, message: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldError {
            kind,
            message: message.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            details: None,
        }
    }

    /// `invalid value: <value>` at a single path.
    pub fn invalid_value(kind: ErrorKind, value: impl fmt::Display, path: &str) -> Self {
        FieldError::new(kind, format!("invalid value: {}", value), [path])
    }

    pub fn missing_field<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldError::new(ErrorKind::Structural, "missing field(s)", paths)
    }

    pub fn missing_one_of<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldError::new(ErrorKind::Structural, "expected exactly one, got neither", paths)
    }

    pub fn multiple_one_of<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldError::new(ErrorKind::Structural, "expected exactly one, got both", paths)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn via_field(mut self, prefix: &str) -> Self {
        self.paths = self
            .paths
            .iter()
            .map(|path| join_path(prefix, path))
            .collect();
        self
    }

    pub fn via_index(self, index: usize) -> Self {
        self.via_field(&format!("[{}]", index))
    }

    pub fn via_key(self, key: &str) -> Self {
        self.via_field(&format!("[{}]", key))
    }

    pub fn via_field_index(self, field: &str, index: usize) -> Self {
        self.via_index(index).via_field(field)
    }

    pub fn via_field_key(self, field: &str, key: &str) -> Self {
        self.via_key(key).via_field(field)
    }
}

/// Aggregate of every error produced by one or more passes.
///
/// Raw errors are kept in insertion order; [`FieldErrors::merged`] produces the
/// canonical view where identical messages share one entry with all their paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        FieldErrors::default()
    }

    /// Errors with an empty message carry no information and are dropped.
    pub fn push(&mut self, error: FieldError) {
        if !error.message.is_empty() {
            self.errors.push(error);
        }
    }

    pub fn extend(&mut self, other: FieldErrors) {
        self.errors.extend(other.errors);
    }

    pub fn also(mut self, other: FieldErrors) -> Self {
        self.extend(other);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of distinct (merged) errors.
    pub fn len(&self) -> usize {
        self.merged().len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn has_message(&self, message: &str) -> bool {
        self.errors.iter().any(|e| e.message == message)
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Union paths of errors sharing message and details, sort the paths, and
    /// order the result by message then details.
    pub fn merged(&self) -> Vec<FieldError> {
        let mut by_key: BTreeMap<(&str, Option<&str>), FieldError> = BTreeMap::new();
        for error in &self.errors {
            let key = (error.message.as_str(), error.details.as_deref());
            match by_key.get_mut(&key) {
                Some(existing) => existing.paths.extend(error.paths.iter().cloned()),
                None => {
                    by_key.insert(key, error.clone());
                }
            }
        }

        by_key
            .into_values()
            .map(|mut error| {
                error.paths.sort();
                error.paths.dedup();
                error
            })
            .collect()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn via_field(self, prefix: &str) -> Self {
        self.map(|e| e.via_field(prefix))
    }

    pub fn via_index(self, index: usize) -> Self {
        self.map(|e| e.via_index(index))
    }

    pub fn via_key(self, key: &str) -> Self {
        self.map(|e| e.via_key(key))
    }

    pub fn via_field_index(self, field: &str, index: usize) -> Self {
        self.map(|e| e.via_field_index(field, index))
    }

    pub fn via_field_key(self, field: &str, key: &str) -> Self {
        self.map(|e| e.via_field_key(field, key))
    }

    fn map(self, f: impl Fn(FieldError) -> FieldError) -> Self {
        FieldErrors {
            errors: self.errors.into_iter().map(f).collect(),
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.merged().iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join("\n"))
    }
}

impl std::error::Error for FieldErrors {}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.merged().serialize(serializer)
    }
}

impl From<FieldError> for FieldErrors {
    fn from(error: FieldError) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(error);
        errors
    }
}

impl FromIterator<FieldError> for FieldErrors {
    fn from_iter<T: IntoIterator<Item = FieldError>>(iter: T) -> Self {
        let mut errors = FieldErrors::new();
        for error in iter {
            errors.push(error);
        }
        errors
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Join a prefix onto a path, folding index segments into the preceding field:
/// `tasks` + `[0].name` becomes `tasks[0].name`, never `tasks.[0].name`.
fn join_path(prefix: &str, path: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for segment in split_segments(prefix).chain(split_segments(path)) {
        if segment.is_empty() {
            continue;
        }
        let is_index = segment.starts_with('[') && segment.ends_with(']');
        match parts.last_mut() {
            Some(last) if is_index => last.push_str(segment),
            _ => parts.push(segment.to_string()),
        }
    }
    parts.join(".")
}

/// Split on dots that are not inside `[...]`, and split `a[0]` into `a`, `[0]`.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in path.char_indices() {
        match c {
            '[' => {
                if depth == 0 && i > start {
                    segments.push(&path[start..i]);
                    start = i;
                }
                depth += 1;
            }
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    segments.push(&path[start..=i]);
                    start = i + 1;
                }
            }
            '.' if depth == 0 => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);
    segments.into_iter()
}
