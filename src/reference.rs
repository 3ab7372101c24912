//! Tokenize and classify `$(...)` variable expressions.
//!
//! [`expressions`] walks a string and yields every `$(...)` it contains;
//! [`Expression::reference`] turns the inner text into a typed [`Reference`].
//! Validators match on the variant instead of re-parsing strings.

use std::fmt;

const PARAMS_PREFIX: &str = "params.";
const CONTEXT_PREFIX: &str = "context.";
const TASKS_PART: &str = "tasks";
const RESULTS_PART: &str = "results";
const STATUS_PART: &str = "status";
const WHOLE_SUFFIX: &str = "[*]";

/// Context variables a pipeline may reference.
pub const CONTEXT_VARIABLES: [&str; 5] = [
    "pipelineRun.name",
    "pipelineRun.namespace",
    "pipelineRun.uid",
    "pipeline.name",
    "pipelineTask.retries",
];

/// One `$(...)` occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expression<'a> {
    raw: &'a str,
    inner: &'a str,
}

impl<'a> Expression<'a> {
    /// Text between `$(` and `)`.
    pub fn as_str(&self) -> &'a str {
        self.inner
    }

    /// The expression is the entire value, so whole-array and whole-object
    /// substitution is allowed.
    pub fn is_isolated_in(&self, value: &str) -> bool {
        value == self.raw
    }

    pub fn looks_like_result_ref(&self) -> bool {
        looks_like_result_ref(self.inner)
    }

    /// Written as a `params.` or `context.` variable, whether or not it
    /// parses.
    pub fn is_variable(&self) -> bool {
        self.inner.starts_with(PARAMS_PREFIX) || self.inner.starts_with(CONTEXT_PREFIX)
    }

    pub fn reference(&self) -> Reference<'a> {
        classify(self.inner)
    }
}

impl fmt::Display for Expression<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `params.NAME`, `params.NAME[*]` (whole) or `params.NAME.KEY`.
    Param {
        name: &'a str,
        key: Option<&'a str>,
        whole: bool,
    },
    /// `tasks.T.results.R`, optionally `R[N]`/`R[*]` or `R.KEY`. `result`
    /// has any array selector stripped.
    Result {
        task: &'a str,
        result: &'a str,
        key: Option<&'a str>,
    },
    /// `tasks.T.status`.
    TaskStatus { task: &'a str },
    /// `tasks.status`.
    AggregateStatus,
    /// `context.SCOPE.NAME`; `variable` is everything after `context.`.
    Context { variable: &'a str },
    Malformed,
}

impl Reference<'_> {
    pub fn is_status(&self) -> bool {
        matches!(self, Reference::TaskStatus { .. } | Reference::AggregateStatus)
    }

    pub fn is_known_context(&self) -> bool {
        match self {
            Reference::Context { variable } => CONTEXT_VARIABLES.contains(variable),
            _ => false,
        }
    }
}

/// Iterator over the `$(...)` expressions of a string.
#[derive(Debug, Clone)]
pub struct Expressions<'a> {
    source: &'a str,
    pos: usize,
}

/// All `$(...)` expressions in `source`, in order. A nested `$(` restarts the
/// scan, so `$(a.$(b))` yields only `b`.
pub fn expressions(source: &str) -> Expressions<'_> {
    Expressions { source, pos: 0 }
}

impl<'a> Iterator for Expressions<'a> {
    type Item = Expression<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = self.source.get(self.pos..)?;
            let open = self.pos + rest.find("$(")?;
            let body_start = open + 2;
            let body = &self.source[body_start..];

            let close = body.find(')');
            let nested = body.find("$(");
            match (close, nested) {
                (Some(c), Some(n)) if n < c => {
                    self.pos = body_start + n;
                }
                (Some(c), _) => {
                    self.pos = body_start + c + 1;
                    return Some(Expression {
                        raw: &self.source[open..self.pos],
                        inner: &body[..c],
                    });
                }
                (None, _) => {
                    self.pos = self.source.len();
                    return None;
                }
            }
        }
    }
}

/// At least four dot segments starting with `tasks`.
pub fn looks_like_result_ref(expression: &str) -> bool {
    let mut segments = expression.split('.');
    segments.next() == Some(TASKS_PART) && segments.count() >= 3
}

/// Expressions in `source` that do not classify as any known reference.
pub fn malformed(source: &str) -> Vec<Expression<'_>> {
    expressions(source)
        .filter(|e| e.reference() == Reference::Malformed)
        .collect()
}

/// Result-like expressions in `source`, split into all of them and the ones
/// that actually parse as result references.
pub fn result_like(source: &str) -> (Vec<Expression<'_>>, Vec<Expression<'_>>) {
    let candidates: Vec<Expression<'_>> = expressions(source)
        .filter(Expression::looks_like_result_ref)
        .collect();
    let parsed = candidates
        .iter()
        .copied()
        .filter(|e| matches!(e.reference(), Reference::Result { .. }))
        .collect();
    (candidates, parsed)
}

/// Classify the text between `$(` and `)`.
pub fn classify(inner: &str) -> Reference<'_> {
    if let Some(rest) = inner.strip_prefix(PARAMS_PREFIX) {
        return classify_param(rest);
    }
    if let Some(variable) = inner.strip_prefix(CONTEXT_PREFIX) {
        if variable.is_empty() {
            return Reference::Malformed;
        }
        return Reference::Context { variable };
    }

    let segments: Vec<&str> = inner.split('.').collect();
    if segments.first() != Some(&TASKS_PART) || segments.iter().any(|s| s.is_empty()) {
        return Reference::Malformed;
    }

    match segments.as_slice() {
        [_, STATUS_PART] => Reference::AggregateStatus,
        [_, task, STATUS_PART] => Reference::TaskStatus { task: *task },
        [_, task, RESULTS_PART, result] => classify_result(task, result, None),
        [_, task, RESULTS_PART, result, key] => classify_result(task, result, Some(*key)),
        _ => Reference::Malformed,
    }
}

fn classify_param(rest: &str) -> Reference<'_> {
    if let Some(name) = rest.strip_suffix(WHOLE_SUFFIX) {
        if name.is_empty() || name.contains(['.', '[', ']']) {
            return Reference::Malformed;
        }
        return Reference::Param {
            name,
            key: None,
            whole: true,
        };
    }

    let (name, key) = match rest.split_once('.') {
        Some((name, key)) => (name, Some(key)),
        None => (rest, None),
    };
    if name.is_empty() || key == Some("") {
        return Reference::Malformed;
    }
    Reference::Param {
        name,
        key,
        whole: false,
    }
}

fn classify_result<'a>(task: &'a str, result: &'a str, key: Option<&'a str>) -> Reference<'a> {
    let result = match result.split_once('[') {
        None => result,
        Some((name, index)) => {
            let valid = index
                .strip_suffix(']')
                .is_some_and(|i| i == "*" || i.parse::<usize>().is_ok());
            if !valid || key.is_some() {
                return Reference::Malformed;
            }
            name
        }
    };

    if result.is_empty() {
        return Reference::Malformed;
    }
    Reference::Result { task, result, key }
}
