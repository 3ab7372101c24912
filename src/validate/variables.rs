//! Parameter and context variable usage inside task params and
//! when-expressions.
//!
//! Every `$(params.X)` must name a declared parameter, array and object
//! parameters may only be substituted whole where a list is expected, and
//! object keys must be declared properties. Unknown `context.*` variables are
//! always rejected.

use std::collections::HashMap;

use crate::config::FeatureFlags;
use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};
use crate::parse::types::{ParamSpec, ParamType, ParamValue, Phase, PipelineTask};
use crate::reference::{self, Expression, Reference};

/// Where a string sits, which decides how array and object parameters may
/// appear in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    /// A string task param; `$(params.X[*])` is allowed as the whole value.
    StringParam,
    /// One element of an array task param or of a when-expression's values.
    ArrayElement,
    /// A when-expression input or one entry of an object task param.
    Scalar,
}

/// Check parameter and context references in `tasks` of `phase` against the
/// declared `params`. Paths are rooted at the phase field.
pub fn validate_parameter_variables(
    flags: &FeatureFlags,
    phase: Phase,
    tasks: &[PipelineTask],
    params: &[ParamSpec],
) -> FieldErrors {
    let declared: HashMap<&str, &ParamSpec> = params.iter().map(|p| (p.name.as_str(), p)).collect();
    let checker = Checker { flags, declared };

    let mut errors = FieldErrors::new();
    for (i, task) in tasks.iter().enumerate() {
        errors.extend(checker.task(task).via_field_index(phase.field(), i));
    }
    errors
}

struct Checker<'a> {
    flags: &'a FeatureFlags,
    declared: HashMap<&'a str, &'a ParamSpec>,
}

impl Checker<'_> {
    fn task(&self, task: &PipelineTask) -> FieldErrors {
        let mut errors = FieldErrors::new();

        for param in &task.params {
            let param_errors = match &param.value {
                ParamValue::String(value) => self.value(value, Site::StringParam),
                ParamValue::Array(items) => {
                    let mut item_errors = FieldErrors::new();
                    for (j, item) in items.iter().enumerate() {
                        item_errors.extend(
                            self.value(item, Site::ArrayElement)
                                .via_field_index("value", j),
                        );
                    }
                    item_errors
                }
                ParamValue::Object(entries) => {
                    let mut entry_errors = FieldErrors::new();
                    for (key, entry) in entries {
                        entry_errors.extend(
                            self.value(entry, Site::Scalar)
                                .via_field_key("properties", key),
                        );
                    }
                    entry_errors
                }
            };
            errors.extend(param_errors.via_field_key("params", &param.name));
        }

        for (j, when) in task.when.iter().enumerate() {
            let mut when_errors = self.value(&when.input, Site::Scalar).via_field("input");
            for value in &when.values {
                when_errors.extend(self.value(value, Site::ArrayElement).via_field("values"));
            }
            errors.extend(when_errors.via_field_index("when", j));
        }

        errors
    }

    fn value(&self, value: &str, site: Site) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for expr in reference::expressions(value) {
            if let Some(problem) = self.expression(expr, value, site) {
                errors.push(problem.error(value));
            }
        }
        if reference::malformed(value).iter().any(Expression::is_variable) {
            errors.push(Problem::Malformed.error(value));
        }
        errors
    }

    fn expression(&self, expr: Expression<'_>, value: &str, site: Site) -> Option<Problem> {
        match expr.reference() {
            Reference::Param { name, key, whole } => {
                let Some(spec) = self.declared.get(name) else {
                    return self.flags.validate_declarations().then_some(Problem::NonExistent);
                };
                let declared = spec.declared_type();
                match key {
                    Some(key) if declared == ParamType::Object => {
                        let known = spec
                            .properties
                            .as_ref()
                            .is_some_and(|props| props.contains_key(key));
                        (self.flags.enable_object_params && !known).then_some(Problem::NonExistent)
                    }
                    Some(_) => self.flags.validate_declarations().then_some(Problem::NonExistent),
                    None if matches!(declared, ParamType::Array | ParamType::Object) => {
                        let isolated = expr.is_isolated_in(value);
                        match site {
                            Site::StringParam if whole && isolated => None,
                            Site::ArrayElement if isolated => None,
                            Site::ArrayElement => Some(Problem::NotIsolated),
                            Site::StringParam | Site::Scalar => Some(Problem::TypeInvalid),
                        }
                    }
                    None => None,
                }
            }
            reference @ Reference::Context { .. } if !reference.is_known_context() => {
                Some(Problem::NonExistent)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Problem {
    NonExistent,
    TypeInvalid,
    NotIsolated,
    Malformed,
}

impl Problem {
    fn text(self) -> &'static str {
        match self {
            Problem::NonExistent => "non-existent variable",
            Problem::TypeInvalid => "variable type invalid",
            Problem::NotIsolated => "variable is not properly isolated",
            Problem::Malformed => "malformed variable",
        }
    }

    fn error(self, value: &str) -> FieldError {
        FieldError::new(
            ErrorKind::Reference,
            format!("{} in \"{}\"", self.text(), value),
            [CURRENT_FIELD],
        )
    }
}
