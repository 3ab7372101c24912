//! Per-task structure: names, task body and task-side params.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::FeatureFlags;
use crate::error::{ErrorKind, FieldError, FieldErrors};
use crate::parse::types::{EmbeddedTask, Phase, PipelineTask, TaskBody, TaskRef};

pub const DNS_LABEL_MAX_LEN: usize = 63;

static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid DNS label regex"));

const TASK_NAME_DETAILS: &str = "Pipeline Task name must be a valid DNS Label.For more info refer to https://kubernetes.io/docs/concepts/overview/working-with-objects/names/#names";

/// RFC 1123 label: lowercase alphanumerics and '-', at most 63 characters.
pub fn is_dns_label(name: &str) -> bool {
    name.len() <= DNS_LABEL_MAX_LEN && DNS_LABEL.is_match(name)
}

/// Validate DAG tasks then finally tasks. A name is unique across both phases;
/// later occurrences are the ones reported.
pub fn validate_pipeline_tasks(
    flags: &FeatureFlags,
    tasks: &[PipelineTask],
    finally: &[PipelineTask],
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let mut names = HashSet::new();

    for (phase, phase_tasks) in [(Phase::Dag, tasks), (Phase::Finally, finally)] {
        for (i, task) in phase_tasks.iter().enumerate() {
            let mut task_errors = validate_pipeline_task(flags, task);
            if !names.insert(task.name.as_str()) {
                task_errors.push(FieldError::multiple_one_of(["name"]));
            }
            errors.extend(task_errors.via_field_index(phase.field(), i));
        }
    }

    errors
}

/// Checks that need nothing but the task itself. Paths are task-relative.
pub fn validate_pipeline_task(flags: &FeatureFlags, task: &PipelineTask) -> FieldErrors {
    let mut errors = FieldErrors::new();

    name_is_dns_label(task, &mut errors);
    match task.body() {
        Some(TaskBody::Ref(task_ref)) => validate_task_ref(flags, task_ref, &mut errors),
        Some(TaskBody::Embedded(spec)) => validate_embedded(flags, spec, &mut errors),
        None if task.task_ref.is_some() => {
            errors.push(FieldError::multiple_one_of(["taskRef", "taskSpec"]));
        }
        None => errors.push(FieldError::missing_one_of(["taskRef", "taskSpec"])),
    }
    unique_param_names(task, &mut errors);

    errors
}

fn name_is_dns_label(task: &PipelineTask, errors: &mut FieldErrors) {
    if !is_dns_label(&task.name) {
        errors.push(
            FieldError::new(
                ErrorKind::Structural,
                format!("invalid value \"{}\"", task.name),
                ["name"],
            )
            .with_details(TASK_NAME_DETAILS),
        );
    }
}

fn validate_task_ref(flags: &FeatureFlags, task_ref: &TaskRef, errors: &mut FieldErrors) {
    if !task_ref.is_custom() {
        if task_ref.name.is_empty() {
            errors.push(FieldError::missing_field(["taskRef.name"]));
        }
        return;
    }

    if !flags.enable_custom_tasks {
        errors.push(custom_tasks_disabled("taskRef"));
    }
    if task_ref.kind.is_empty() {
        errors.push(FieldError::invalid_value(
            ErrorKind::Structural,
            "custom task ref must specify kind",
            "taskRef.kind",
        ));
    }
    if task_ref.api_version.is_empty() {
        errors.push(FieldError::invalid_value(
            ErrorKind::Structural,
            "custom task ref must specify apiVersion",
            "taskRef.apiVersion",
        ));
    }
}

fn validate_embedded(flags: &FeatureFlags, spec: &EmbeddedTask, errors: &mut FieldErrors) {
    let typed = !spec.api_version.is_empty() || !spec.kind.is_empty();

    if !spec.steps.is_empty() {
        if !spec.api_version.is_empty() {
            errors.push(FieldError::invalid_value(
                ErrorKind::Structural,
                "taskSpec.apiVersion cannot be specified when using taskSpec.steps",
                "taskSpec.apiVersion",
            ));
        }
        if !spec.kind.is_empty() {
            errors.push(FieldError::invalid_value(
                ErrorKind::Structural,
                "taskSpec.kind cannot be specified when using taskSpec.steps",
                "taskSpec.kind",
            ));
        }
    } else if typed {
        // An embedded spec carrying only type metadata is a custom task.
        if !flags.enable_custom_tasks {
            errors.push(custom_tasks_disabled("taskSpec"));
        }
    } else {
        errors.push(FieldError::missing_field(["taskSpec.steps"]));
    }
}

fn custom_tasks_disabled(path: &str) -> FieldError {
    FieldError::new(
        ErrorKind::Structural,
        "custom task ref requires \"enable-custom-tasks\" feature gate to be \"true\"",
        [path],
    )
}

fn unique_param_names(task: &PipelineTask, errors: &mut FieldErrors) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (j, param) in task.params.iter().enumerate() {
        if seen.insert(param.name.as_str(), j).is_some() {
            errors.push(
                FieldError::new(
                    ErrorKind::Structural,
                    format!(
                        "parameter names must be unique, the parameter \"{}\" is also defined at",
                        param.name
                    ),
                    ["name"],
                )
                .via_field_index("params", j),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::types::{Param, ParamValue, Step};

    fn task(name: &str) -> PipelineTask {
        PipelineTask {
            name: name.into(),
            task_ref: Some(TaskRef::named("foo-task")),
            ..PipelineTask::default()
        }
    }

    fn check(task: PipelineTask) -> String {
        validate_pipeline_tasks(&FeatureFlags::default(), &[task], &[]).to_string()
    }

    #[test]
    fn dns_labels() {
        assert!(is_dns_label("foo-bar1"));
        assert!(!is_dns_label("Foo"));
        assert!(!is_dns_label("-foo"));
        assert!(!is_dns_label("foo_bar"));
        assert!(!is_dns_label(""));
        assert!(!is_dns_label(&"a".repeat(64)));
    }

    #[test]
    fn invalid_task_name_has_details() {
        assert_eq!(
            check(task("_foo")),
            format!("invalid value \"_foo\": tasks[0].name\n{}", TASK_NAME_DETAILS)
        );
    }

    #[test]
    fn invalid_task_name_is_quoted_verbatim() {
        assert_eq!(
            check(task("a\"b\\c")),
            format!("invalid value \"a\"b\\c\": tasks[0].name\n{}", TASK_NAME_DETAILS)
        );
    }

    #[test]
    fn duplicate_across_phases() {
        let errors = validate_pipeline_tasks(&FeatureFlags::default(), &[task("foo")], &[task("foo")]);
        assert_eq!(errors.to_string(), "expected exactly one, got both: finally[0].name");
    }

    #[test]
    fn task_body_one_of() {
        let mut both = task("foo");
        both.task_spec = Some(EmbeddedTask {
            steps: vec![Step::default()],
            ..EmbeddedTask::default()
        });
        assert_eq!(
            check(both),
            "expected exactly one, got both: tasks[0].taskRef, tasks[0].taskSpec"
        );

        let mut neither = task("foo");
        neither.task_ref = None;
        assert_eq!(
            check(neither),
            "expected exactly one, got neither: tasks[0].taskRef, tasks[0].taskSpec"
        );
    }

    #[test]
    fn task_ref_needs_name() {
        let mut t = task("foo");
        t.task_ref = Some(TaskRef::default());
        assert_eq!(check(t), "missing field(s): tasks[0].taskRef.name");
    }

    #[test]
    fn custom_task_ref() {
        let mut t = task("foo");
        t.task_ref = Some(TaskRef {
            name: "x".into(),
            kind: "Example".into(),
            api_version: String::new(),
        });
        assert_eq!(
            check(t.clone()),
            "custom task ref requires \"enable-custom-tasks\" feature gate to be \"true\": tasks[0].taskRef\n\
             invalid value: custom task ref must specify apiVersion: tasks[0].taskRef.apiVersion"
        );

        let flags = FeatureFlags {
            enable_custom_tasks: true,
            ..FeatureFlags::default()
        };
        t.task_ref = Some(TaskRef {
            name: "x".into(),
            kind: "Example".into(),
            api_version: "example.dev/v0".into(),
        });
        assert!(validate_pipeline_tasks(&flags, &[t], &[]).is_empty());
    }

    #[test]
    fn embedded_spec_rules() {
        let mut t = task("foo");
        t.task_ref = None;
        t.task_spec = Some(EmbeddedTask {
            kind: "Task".into(),
            steps: vec![Step::default()],
            ..EmbeddedTask::default()
        });
        assert_eq!(
            check(t.clone()),
            "invalid value: taskSpec.kind cannot be specified when using taskSpec.steps: tasks[0].taskSpec.kind"
        );

        t.task_spec = Some(EmbeddedTask::default());
        assert_eq!(check(t), "missing field(s): tasks[0].taskSpec.steps");
    }

    #[test]
    fn duplicate_task_params() {
        let mut t = task("foo");
        t.params = vec![
            Param::new("p", ParamValue::string("a")),
            Param::new("p", ParamValue::string("b")),
        ];
        assert_eq!(
            check(t),
            "parameter names must be unique, the parameter \"p\" is also defined at: tasks[0].params[1].name"
        );
    }
}
