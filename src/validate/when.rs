//! When-expression shape: operator, values and result references.

use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};
use crate::parse::types::{Phase, PipelineTask, WhenExpression, WhenOperator};

use super::results::unparsed_result_refs;

/// Validate every when-expression of `tasks`. Paths are `PHASE[i].when[j]`.
pub fn validate_when_expressions(phase: Phase, tasks: &[PipelineTask]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (i, task) in tasks.iter().enumerate() {
        for (j, when) in task.when.iter().enumerate() {
            errors.extend(
                validate_when(when)
                    .via_field_index("when", j)
                    .via_field_index(phase.field(), i),
            );
        }
    }
    errors
}

fn validate_when(when: &WhenExpression) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if when.is_blank() {
        errors.push(FieldError::missing_field([CURRENT_FIELD]));
        return errors;
    }

    if when.operator().is_none() {
        errors.push(FieldError::invalid_value(
            ErrorKind::Structural,
            format!(
                "operator \"{}\" is not recognized. valid operators: {}",
                when.operator,
                WhenOperator::VALID.join(",")
            ),
            CURRENT_FIELD,
        ));
    }
    if when.values.is_empty() {
        errors.push(FieldError::invalid_value(
            ErrorKind::Structural,
            "expecting non-empty values field",
            CURRENT_FIELD,
        ));
    }
    if let Some(error) = unparsed_result_refs(when.strings()) {
        errors.push(error);
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::types::TaskRef;

    fn task(when: Vec<WhenExpression>) -> PipelineTask {
        PipelineTask {
            name: "bar".into(),
            task_ref: Some(TaskRef::named("t")),
            when,
            ..PipelineTask::default()
        }
    }

    #[test]
    fn valid_expressions() {
        let t = task(vec![
            WhenExpression::new("foo", "in", ["foo"]),
            WhenExpression::new("$(tasks.a.results.b)", "notin", ["x", "y"]),
        ]);
        assert!(validate_when_expressions(Phase::Dag, &[t]).is_empty());
    }

    #[test]
    fn blank_expression_is_only_missing() {
        let t = task(vec![WhenExpression::default()]);
        assert_eq!(
            validate_when_expressions(Phase::Finally, &[t]).to_string(),
            "missing field(s): finally[0].when[0]"
        );
    }

    #[test]
    fn bad_operator_and_empty_values_accumulate() {
        let t = task(vec![WhenExpression::new("foo", "exists", Vec::<String>::new())]);
        let errors = validate_when_expressions(Phase::Dag, &[t]);
        assert_eq!(
            errors.to_string(),
            "invalid value: expecting non-empty values field: tasks[0].when[0]\n\
             invalid value: operator \"exists\" is not recognized. valid operators: in,notin: tasks[0].when[0]"
        );
    }

    #[test]
    fn operator_is_case_sensitive() {
        let t = task(vec![WhenExpression::new("foo", "In", ["foo"])]);
        assert!(
            validate_when_expressions(Phase::Dag, &[t])
                .has_message("invalid value: operator \"In\" is not recognized. valid operators: in,notin")
        );
    }

    #[test]
    fn malformed_result_reference() {
        let t = task(vec![WhenExpression::new("$(tasks.a-task.resultTypo.bResult)", "in", ["foo"])]);
        assert_eq!(
            validate_when_expressions(Phase::Dag, &[t]).to_string(),
            "invalid value: expected all of the expressions [tasks.a-task.resultTypo.bResult] to be result expressions but only [] were: tasks[0].when[0]"
        );
    }
}
