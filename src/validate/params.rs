//! Pipeline-level parameter declarations: type tags, defaults, object
//! properties and name uniqueness.

use std::collections::HashSet;

use crate::error::{CURRENT_FIELD, ErrorKind, FieldError, FieldErrors};
use crate::parse::types::{ParamSpec, ParamType};

/// Check every declaration. Paths are rooted at `params`.
pub fn validate_param_specs(params: &[ParamSpec]) -> FieldErrors {
    let mut errors = FieldErrors::new();

    for param in params {
        known_type(param, &mut errors);
        default_matches_type(param, &mut errors);
        object_properties(param, &mut errors);
    }
    unique_names(params, &mut errors);

    errors
}

fn known_type(param: &ParamSpec, errors: &mut FieldErrors) {
    if let Some(t @ ParamType::Unknown(_)) = &param.param_type {
        errors.push(
            FieldError::invalid_value(ErrorKind::Type, t, "type")
                .via_field(&param.name)
                .via_field("params"),
        );
    }
}

fn default_matches_type(param: &ParamSpec, errors: &mut FieldErrors) {
    let (Some(declared), Some(default)) = (&param.param_type, &param.default) else {
        return;
    };
    let default_type = default.param_type();
    if declared.is_known() && *declared != default_type {
        errors.push(
            FieldError::new(
                ErrorKind::Type,
                format!(
                    "\"{}\" type does not match default value's type: \"{}\"",
                    declared, default_type
                ),
                ["type", "default.type"],
            )
            .via_field(&param.name)
            .via_field("params"),
        );
    }
}

fn object_properties(param: &ParamSpec, errors: &mut FieldErrors) {
    if param.declared_type() != ParamType::Object {
        return;
    }
    let properties = match &param.properties {
        Some(properties) if !properties.is_empty() => properties,
        _ => {
            errors.push(
                FieldError::missing_field(["properties"])
                    .via_field(&param.name)
                    .via_field("params"),
            );
            return;
        }
    };

    let invalid: Vec<&str> = properties
        .iter()
        .filter(|(_, spec)| spec.param_type != ParamType::String)
        .map(|(key, _)| key.as_str())
        .collect();
    if !invalid.is_empty() {
        errors.push(
            FieldError::new(
                ErrorKind::Type,
                format!(
                    "The value type specified for these keys [{}] is invalid",
                    invalid.join(" ")
                ),
                ["properties"],
            )
            .via_field(&param.name)
            .via_field("params"),
        );
    }
}

fn unique_names(params: &[ParamSpec], errors: &mut FieldErrors) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for param in params {
        if !seen.insert(param.name.as_str()) && reported.insert(param.name.as_str()) {
            errors.push(
                FieldError::new(
                    ErrorKind::Structural,
                    "parameter appears more than once",
                    [CURRENT_FIELD],
                )
                .via_field_key("params", &param.name),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::parse::types::{ParamValue, PropertySpec};

    fn spec(name: &str, t: ParamType, default: Option<ParamValue>) -> ParamSpec {
        ParamSpec {
            default,
            ..ParamSpec::new(name, t)
        }
    }

    #[test]
    fn valid_declarations_pass() {
        let params = vec![
            spec("a", ParamType::String, Some(ParamValue::string("x"))),
            spec("b", ParamType::Array, Some(ParamValue::array(["x", "y"]))),
        ];
        assert!(validate_param_specs(&params).is_empty());
    }

    #[test]
    fn unknown_type() {
        let params = vec![spec("foo", ParamType::Unknown("invalidtype".into()), None)];
        assert_eq!(
            validate_param_specs(&params).to_string(),
            "invalid value: invalidtype: params.foo.type"
        );
    }

    #[test]
    fn default_type_mismatch() {
        let params = vec![spec("foo", ParamType::Array, Some(ParamValue::string("x")))];
        assert_eq!(
            validate_param_specs(&params).to_string(),
            "\"array\" type does not match default value's type: \"string\": params.foo.default.type, params.foo.type"
        );
    }

    #[test]
    fn duplicates_reported_once_per_name() {
        let params = vec![
            spec("baz", ParamType::String, None),
            spec("baz", ParamType::Array, None),
            spec("baz", ParamType::String, None),
        ];
        let errors = validate_param_specs(&params);
        assert_eq!(errors.iter().count(), 1);
        assert_eq!(errors.to_string(), "parameter appears more than once: params[baz]");
    }

    #[test]
    fn object_needs_string_properties() {
        let mut obj = spec("obj", ParamType::Object, None);
        assert_eq!(
            validate_param_specs(std::slice::from_ref(&obj)).to_string(),
            "missing field(s): params.obj.properties"
        );

        obj.properties = Some(BTreeMap::from([
            ("a".to_string(), PropertySpec::default()),
            (
                "b".to_string(),
                PropertySpec {
                    param_type: ParamType::Array,
                },
            ),
        ]));
        assert_eq!(
            validate_param_specs(&[obj]).to_string(),
            "The value type specified for these keys [b] is invalid: params.obj.properties"
        );
    }
}
