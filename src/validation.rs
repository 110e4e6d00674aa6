//! Plan-time validation of configuration against a [`Schema`].
//!
//! Checks run before any request reaches the API: presence of required
//! attributes, value types, enum membership and JSON well-formedness.
//!
//! # Example
//!
//! ```
//! use authentik_provider::schema::{Attribute, Schema};
//! use authentik_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::resource()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("attributes", Attribute::json_string());
//!
//! assert!(validate(&schema, &json!({"name": "admins"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "admins", "attributes": "{"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("attributes".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema, Validator};
use serde_json::Value;

/// Validate a configuration value against a schema.
///
/// An empty list means the value is valid. Computed-only attributes are
/// skipped, null counts as unset.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            check_required(schema, &serde_json::Map::new(), &mut diagnostics);
            return diagnostics;
        },
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(other))),
            );
            return diagnostics;
        },
    };

    check_required(schema, obj, &mut diagnostics);

    for (name, attr) in &schema.attributes {
        if is_computed_only(attr) {
            continue;
        }
        if let Some(v) = obj.get(name).filter(|v| !v.is_null()) {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, name, &mut diagnostics);
            if diagnostics.len() == before {
                run_validators(attr, v, name, &mut diagnostics);
            }
        }
    }

    diagnostics
}

/// Validate a configuration value, returning the diagnostics as an error.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn check_required(
    schema: &Schema,
    obj: &serde_json::Map<String, Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr) in &schema.attributes {
        if !attr.flags.required {
            continue;
        }
        if obj.get(name).map_or(true, Value::is_null) {
            diagnostics.push(
                Diagnostic::error(format!("Missing required attribute '{}'", name))
                    .with_detail("This attribute is required and must be provided")
                    .with_attribute(name.as_str()),
            );
        }
    }
}

fn is_computed_only(attr: &Attribute) -> bool {
    attr.flags.computed && !attr.flags.optional && !attr.flags.required
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => {
            match value.as_array() {
                Some(arr) => {
                    for (i, elem) in arr.iter().enumerate() {
                        let elem_path = format!("{}.{}", path, i);
                        validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                    }
                },
                None => diagnostics.push(type_error(path, "list", value)),
            }
        },
        AttributeType::Map(value_type) => match value.as_object() {
            Some(obj) => {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, "map", value)),
        },
    }
}

fn run_validators(attr: &Attribute, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let Some(s) = value.as_str() else {
        return;
    };
    for validator in &attr.validators {
        match validator {
            Validator::OneOf(allowed) => {
                if !allowed.iter().any(|a| a == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(format!(
                                "Expected one of [{}], got \"{}\"",
                                allowed.join(", "),
                                s
                            ))
                            .with_attribute(path),
                    );
                }
            },
            Validator::Json => {
                if let Err(e) = serde_json::from_str::<Value>(s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Attribute '{}' is not valid JSON", path))
                            .with_detail(e.to_string())
                            .with_attribute(path),
                    );
                }
            },
            Validator::Url => {
                let ok = reqwest::Url::parse(s)
                    .map(|u| matches!(u.scheme(), "http" | "https"))
                    .unwrap_or(false);
                if !ok {
                    diagnostics.push(
                        Diagnostic::error(format!("Attribute '{}' is not a valid URL", path))
                            .with_detail(format!("Expected an absolute http(s) URL, got \"{}\"", s))
                            .with_attribute(path),
                    );
                }
            },
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.is_i64() {
                true
            } else if n.is_u64() {
                false
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}
