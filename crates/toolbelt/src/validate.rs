//! Argument validation against an [`ObjectSchema`].
//!
//! Errors are accumulated across every field; a call with three bad fields
//! reports three errors.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::{Constraints, FieldType, ObjectSchema, UnknownFields};

/// The constraint a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Type,
    Required,
    Minimum,
    Maximum,
    MinLength,
    MaxLength,
    MinItems,
    MaxItems,
    Enum,
    UnknownField,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Constraint::Type => "type",
            Constraint::Required => "required",
            Constraint::Minimum => "minimum",
            Constraint::Maximum => "maximum",
            Constraint::MinLength => "min_length",
            Constraint::MaxLength => "max_length",
            Constraint::MinItems => "min_items",
            Constraint::MaxItems => "max_items",
            Constraint::Enum => "enum",
            Constraint::UnknownField => "unknown_field",
        };
        f.write_str(name)
    }
}

/// A single violation: where, which rule, and a readable message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub constraint: Constraint,
    pub message: String,
}

impl FieldError {
    fn new(path: &str, constraint: Constraint, detail: impl fmt::Display) -> Self {
        let label = if path.is_empty() { "arguments" } else { path };
        Self {
            path: path.to_string(),
            constraint,
            message: format!("{label}: {detail}"),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// All violations collected for one value.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{}", join_messages(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn mentions(&self, path: &str) -> bool {
        self.0.iter().any(|e| e.path == path)
    }
}

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// The coerced record: declared fields only, defaults applied.
    Valid(Map<String, Value>),
    Invalid(ValidationErrors),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn into_result(self) -> Result<Map<String, Value>, ValidationErrors> {
        match self {
            ValidationResult::Valid(record) => Ok(record),
            ValidationResult::Invalid(errors) => Err(errors),
        }
    }
}

/// Validate `raw` against `schema`.
///
/// `null` is treated as an empty argument object. Any other non-object value
/// is rejected as a whole.
pub fn validate(schema: &ObjectSchema, raw: &Value) -> ValidationResult {
    let empty = Map::new();
    let input = match raw {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return ValidationResult::Invalid(ValidationErrors(vec![FieldError::new(
                "",
                Constraint::Type,
                format_args!("expected object, got {}", json_type(other)),
            )]));
        }
    };

    let mut errors = Vec::new();
    let mut record = Map::new();

    for field in &schema.fields {
        match input.get(&field.name) {
            None | Some(Value::Null) => {
                if let Some(default) = &field.default {
                    record.insert(field.name.clone(), default.clone());
                } else if field.required {
                    errors.push(FieldError::new(
                        &field.name,
                        Constraint::Required,
                        "required field is missing",
                    ));
                }
            }
            Some(value) => {
                let before = errors.len();
                check_value(
                    &field.name,
                    &field.field_type,
                    &field.constraints,
                    value,
                    &mut errors,
                );
                if errors.len() == before {
                    record.insert(field.name.clone(), normalize(&field.field_type, value));
                }
            }
        }
    }

    match schema.unknown_fields {
        UnknownFields::Reject => {
            for key in input.keys().filter(|k| schema.get(k).is_none()) {
                errors.push(FieldError::new(
                    key,
                    Constraint::UnknownField,
                    "field is not declared by the schema",
                ));
            }
        }
        UnknownFields::Ignore => {
            let ignored = input.keys().filter(|k| schema.get(k).is_none()).count();
            if ignored > 0 {
                tracing::trace!("Ignoring {ignored} undeclared argument(s)");
            }
        }
    }

    if errors.is_empty() {
        ValidationResult::Valid(record)
    } else {
        ValidationResult::Invalid(ValidationErrors(errors))
    }
}

fn check_value(
    path: &str,
    field_type: &FieldType,
    constraints: &Constraints,
    value: &Value,
    errors: &mut Vec<FieldError>,
) {
    match field_type {
        FieldType::Number => match value.as_f64() {
            Some(n) => check_range(path, n, constraints, errors),
            None => errors.push(type_error(path, field_type, value)),
        },
        FieldType::Integer => match as_integral(value) {
            Some(n) => check_range(path, n, constraints, errors),
            None => errors.push(type_error(path, field_type, value)),
        },
        FieldType::String => match value.as_str() {
            Some(s) => check_length(path, s.chars().count(), constraints, errors),
            None => errors.push(type_error(path, field_type, value)),
        },
        FieldType::Boolean => {
            if !value.is_boolean() {
                errors.push(type_error(path, field_type, value));
            }
        }
        FieldType::Enum { values } => match value.as_str() {
            Some(s) if values.iter().any(|v| v == s) => {}
            Some(s) => errors.push(FieldError::new(
                path,
                Constraint::Enum,
                format_args!("'{s}' is not one of [{}]", values.join(", ")),
            )),
            None => errors.push(FieldError::new(
                path,
                Constraint::Type,
                format_args!(
                    "expected one of [{}], got {}",
                    values.join(", "),
                    json_type(value)
                ),
            )),
        },
        FieldType::Array { items } => match value.as_array() {
            Some(elements) => {
                if let Some(min) = constraints.min_items {
                    if elements.len() < min {
                        errors.push(FieldError::new(
                            path,
                            Constraint::MinItems,
                            format_args!("expected at least {min} item(s), got {}", elements.len()),
                        ));
                    }
                }
                if let Some(max) = constraints.max_items {
                    if elements.len() > max {
                        errors.push(FieldError::new(
                            path,
                            Constraint::MaxItems,
                            format_args!("expected at most {max} item(s), got {}", elements.len()),
                        ));
                    }
                }
                let unconstrained = Constraints::default();
                for (i, element) in elements.iter().enumerate() {
                    check_value(&format!("{path}[{i}]"), items, &unconstrained, element, errors);
                }
            }
            None => errors.push(type_error(path, field_type, value)),
        },
    }
}

fn check_range(path: &str, n: f64, constraints: &Constraints, errors: &mut Vec<FieldError>) {
    if let Some(min) = constraints.minimum {
        if n < min {
            errors.push(FieldError::new(
                path,
                Constraint::Minimum,
                format_args!("{n} is less than the minimum of {min}"),
            ));
        }
    }
    if let Some(max) = constraints.maximum {
        if n > max {
            errors.push(FieldError::new(
                path,
                Constraint::Maximum,
                format_args!("{n} is greater than the maximum of {max}"),
            ));
        }
    }
}

fn check_length(path: &str, len: usize, constraints: &Constraints, errors: &mut Vec<FieldError>) {
    if let Some(min) = constraints.min_length {
        if len < min {
            errors.push(FieldError::new(
                path,
                Constraint::MinLength,
                format_args!("expected at least {min} character(s), got {len}"),
            ));
        }
    }
    if let Some(max) = constraints.max_length {
        if len > max {
            errors.push(FieldError::new(
                path,
                Constraint::MaxLength,
                format_args!("expected at most {max} character(s), got {len}"),
            ));
        }
    }
}

fn as_integral(value: &Value) -> Option<f64> {
    if let Some(n) = value.as_i64() {
        return Some(n as f64);
    }
    if let Some(n) = value.as_u64() {
        return Some(n as f64);
    }
    value.as_f64().filter(|n| n.fract() == 0.0)
}

/// Rewrite an already-checked value into its declared shape. Integral floats
/// such as `3.0` become JSON integers so handlers can deserialize them as such.
fn normalize(field_type: &FieldType, value: &Value) -> Value {
    match (field_type, value) {
        (FieldType::Integer, Value::Number(n)) if n.is_f64() => match n.as_f64() {
            Some(f) if f >= 0.0 && f <= u64::MAX as f64 => Value::from(f as u64),
            Some(f) if f >= i64::MIN as f64 => Value::from(f as i64),
            _ => value.clone(),
        },
        (FieldType::Array { items }, Value::Array(elements)) => {
            Value::Array(elements.iter().map(|e| normalize(items, e)).collect())
        }
        _ => value.clone(),
    }
}

fn type_error(path: &str, expected: &FieldType, value: &Value) -> FieldError {
    FieldError::new(
        path,
        Constraint::Type,
        format_args!("expected {}, got {}", expected.label(), json_type(value)),
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
