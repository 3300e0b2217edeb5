//! Form state for a backend-defined tool.
//!
//! The initial value map depends on the schema alone. Raw user input is
//! coerced to the field's JSON type on [`ToolForm::set`] and the whole map is
//! checked by [`ToolForm::validate`] before submit.

use serde_json::{Map, Number, Value};

use super::error::{FieldError, ToolError};
use super::schema::{FieldDescriptor, FieldKind, ToolSchema};

#[derive(Debug, Clone)]
pub struct ToolForm {
    schema: ToolSchema,
    values: Map<String, Value>,
}

impl ToolForm {
    pub fn from_schema(schema: ToolSchema) -> Self {
        let values = schema
            .fields
            .iter()
            .map(|field| (field.key.clone(), initial_value(field)))
            .collect();
        Self { schema, values }
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a field from its textual form.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), ToolError> {
        let field = self
            .schema
            .field(key)
            .ok_or_else(|| ToolError::UnknownField(key.to_string()))?;
        let value = coerce(field, raw)?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Check every field, collecting all failures.
    pub fn validate(&self) -> Result<(), ToolError> {
        let errors: Vec<FieldError> = self
            .schema
            .fields
            .iter()
            .filter_map(|field| check(field, self.values.get(&field.key).unwrap_or(&Value::Null)))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ToolError::Validation(errors))
        }
    }

    /// Request body for the run endpoint.
    pub fn to_payload(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

fn initial_value(field: &FieldDescriptor) -> Value {
    match field.kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Url => match &field.default {
            Some(Value::String(s)) => Value::String(s.clone()),
            Some(Value::Number(n)) => Value::String(n.to_string()),
            _ => Value::String(String::new()),
        },
        FieldKind::Number | FieldKind::Range => match &field.default {
            Some(Value::Number(n)) => Value::Number(n.clone()),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(number)
                .unwrap_or_else(|| fallback_number(field)),
            _ => fallback_number(field),
        },
        FieldKind::Checkbox => Value::Bool(matches!(field.default, Some(Value::Bool(true)))),
        FieldKind::Select => match &field.default {
            Some(Value::String(s)) => Value::String(s.clone()),
            _ => Value::String(
                field
                    .options
                    .first()
                    .map(|o| o.value().to_string())
                    .unwrap_or_default(),
            ),
        },
    }
}

fn fallback_number(field: &FieldDescriptor) -> Value {
    field
        .min
        .and_then(number)
        .unwrap_or_else(|| Value::Number(Number::from(0)))
}

/// Integral values stay integers on the wire.
fn number(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Some(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Value::Number)
}

fn coerce(field: &FieldDescriptor, raw: &str) -> Result<Value, ToolError> {
    let invalid = |reason: &str| ToolError::InvalidValue {
        key: field.key.clone(),
        reason: reason.to_string(),
    };

    match field.kind {
        FieldKind::Text | FieldKind::Textarea | FieldKind::Url => Ok(Value::String(raw.to_string())),
        FieldKind::Number | FieldKind::Range => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(number)
            .ok_or_else(|| invalid("expected a number")),
        FieldKind::Checkbox => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(Value::Bool(false)),
            _ => Err(invalid("expected true or false")),
        },
        FieldKind::Select => {
            if field.has_option(raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(invalid(&format!("expected one of: {}", option_list(field))))
            }
        }
    }
}

fn check(field: &FieldDescriptor, value: &Value) -> Option<FieldError> {
    let key = || field.key.clone();

    if field.required && is_blank(value) {
        return Some(FieldError::Required(key()));
    }

    match field.kind {
        FieldKind::Number | FieldKind::Range => {
            let n = value.as_f64()?;
            let below = field.min.is_some_and(|min| n < min);
            let above = field.max.is_some_and(|max| n > max);
            (below || above).then(|| FieldError::OutOfRange {
                key: key(),
                min: bound(field.min),
                max: bound(field.max),
            })
        }
        FieldKind::Url => {
            let s = value.as_str().filter(|s| !s.is_empty())?;
            url::Url::parse(s).is_err().then(|| FieldError::InvalidUrl(key()))
        }
        FieldKind::Select => {
            let s = value.as_str().filter(|s| !s.is_empty())?;
            (!field.options.is_empty() && !field.has_option(s)).then(|| FieldError::NotAnOption {
                key: key(),
                allowed: option_list(field),
            })
        }
        FieldKind::Text | FieldKind::Textarea | FieldKind::Checkbox => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn bound(limit: Option<f64>) -> String {
    limit.map(|v| v.to_string()).unwrap_or_else(|| "any".to_string())
}

fn option_list(field: &FieldDescriptor) -> String {
    field
        .options
        .iter()
        .map(|o| o.value())
        .collect::<Vec<_>>()
        .join(", ")
}
