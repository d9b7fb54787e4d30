//! Input and output schemas, described as data.
//!
//! A schema is an ordered list of field specifications. The same value drives
//! argument validation and the JSON Schema published in capability listings.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Semantic type of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Number,
    Integer,
    String,
    Boolean,
    /// One of a fixed set of string literals, matched case-sensitively.
    Enum { values: Vec<String> },
    Array { items: Box<FieldType> },
}

impl FieldType {
    /// Short name used in validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Enum { .. } => "enum",
            FieldType::Array { .. } => "array",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::String => json!({ "type": "string" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Enum { values } => json!({ "type": "string", "enum": values }),
            FieldType::Array { items } => json!({
                "type": "array",
                "items": items.to_json_schema(),
            }),
        }
    }
}

/// Inclusive bounds attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

/// One declared field of an object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub constraints: Constraints,
}

impl FieldSpec {
    /// A required field of the given type. Use [`FieldSpec::optional`] or
    /// [`FieldSpec::default_value`] to relax it.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            default: None,
            description: None,
            constraints: Constraints::default(),
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            FieldType::Enum {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn array(name: impl Into<String>, items: FieldType) -> Self {
        Self::new(
            name,
            FieldType::Array {
                items: Box::new(items),
            },
        )
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark the field optional and substitute `value` when it is absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn min(mut self, minimum: f64) -> Self {
        self.constraints.minimum = Some(minimum);
        self
    }

    pub fn max(mut self, maximum: f64) -> Self {
        self.constraints.maximum = Some(maximum);
        self
    }

    pub fn range(self, minimum: f64, maximum: f64) -> Self {
        self.min(minimum).max(maximum)
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.constraints.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.constraints.max_length = Some(len);
        self
    }

    pub fn min_items(mut self, len: usize) -> Self {
        self.constraints.min_items = Some(len);
        self
    }

    pub fn max_items(mut self, len: usize) -> Self {
        self.constraints.max_items = Some(len);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = self.field_type.to_json_schema();
        let Some(obj) = schema.as_object_mut() else {
            return schema;
        };
        if let Some(desc) = &self.description {
            obj.insert("description".to_string(), json!(desc));
        }
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        let c = &self.constraints;
        let bounds = [
            ("minimum", c.minimum.map(|v| json!(v))),
            ("maximum", c.maximum.map(|v| json!(v))),
            ("minLength", c.min_length.map(|v| json!(v))),
            ("maxLength", c.max_length.map(|v| json!(v))),
            ("minItems", c.min_items.map(|v| json!(v))),
            ("maxItems", c.max_items.map(|v| json!(v))),
        ];
        for (key, value) in bounds {
            if let Some(value) = value {
                obj.insert(key.to_string(), value);
            }
        }
        schema
    }
}

/// What to do with argument keys the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFields {
    /// Drop undeclared keys silently. Clients routinely send extra metadata,
    /// so this is the default.
    #[default]
    Ignore,
    /// Report every undeclared key as a validation error.
    Reject,
}

/// An object schema: declared fields in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub unknown_fields: UnknownFields,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Render as a JSON Schema object for capability listings.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.to_json_schema());
        }
        let required: Vec<&str> = self.required_fields().map(|f| f.name.as_str()).collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if let Some(obj) = schema.as_object_mut() {
            if !required.is_empty() {
                obj.insert("required".to_string(), json!(required));
            }
            if self.unknown_fields == UnknownFields::Reject {
                obj.insert("additionalProperties".to_string(), Value::Bool(false));
            }
        }
        schema
    }

    /// Render as MCP prompt argument entries (`name`, `description`, `required`).
    pub fn prompt_arguments(&self) -> Vec<Value> {
        self.fields
            .iter()
            .map(|f| {
                let mut arg = json!({ "name": f.name, "required": f.required });
                if let (Some(desc), Some(obj)) = (&f.description, arg.as_object_mut()) {
                    obj.insert("description".to_string(), json!(desc));
                }
                arg
            })
            .collect()
    }
}
