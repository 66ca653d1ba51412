//! Declarative tool parameter schemas.
//!
//! A tool describes its parameters either as a [`ParamSchema`] (a list of
//! typed fields with constraints, checked by [`ParamSchema::validate`]) or as
//! a raw JSON Schema mapping that is forwarded to the model untouched and
//! not validated locally.

use serde_json::{Map, Value, json};

/// The JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Wording used in validation messages ("Input should be a valid ...").
    fn expectation(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "dictionary",
            Self::Array => "list",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// A single named parameter.
#[derive(Debug, Clone)]
pub struct ParamField {
    pub name: String,
    pub ty: ParamType,
    pub description: String,
    pub required: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub default: Option<Value>,
}

impl ParamField {
    pub fn new(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            description: description.into(),
            required: false,
            minimum: None,
            maximum: None,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Inclusive lower bound for numeric parameters.
    pub fn min(mut self, minimum: impl Into<f64>) -> Self {
        self.minimum = Some(minimum.into());
        self
    }

    /// Inclusive upper bound for numeric parameters.
    pub fn max(mut self, maximum: impl Into<f64>) -> Self {
        self.maximum = Some(maximum.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn check(&self, value: Option<&Value>, errors: &mut Vec<String>) {
        let value = match value {
            None | Some(Value::Null) => {
                if self.required {
                    errors.push(format!("Parameter '{}': Field required", self.name));
                }
                return;
            }
            Some(v) => v,
        };

        if !self.ty.matches(value) {
            errors.push(format!(
                "Parameter '{}': Input should be a valid {}",
                self.name,
                self.ty.expectation()
            ));
            return;
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum
                && n < min
            {
                errors.push(format!(
                    "Parameter '{}': Input should be greater than or equal to {}",
                    self.name,
                    format_bound(min)
                ));
            }
            if let Some(max) = self.maximum
                && n > max
            {
                errors.push(format!(
                    "Parameter '{}': Input should be less than or equal to {}",
                    self.name,
                    format_bound(max)
                ));
            }
        }
    }

    fn to_property(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.ty.as_str()));
        if !self.description.is_empty() {
            prop.insert("description".into(), json!(self.description));
        }
        if let Some(min) = self.minimum {
            prop.insert("minimum".into(), bound_value(min));
        }
        if let Some(max) = self.maximum {
            prop.insert("maximum".into(), bound_value(max));
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        Value::Object(prop)
    }
}

fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}

fn bound_value(bound: f64) -> Value {
    if bound.fract() == 0.0 {
        json!(bound as i64)
    } else {
        json!(bound)
    }
}

/// An ordered set of typed parameters.
#[derive(Debug, Clone, Default)]
pub struct ParamSchema {
    pub fields: Vec<ParamField>,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: ParamField) -> Self {
        self.fields.push(field);
        self
    }

    /// Check `params` against every field, one message per violated parameter.
    ///
    /// Unknown keys are ignored.
    pub fn validate(&self, params: &Map<String, Value>) -> Vec<String> {
        let mut errors = Vec::new();
        for field in &self.fields {
            field.check(params.get(&field.name), &mut errors);
        }
        errors
    }

    /// Render as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_property()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// How a tool declares its parameters.
#[derive(Debug, Clone)]
pub enum ToolSchema {
    /// Typed fields, validated locally before execution.
    Params(ParamSchema),
    /// A raw JSON Schema mapping, optionally wrapped in `{"parameters": ...}`.
    Raw(Value),
}

impl ToolSchema {
    /// Validation errors for `params`; raw schemas always pass.
    pub fn validate(&self, params: &Map<String, Value>) -> Vec<String> {
        match self {
            Self::Params(schema) => schema.validate(params),
            Self::Raw(_) => Vec::new(),
        }
    }

    /// The `parameters` value to advertise, or `None` when the tool declares
    /// nothing (the request builder substitutes an empty object schema).
    pub fn parameters(&self) -> Option<Value> {
        match self {
            Self::Params(schema) => Some(schema.to_json_schema()),
            Self::Raw(Value::Object(map)) if map.is_empty() => None,
            Self::Raw(Value::Object(map)) => match map.get("parameters") {
                Some(inner) => Some(inner.clone()),
                None => Some(Value::Object(map.clone())),
            },
            Self::Raw(_) => None,
        }
    }
}

impl From<ParamSchema> for ToolSchema {
    fn from(schema: ParamSchema) -> Self {
        Self::Params(schema)
    }
}
