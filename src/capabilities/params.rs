//! Parameter declarations and decoded parameter values.
//!
//! Capabilities declare their contract with `CapabilityDescriptor` and
//! `ParamDescriptor` built explicitly at registration time. Incoming JSON
//! arguments are decoded once into the closed `ParamValue` union, guided by
//! the declared type, so capability bodies never inspect raw JSON.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CapabilityError;
use crate::types::LineChange;

/// Semantic type of a declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    StringArray,
    Map,
    /// Line-number-keyed map of `LineChange` records.
    LineChanges,
    /// A string restricted to the listed values.
    Enum(Vec<String>),
}

impl ParamType {
    pub fn one_of(values: &[&str]) -> Self {
        ParamType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// JSON-schema primitive name for this type.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::String | ParamType::Enum(_) => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "number",
            ParamType::Boolean => "boolean",
            ParamType::StringArray => "array",
            ParamType::Map | ParamType::LineChanges => "object",
        }
    }

    /// Whether a raw JSON value is compatible with this type.
    ///
    /// Line-change maps only need to be objects here; entry-level problems
    /// surface while decoding.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Float => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ParamType::Map | ParamType::LineChanges => value.is_object(),
            ParamType::Enum(values) => value
                .as_str()
                .is_some_and(|s| values.iter().any(|v| v == s)),
        }
    }

    /// Human-readable form used in mismatch messages.
    pub fn describe(&self) -> String {
        match self {
            ParamType::StringArray => "array of strings".to_string(),
            ParamType::LineChanges => "line-change map".to_string(),
            ParamType::Enum(values) => format!("one of [{}]", values.join(", ")),
            other => other.json_type().to_string(),
        }
    }
}

/// Name of a raw JSON value's runtime type.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// --- Descriptors ---

/// One declared parameter of a capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDescriptor {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Name, description and ordered parameter list of a capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamDescriptor>,
}

impl CapabilityDescriptor {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.parameters.push(param);
        self
    }

    /// Lowercased name used as the registry key.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.parameters.iter().filter(|p| p.required)
    }

    pub fn supported_parameters(&self) -> BTreeMap<String, ParamType> {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.param_type.clone()))
            .collect()
    }
}

// --- Values ---

/// A decoded parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<String>),
    Map(Map<String, Value>),
    LineChanges(BTreeMap<u32, LineChange>),
}

impl ParamValue {
    /// Decode `value` as the declared type of parameter `name`.
    pub fn decode(name: &str, param_type: &ParamType, value: Value) -> Result<Self, CapabilityError> {
        let mismatch = |value: &Value| {
            CapabilityError::invalid(format!(
                "Parameter '{}' expects {} but got {}",
                name,
                param_type.describe(),
                json_kind(value)
            ))
        };

        match param_type {
            ParamType::String | ParamType::Enum(_) => match value {
                Value::String(s) => Ok(ParamValue::String(s)),
                other => Err(mismatch(&other)),
            },
            ParamType::Integer => value
                .as_i64()
                .map(ParamValue::Integer)
                .ok_or_else(|| mismatch(&value)),
            ParamType::Float => value
                .as_f64()
                .map(ParamValue::Float)
                .ok_or_else(|| mismatch(&value)),
            ParamType::Boolean => value
                .as_bool()
                .map(ParamValue::Boolean)
                .ok_or_else(|| mismatch(&value)),
            ParamType::StringArray => match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s),
                        other => Err(mismatch(&other)),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(ParamValue::List),
                other => Err(mismatch(&other)),
            },
            ParamType::Map => match value {
                Value::Object(map) => Ok(ParamValue::Map(map)),
                other => Err(mismatch(&other)),
            },
            ParamType::LineChanges => match value {
                Value::Object(map) => decode_line_changes(name, map).map(ParamValue::LineChanges),
                other => Err(mismatch(&other)),
            },
        }
    }
}

fn decode_line_changes(
    name: &str,
    map: Map<String, Value>,
) -> Result<BTreeMap<u32, LineChange>, CapabilityError> {
    let mut changes = BTreeMap::new();
    for (key, entry) in map {
        let line = key
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                CapabilityError::invalid(format!(
                    "Parameter '{}': '{}' is not a valid 1-based line number",
                    name, key
                ))
            })?;
        let change: LineChange = serde_json::from_value(entry).map_err(|e| {
            CapabilityError::invalid(format!(
                "Parameter '{}': invalid line change at line {}: {}",
                name, line, e
            ))
        })?;
        if changes.insert(line, change).is_some() {
            return Err(CapabilityError::invalid(format!(
                "Parameter '{}': line {} appears more than once",
                name, line
            )));
        }
    }
    Ok(changes)
}

/// Decoded, validated arguments handed to a capability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_lowercase(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn require_str(&self, name: &str) -> Result<&str, CapabilityError> {
        self.str(name).ok_or_else(|| {
            CapabilityError::invalid(format!("Missing required parameter: {}", name))
        })
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ParamValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ParamValue::Float(f)) => Some(*f),
            Some(ParamValue::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ParamValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ParamValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn map(&self, name: &str) -> Option<&Map<String, Value>> {
        match self.values.get(name) {
            Some(ParamValue::Map(map)) => Some(map),
            _ => None,
        }
    }

    pub fn line_changes(&self, name: &str) -> Option<&BTreeMap<u32, LineChange>> {
        match self.values.get(name) {
            Some(ParamValue::LineChanges(changes)) => Some(changes),
            _ => None,
        }
    }
}
