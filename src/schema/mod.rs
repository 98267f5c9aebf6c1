//! Schema derivation and request shaping for provider tool-calling dialects.
//!
//! Each registered capability is first turned into a provider-agnostic
//! `FunctionSchema` (name, description, JSON-schema parameters). A dialect
//! then decides how that list is wrapped and where it goes in a request.
//!
//! Key concepts:
//! - **Provider**: a model vendor; parsed from config/CLI strings
//! - **Dialect**: the JSON shape a provider expects. Several providers share
//!   one dialect, so selection is a pure mapping `Provider -> Dialect`
//! - **DialectRenderer**: one implementation per dialect, the same way each
//!   LLM API gets its own module with its own request types

pub mod anthropic;
pub mod api_list;
pub mod function_wrapped;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::capabilities::{CapabilityDescriptor, ParamDescriptor, ParamType};
use crate::error::CapabilityError;
use crate::types::Message;

// --- Providers and dialects ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    AzureOpenAi,
    Ollama,
    Anthropic,
    Generic,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAi,
        Provider::AzureOpenAi,
        Provider::Ollama,
        Provider::Anthropic,
        Provider::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::AzureOpenAi => "azure_openai",
            Provider::Ollama => "ollama",
            Provider::Anthropic => "anthropic",
            Provider::Generic => "generic",
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Provider::OpenAi | Provider::AzureOpenAi | Provider::Ollama => Dialect::FunctionWrapped,
            Provider::Anthropic => Dialect::Flat,
            Provider::Generic => Dialect::ApiList,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let key = match key.as_str() {
            "openai_compatible" => "openai",
            "azure" => "azure_openai",
            other => other,
        };
        Provider::ALL
            .into_iter()
            .find(|provider| provider.as_str() == key)
            .ok_or_else(|| CapabilityError::UnsupportedDialect(s.to_string()))
    }
}

/// JSON shape used to expose capabilities to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `tools: [{type: "function", function: {...}}]`
    FunctionWrapped,
    /// `tools: [{name, description, parameters}]`
    Flat,
    /// `apis: [{name, description, parameters}]`
    ApiList,
}

impl Dialect {
    pub fn renderer(&self) -> Box<dyn DialectRenderer> {
        match self {
            Dialect::FunctionWrapped => Box::new(function_wrapped::FunctionWrappedDialect),
            Dialect::Flat => Box::new(anthropic::AnthropicDialect),
            Dialect::ApiList => Box::new(api_list::ApiListDialect),
        }
    }
}

/// Renders tool lists and complete request bodies in one dialect.
pub trait DialectRenderer: Send + Sync {
    /// Display name (for logging).
    fn name(&self) -> &str;

    /// Key under which the tool list is published.
    fn tools_key(&self) -> &'static str {
        "tools"
    }

    /// One entry of the published tool list.
    fn render_tool(&self, schema: &FunctionSchema) -> Value;

    /// Full request body for `request`.
    fn build_request(&self, request: &ChatRequest) -> serde_json::Result<Value>;
}

// --- Intermediate schema ---

/// Provider-agnostic description of one callable capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionSchema {
    pub fn from_descriptor(descriptor: &CapabilityDescriptor) -> Self {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &descriptor.parameters {
            let key = param.name.to_lowercase();
            properties.insert(key.clone(), property_schema(param));
            if param.required {
                required.push(Value::String(key));
            }
        }

        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

/// Entry schema for each value of a line-change map.
pub fn line_change_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "changeType": {
                "type": "string",
                "enum": ["Added", "Modified", "Deleted", "Context"]
            },
            "content": { "type": "string" },
            "originalContent": { "type": "string" }
        },
        "required": ["changeType", "content"]
    })
}

/// JSON schema for a single declared parameter.
pub fn property_schema(param: &ParamDescriptor) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), json!(param.param_type.json_type()));
    schema.insert("description".into(), json!(param.description));

    match &param.param_type {
        ParamType::StringArray => {
            schema.insert("items".into(), json!({ "type": "string" }));
        }
        ParamType::Enum(values) => {
            schema.insert("enum".into(), json!(values));
        }
        ParamType::LineChanges => {
            schema.insert("additionalProperties".into(), line_change_schema());
        }
        _ => {}
    }

    if let Some(default) = &param.default {
        schema.insert("default".into(), default.clone());
    }
    Value::Object(schema)
}

pub fn function_schemas(descriptors: &[CapabilityDescriptor]) -> Vec<FunctionSchema> {
    descriptors.iter().map(FunctionSchema::from_descriptor).collect()
}

/// Schema document for `descriptors` in `provider`'s dialect.
pub fn derive_schema(descriptors: &[CapabilityDescriptor], provider: Provider) -> Value {
    let renderer = provider.dialect().renderer();
    let tools: Vec<Value> = function_schemas(descriptors)
        .iter()
        .map(|schema| renderer.render_tool(schema))
        .collect();

    let mut document = Map::new();
    document.insert(renderer.tools_key().to_string(), Value::Array(tools));
    Value::Object(document)
}

/// Like [`derive_schema`], selecting the provider by name.
pub fn derive_schema_for(
    descriptors: &[CapabilityDescriptor],
    provider: &str,
) -> Result<Value, CapabilityError> {
    Ok(derive_schema(descriptors, provider.parse()?))
}

// --- Request shaping ---

/// Which tool the model should call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Named(String),
}

impl FromStr for ToolChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "auto" => ToolChoice::Auto,
            "none" => ToolChoice::None,
            name => ToolChoice::Named(name.to_string()),
        })
    }
}

/// A request to shape into a provider body.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<FunctionSchema>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub tool_choice: Option<ToolChoice>,
}

/// Shape `request` into `provider`'s request body.
pub fn build_request(provider: Provider, request: &ChatRequest) -> serde_json::Result<Value> {
    provider.dialect().renderer().build_request(request)
}
