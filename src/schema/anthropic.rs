//! Anthropic (Claude) dialect.
//!
//! Key differences from the OpenAI-compatible dialect:
//! - system messages are extracted to a top-level `system` field
//! - tool definitions are not wrapped, and in requests their parameter
//!   schema goes under `input_schema` instead of `parameters`
//! - `tool_choice` is always an object (`{"type": "auto"}` etc.)

use serde::Serialize;
use serde_json::{json, Value};

use super::{ChatRequest, DialectRenderer, FunctionSchema, ToolChoice};
use crate::types::Role;

pub struct AnthropicDialect;

// --- API Request Types ---
// These match the Anthropic Messages API format

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

fn tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!({ "type": "auto" }),
        ToolChoice::None => json!({ "type": "none" }),
        ToolChoice::Named(name) => json!({ "type": "tool", "name": name }),
    }
}

impl DialectRenderer for AnthropicDialect {
    fn name(&self) -> &str {
        "Anthropic"
    }

    fn render_tool(&self, schema: &FunctionSchema) -> Value {
        json!(schema)
    }

    fn build_request(&self, request: &ChatRequest) -> serde_json::Result<Value> {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut messages = Vec::new();
        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::User | Role::Assistant => messages.push(ApiMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                }),
            }
        }
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        let tools = request
            .tools
            .iter()
            .map(|t| ApiTool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.parameters,
            })
            .collect();

        serde_json::to_value(ApiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            system,
            messages,
            tools,
            tool_choice: request.tool_choice.as_ref().map(tool_choice),
            temperature: request.temperature,
        })
    }
}
