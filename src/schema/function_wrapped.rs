//! OpenAI-compatible dialect.
//!
//! Tools are wrapped as `{"type": "function", "function": {...}}` and system
//! messages stay inline in the message array. Used by OpenAI, Azure OpenAI
//! and Ollama.

use serde::Serialize;
use serde_json::{json, Value};

use super::{ChatRequest, DialectRenderer, FunctionSchema, ToolChoice};

pub struct FunctionWrappedDialect;

// --- API Request Types (OpenAI format) ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiTool<'a> {
    r#type: &'static str,
    function: &'a FunctionSchema,
}

fn tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Named(name) => json!({ "type": "function", "function": { "name": name } }),
    }
}

impl DialectRenderer for FunctionWrappedDialect {
    fn name(&self) -> &str {
        "OpenAI-Compatible"
    }

    fn render_tool(&self, schema: &FunctionSchema) -> Value {
        json!({ "type": "function", "function": schema })
    }

    fn build_request(&self, request: &ChatRequest) -> serde_json::Result<Value> {
        let messages = request
            .messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();

        let tools = request
            .tools
            .iter()
            .map(|t| ApiTool {
                r#type: "function",
                function: t,
            })
            .collect();

        serde_json::to_value(ApiRequest {
            model: &request.model,
            messages,
            tools,
            tool_choice: request.tool_choice.as_ref().map(tool_choice),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        })
    }
}
