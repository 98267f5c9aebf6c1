//! Generic "apis" dialect.
//!
//! Same unwrapped tool entries as the Anthropic dialect, published under
//! `apis` with the selection under `api_choice`. System messages stay inline.

use serde::Serialize;
use serde_json::{json, Value};

use super::{ChatRequest, DialectRenderer, FunctionSchema, ToolChoice};

pub struct ApiListDialect;

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    apis: Vec<&'a FunctionSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_choice: Option<Value>,
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

fn api_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Named(name) => json!({ "name": name }),
    }
}

impl DialectRenderer for ApiListDialect {
    fn name(&self) -> &str {
        "Generic"
    }

    fn tools_key(&self) -> &'static str {
        "apis"
    }

    fn render_tool(&self, schema: &FunctionSchema) -> Value {
        json!(schema)
    }

    fn build_request(&self, request: &ChatRequest) -> serde_json::Result<Value> {
        serde_json::to_value(ApiRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            apis: request.tools.iter().collect(),
            api_choice: request.tool_choice.as_ref().map(api_choice),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        })
    }
}
