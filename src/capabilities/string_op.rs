//! String transformation capability.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::types::CapabilityResult;

pub struct StringOpCapability;

#[async_trait]
impl Capability for StringOpCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new("string_op", "Apply a simple transformation to a piece of text.")
            .param(ParamDescriptor::required("text", ParamType::String, "The input text"))
            .param(ParamDescriptor::required(
                "operation",
                ParamType::one_of(&["upper", "lower", "title", "reverse", "trim", "length"]),
                "The transformation to apply",
            ))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let text = params.require_str("text")?;
        let operation = params.require_str("operation")?;

        let output = match operation {
            "upper" => json!(text.to_uppercase()),
            "lower" => json!(text.to_lowercase()),
            "title" => json!(title_case(text)),
            "reverse" => json!(text.chars().rev().collect::<String>()),
            "trim" => json!(text.trim()),
            _ => json!(text.chars().count()),
        };

        let message = match &output {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok(CapabilityResult::success(
            json!({ "operation": operation, "result": output }),
            message,
        ))
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
