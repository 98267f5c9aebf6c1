//! Random integer capability.

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde_json::json;

use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::error::CapabilityError;
use crate::types::CapabilityResult;

pub struct RandomNumberCapability;

#[async_trait]
impl Capability for RandomNumberCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "random_number",
            "Generate a uniformly distributed random integer between min and max (inclusive).",
        )
        .param(ParamDescriptor::optional("min", ParamType::Integer, "Lower bound").with_default(json!(0)))
        .param(ParamDescriptor::optional("max", ParamType::Integer, "Upper bound").with_default(json!(100)))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let min = params.i64("min").unwrap_or(0);
        let max = params.i64("max").unwrap_or(100);
        if min > max {
            return Err(CapabilityError::invalid(format!(
                "min ({}) must not be greater than max ({})",
                min, max
            ))
            .into());
        }

        let value = rand::thread_rng().gen_range(min..=max);
        Ok(CapabilityResult::success(
            json!({ "value": value, "min": min, "max": max }),
            value.to_string(),
        ))
    }
}
