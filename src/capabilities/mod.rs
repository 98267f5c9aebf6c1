//! Capability system.
//!
//! This module defines the `Capability` trait and the built-in capabilities.
//! Together with the `Registry` they form the invocation framework.
//!
//! Key concepts:
//! - **Capability trait**: every capability declares its contract as a
//!   `CapabilityDescriptor` (name, description, typed parameters) and
//!   exposes one async `execute` operation
//! - **Params**: arguments are validated and decoded by the registry before
//!   `execute` runs, so capability bodies work with typed values only
//! - **CapabilityResult**: every invocation ends in `Success` or `Failure`;
//!   errors returned from `execute` are folded into `Failure` by the registry

pub mod answer;
pub mod apply_changes;
pub mod datetime;
pub mod params;
pub mod random_number;
pub mod read_file;
pub mod registry;
pub mod string_op;
pub mod system_info;
pub mod url_parse;
pub mod web;
pub mod write_file;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::answers::AnswerStore;
use crate::config::AppConfig;
use crate::types::CapabilityResult;

pub use params::{CapabilityDescriptor, ParamDescriptor, ParamType, Params};
pub use registry::Registry;

/// Trait that all capabilities must implement.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Name, description and parameter contract.
    ///
    /// Called once when the capability is registered.
    fn descriptor(&self) -> CapabilityDescriptor;

    /// Parameter name to declared type, used to validate calls.
    fn supported_parameters(&self) -> BTreeMap<String, ParamType> {
        self.descriptor().supported_parameters()
    }

    /// Run the capability with validated parameters.
    ///
    /// Returning `Err` is reported as a failure by the registry; a
    /// `CapabilityError` in the chain keeps its kind, anything else becomes
    /// an execution error.
    async fn execute(&self, params: Params) -> Result<CapabilityResult>;
}

/// Create a Registry with the built-in capabilities enabled in `config`.
pub fn create_default_registry(config: &AppConfig, answers: Arc<AnswerStore>) -> Result<Registry> {
    let all: Vec<Arc<dyn Capability>> = vec![
        Arc::new(datetime::DateTimeCapability),
        Arc::new(random_number::RandomNumberCapability),
        Arc::new(string_op::StringOpCapability),
        Arc::new(system_info::SystemInfoCapability),
        Arc::new(url_parse::UrlParseCapability),
        Arc::new(read_file::ReadFileCapability),
        Arc::new(write_file::WriteFileCapability::new(config.files.clone())),
        Arc::new(apply_changes::ApplyLineChangesCapability::new(config.files.clone())),
        Arc::new(answer::PresentAnswerCapability::new(Arc::clone(&answers))),
        Arc::new(answer::RetrieveAnswerCapability::new(answers)),
        Arc::new(web::WebSearchCapability::new(config.web.clone())?),
        Arc::new(web::WebReadCapability::new(config.web.clone())?),
    ];

    let enabled: Vec<String> = config
        .capabilities
        .enabled
        .iter()
        .map(|n| n.to_lowercase())
        .collect();

    let mut registry = Registry::new();
    for capability in all {
        registry.register(capability);
    }
    if enabled.is_empty() {
        return Ok(registry);
    }

    for name in enabled.iter().filter(|name| !registry.contains(name)) {
        warn!(capability = %name, "Unknown capability in [capabilities] enabled");
    }
    for descriptor in registry.list_capabilities() {
        let name = descriptor.key();
        if !enabled.contains(&name) {
            debug!(capability = %name, "Capability disabled by config");
            registry.unregister(&name);
        }
    }
    if registry.is_empty() {
        warn!("No capabilities enabled");
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_everything() {
        let registry =
            create_default_registry(&AppConfig::default(), Arc::new(AnswerStore::new())).unwrap();
        for name in [
            "datetime",
            "random_number",
            "string_op",
            "system_info",
            "url_parse",
            "read_file",
            "write_file",
            "apply_line_changes",
            "present_answer",
            "retrieve_answer",
            "web_search",
            "web_read",
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert_eq!(registry.len(), 12);
    }

    #[test]
    fn test_enabled_filter() {
        let mut config = AppConfig::default();
        config.capabilities.enabled = vec!["Read_File".to_string(), "datetime".to_string()];
        let registry = create_default_registry(&config, Arc::new(AnswerStore::new())).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("read_file"));
        assert!(!registry.contains("web_search"));

        config.capabilities.enabled = vec!["no_such_capability".to_string()];
        let registry = create_default_registry(&config, Arc::new(AnswerStore::new())).unwrap();
        assert!(registry.is_empty());
    }
}
