//! Capability registry: lookup, argument validation and dispatch.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::params::{json_kind, CapabilityDescriptor, ParamType, ParamValue, Params};
use super::Capability;
use crate::error::{classify, CapabilityError, ErrorKind};
use crate::types::CapabilityResult;

#[derive(Clone)]
struct Entry {
    descriptor: CapabilityDescriptor,
    supported: BTreeMap<String, ParamType>,
    capability: Arc<dyn Capability>,
}

/// Maps lowercase capability names to their instances.
///
/// Built once at startup; `invoke` takes `&self` so a shared registry can
/// serve concurrent calls.
#[derive(Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, Entry>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under its lowercased name.
    ///
    /// A later registration with the same name replaces the earlier one.
    /// Returns `true` when something was replaced.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> bool {
        let descriptor = capability.descriptor();
        let supported = capability.supported_parameters();
        let key = descriptor.key();

        let replaced = self
            .entries
            .insert(
                key.clone(),
                Entry {
                    descriptor,
                    supported,
                    capability,
                },
            )
            .is_some();

        if replaced {
            warn!(capability = %key, "Capability re-registered; previous registration replaced");
        } else {
            debug!(capability = %key, "Capability registered");
        }
        replaced
    }

    /// Remove a capability. Returns `true` if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.entries.remove(&name.to_lowercase()).is_some()
    }

    /// Descriptors of every registered capability.
    pub fn list_capabilities(&self) -> Vec<CapabilityDescriptor> {
        self.entries.values().map(|e| e.descriptor.clone()).collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.entries.get(&name.to_lowercase()).map(|e| &e.descriptor)
    }

    /// Check if a capability with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke a capability with JSON-encoded arguments.
    pub async fn invoke_json(&self, name: &str, arguments: &str) -> CapabilityResult {
        let arguments = if arguments.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            match serde_json::from_str::<Value>(arguments) {
                Ok(v) => v,
                Err(e) => {
                    return CapabilityResult::failure(
                        ErrorKind::InvalidArgument,
                        format!("Invalid JSON arguments for capability '{}': {}", name, e),
                    )
                }
            }
        };

        match arguments {
            Value::Object(map) => self.invoke(name, map).await,
            other => CapabilityResult::failure(
                ErrorKind::InvalidArgument,
                format!(
                    "Arguments for capability '{}' must be a JSON object, got {}",
                    name,
                    json_kind(&other)
                ),
            ),
        }
    }

    /// Validate `arguments` against the capability's contract and run it.
    ///
    /// Never fails: unknown names, invalid arguments, errors and panics
    /// raised by the capability all come back as `Failure`.
    pub async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> CapabilityResult {
        let key = name.to_lowercase();
        let Some(entry) = self.entries.get(&key) else {
            warn!(capability = %name, "Invocation of unknown capability");
            return CapabilityError::NotFound(format!("Capability not found: {}", name)).into();
        };

        let params = match validate(&entry.descriptor, &entry.supported, arguments)
            .and_then(|supplied| decode(&entry.descriptor, &entry.supported, supplied))
        {
            Ok(params) => params,
            Err(e) => {
                info!(capability = %key, reason = %e, "Rejected invocation");
                return e.into();
            }
        };

        debug!(capability = %key, params = params.len(), "Dispatching capability");
        let outcome = AssertUnwindSafe(entry.capability.execute(params))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                let kind = classify(&err);
                warn!(capability = %key, kind = %kind, "Capability failed: {:#}", err);
                CapabilityResult::failure(kind, format!("{:#}", err))
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(capability = %key, "Capability panicked: {}", reason);
                CapabilityResult::failure(
                    ErrorKind::ExecutionError,
                    format!("Capability '{}' panicked: {}", key, reason),
                )
            }
        }
    }
}

/// Check supplied arguments against the declared contract.
///
/// Order is fixed: keys that collide once lowercased, then missing required
/// parameters (all reported together), then the first unsupported key, then
/// the first type mismatch. Keys are compared lowercased and `null` values
/// count as absent.
fn validate(
    descriptor: &CapabilityDescriptor,
    supported: &BTreeMap<String, ParamType>,
    arguments: Map<String, Value>,
) -> Result<BTreeMap<String, Value>, CapabilityError> {
    let mut supplied: BTreeMap<String, Value> = BTreeMap::new();
    for (key, value) in arguments {
        if value.is_null() {
            continue;
        }
        let key = key.to_lowercase();
        if supplied.contains_key(&key) {
            return Err(CapabilityError::invalid(format!(
                "Duplicate parameter: {}",
                key
            )));
        }
        supplied.insert(key, value);
    }

    let missing: Vec<&str> = descriptor
        .required_parameters()
        .filter(|p| !supplied.contains_key(&p.name))
        .map(|p| p.name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(CapabilityError::invalid(format!(
            "Missing required parameters: {}",
            missing.join(", ")
        )));
    }

    if let Some(key) = supplied.keys().find(|k| !supported.contains_key(*k)) {
        return Err(CapabilityError::invalid(format!(
            "Unsupported parameter: {}",
            key
        )));
    }

    for (key, value) in &supplied {
        let expected = &supported[key];
        if expected.accepts(value) {
            continue;
        }
        let message = match (expected, value.as_str()) {
            (ParamType::Enum(_), Some(actual)) => format!(
                "Parameter '{}' expects {} but got '{}'",
                key,
                expected.describe(),
                actual
            ),
            _ => format!(
                "Parameter '{}' expects {} but got {}",
                key,
                expected.describe(),
                json_kind(value)
            ),
        };
        return Err(CapabilityError::invalid(message));
    }

    Ok(supplied)
}

/// Decode validated arguments and fill declared defaults.
fn decode(
    descriptor: &CapabilityDescriptor,
    supported: &BTreeMap<String, ParamType>,
    supplied: BTreeMap<String, Value>,
) -> Result<Params, CapabilityError> {
    let mut params = Params::new();
    for (key, value) in supplied {
        let value = ParamValue::decode(&key, &supported[&key], value)?;
        params.insert(&key, value);
    }

    for param in &descriptor.parameters {
        if params.contains(&param.name) {
            continue;
        }
        if let Some(default) = &param.default {
            let value = ParamValue::decode(&param.name, &param.param_type, default.clone())?;
            params.insert(&param.name, value);
        }
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::params::ParamDescriptor;
    use anyhow::{Context, Result};
    use async_trait::async_trait;
    use serde_json::json;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    /// Echoes its decoded parameters back.
    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        fn descriptor(&self) -> CapabilityDescriptor {
            CapabilityDescriptor::new("Echo", "Echo parameters back")
                .param(ParamDescriptor::required("Text", ParamType::String, "text"))
                .param(ParamDescriptor::required("count", ParamType::Integer, "count"))
                .param(
                    ParamDescriptor::optional("mode", ParamType::one_of(&["loud", "quiet"]), "mode")
                        .with_default(json!("quiet")),
                )
                .param(ParamDescriptor::optional("ratio", ParamType::Float, "ratio"))
        }

        async fn execute(&self, params: Params) -> Result<CapabilityResult> {
            Ok(CapabilityResult::success(
                json!({
                    "text": params.require_str("text")?,
                    "count": params.i64("count"),
                    "mode": params.str("mode"),
                    "ratio": params.f64("ratio"),
                }),
                "echoed",
            ))
        }
    }

    struct Broken;

    #[async_trait]
    impl Capability for Broken {
        fn descriptor(&self) -> CapabilityDescriptor {
            CapabilityDescriptor::new("broken", "Always errors")
        }

        async fn execute(&self, _params: Params) -> Result<CapabilityResult> {
            std::fs::read_to_string("/nonexistent/__plugboard__/file")
                .context("Failed to read file")?;
            Ok(CapabilityResult::success(json!(null), "unreachable"))
        }
    }

    struct Panics;

    #[async_trait]
    impl Capability for Panics {
        fn descriptor(&self) -> CapabilityDescriptor {
            CapabilityDescriptor::new("panics", "Always panics")
        }

        async fn execute(&self, _params: Params) -> Result<CapabilityResult> {
            panic!("boom");
        }
    }

    fn registry() -> Registry {
        let mut r = Registry::new();
        r.register(Arc::new(Echo));
        r.register(Arc::new(Broken));
        r.register(Arc::new(Panics));
        r
    }

    #[test]
    fn test_register_and_list() {
        let r = registry();
        assert_eq!(r.len(), 3);
        assert!(r.contains("ECHO"));
        let listed = r.list_capabilities();
        let echo = listed.iter().find(|d| d.name == "Echo").unwrap();
        assert_eq!(echo.description, "Echo parameters back");
        assert_eq!(echo.parameters, Echo.descriptor().parameters);
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut r = registry();
        assert!(r.register(Arc::new(Echo)));
        assert_eq!(r.len(), 3);
        assert!(r.unregister("echo"));
        assert!(!r.contains("echo"));
        assert!(!r.unregister("echo"));
    }

    #[test]
    fn test_invoke_success_case_insensitive() {
        rt().block_on(async {
            let r = registry();
            let result = r
                .invoke("ECHO", args(json!({"TEXT": "hi", "Count": 2, "ratio": 1})))
                .await;
            assert!(result.is_success(), "{:?}", result);
            let data = result.data().unwrap();
            assert_eq!(data["text"], "hi");
            assert_eq!(data["count"], 2);
            assert_eq!(data["mode"], "quiet");
            assert_eq!(data["ratio"], 1.0);
        });
    }

    #[test]
    fn test_unknown_capability() {
        rt().block_on(async {
            let result = registry().invoke("nope", Map::new()).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
        });
    }

    #[test]
    fn test_missing_parameters_reported_together() {
        rt().block_on(async {
            let result = registry().invoke("echo", Map::new()).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
            assert_eq!(result.message(), "Missing required parameters: text, count");
        });
    }

    #[test]
    fn test_missing_reported_before_unsupported() {
        rt().block_on(async {
            let result = registry()
                .invoke("echo", args(json!({"text": "a", "bogus": 1})))
                .await;
            assert_eq!(result.message(), "Missing required parameters: count");
        });
    }

    #[test]
    fn test_unsupported_before_mismatch() {
        rt().block_on(async {
            let result = registry()
                .invoke("echo", args(json!({"text": 1, "count": 1, "bogus": 1})))
                .await;
            assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
            assert_eq!(result.message(), "Unsupported parameter: bogus");
        });
    }

    #[test]
    fn test_type_mismatch() {
        rt().block_on(async {
            let r = registry();
            let result = r.invoke("echo", args(json!({"text": "a", "count": "two"}))).await;
            assert_eq!(
                result.message(),
                "Parameter 'count' expects integer but got string"
            );

            let result = r
                .invoke("echo", args(json!({"text": "a", "count": 1, "mode": "shouty"})))
                .await;
            assert_eq!(
                result.message(),
                "Parameter 'mode' expects one of [loud, quiet] but got 'shouty'"
            );
        });
    }

    #[test]
    fn test_case_colliding_keys_rejected() {
        rt().block_on(async {
            let result = registry()
                .invoke("echo", args(json!({"text": "abc", "TEXT": 5, "count": 1})))
                .await;
            assert_eq!(result.error_kind(), Some(ErrorKind::InvalidArgument));
            assert_eq!(result.message(), "Duplicate parameter: text");

            let result = registry()
                .invoke("echo", args(json!({"TEXT": "abc", "bogus": 1})))
                .await;
            assert_eq!(result.message(), "Missing required parameters: count");
        });
    }

    #[test]
    fn test_null_counts_as_absent() {
        rt().block_on(async {
            let result = registry()
                .invoke("echo", args(json!({"text": "a", "count": 1, "ratio": null})))
                .await;
            assert!(result.is_success());
            assert!(result.data().unwrap()["ratio"].is_null());
        });
    }

    #[test]
    fn test_execution_error_is_captured() {
        rt().block_on(async {
            let result = registry().invoke("broken", Map::new()).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionError));
            assert!(result.message().starts_with("Failed to read file"));
        });
    }

    #[test]
    fn test_panic_is_captured() {
        rt().block_on(async {
            let result = registry().invoke("panics", Map::new()).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::ExecutionError));
            assert!(result.message().contains("boom"));
        });
    }

    #[test]
    fn test_invoke_json() {
        rt().block_on(async {
            let r = registry();
            let ok = r.invoke_json("echo", r#"{"text": "x", "count": 3}"#).await;
            assert!(ok.is_success());

            let bad = r.invoke_json("echo", "{not json").await;
            assert_eq!(bad.error_kind(), Some(ErrorKind::InvalidArgument));

            let not_object = r.invoke_json("echo", "[1, 2]").await;
            assert!(not_object.message().contains("must be a JSON object"));

            let empty = r.invoke_json("panics", "").await;
            assert_eq!(empty.error_kind(), Some(ErrorKind::ExecutionError));
        });
    }

    #[test]
    fn test_concurrent_invocations() {
        rt().block_on(async {
            let r = Arc::new(registry());
            let mut handles = Vec::new();
            for i in 0..8 {
                let r = Arc::clone(&r);
                handles.push(tokio::spawn(async move {
                    r.invoke("echo", args(json!({"text": "t", "count": i}))).await
                }));
            }
            for (i, h) in handles.into_iter().enumerate() {
                let result = h.await.unwrap();
                assert_eq!(result.data().unwrap()["count"], i as i64);
            }
        });
    }
}
