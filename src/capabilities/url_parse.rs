//! URL decomposition capability.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Map, Value};

use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::error::CapabilityError;
use crate::types::CapabilityResult;

pub struct UrlParseCapability;

#[async_trait]
impl Capability for UrlParseCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "url_parse",
            "Split a URL into scheme, host, port, path, query parameters and fragment.",
        )
        .param(ParamDescriptor::required("url", ParamType::String, "The absolute URL to parse"))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let raw = params.require_str("url")?;
        let url = Url::parse(raw)
            .map_err(|e| CapabilityError::invalid(format!("Invalid URL '{}': {}", raw, e)))?;

        let mut query = Map::new();
        for (key, value) in url.query_pairs() {
            query.insert(key.into_owned(), Value::String(value.into_owned()));
        }

        Ok(CapabilityResult::success(
            json!({
                "scheme": url.scheme(),
                "host": url.host_str(),
                "port": url.port_or_known_default(),
                "path": url.path(),
                "query": query,
                "fragment": url.fragment(),
            }),
            format!("Parsed {}", url),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::params::ParamValue;

    fn run(url: &str) -> Result<CapabilityResult> {
        let mut p = Params::new();
        p.insert("url", ParamValue::String(url.to_string()));
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(UrlParseCapability.execute(p))
    }

    #[test]
    fn test_parse_components() {
        let result = run("https://example.com:8443/a/b?x=1&y=two#frag").unwrap();
        let data = result.data().unwrap();
        assert_eq!(data["scheme"], "https");
        assert_eq!(data["host"], "example.com");
        assert_eq!(data["port"], 8443);
        assert_eq!(data["path"], "/a/b");
        assert_eq!(data["query"]["y"], "two");
        assert_eq!(data["fragment"], "frag");
    }

    #[test]
    fn test_default_port() {
        let result = run("http://example.com").unwrap();
        assert_eq!(result.data().unwrap()["port"], 80);
    }

    #[test]
    fn test_invalid_url() {
        let err = run("not a url").unwrap_err();
        assert_eq!(
            crate::error::classify(&err),
            crate::error::ErrorKind::InvalidArgument
        );
    }
}
