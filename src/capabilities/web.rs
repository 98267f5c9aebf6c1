//! Web search and web page reading capabilities.
//!
//! Search goes through the Brave Search API (key from config or the
//! environment). Page reading fetches a URL and reduces HTML to plain text.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::config::WebConfig;
use crate::error::CapabilityError;
use crate::types::CapabilityResult;

/// `timeout_secs = 0` in config disables the client-wide timeout.
fn client_timeout(timeout_secs: u64) -> Option<Duration> {
    (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs))
}

fn build_client(web: &WebConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(format!("plugboard/{}", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = client_timeout(web.timeout_secs) {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to create HTTP client")
}

/// Append a `site:` filter for each domain in `sites`.
fn scoped_query(query: &str, sites: &[String]) -> String {
    let sites: Vec<String> = sites
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("site:{}", s))
        .collect();
    match sites.len() {
        0 => query.to_string(),
        1 => format!("{} {}", query, sites[0]),
        _ => format!("{} ({})", query, sites.join(" OR ")),
    }
}

pub struct WebSearchCapability {
    web: WebConfig,
    client: Client,
}

impl WebSearchCapability {
    pub fn new(web: WebConfig) -> Result<Self> {
        let client = build_client(&web)?;
        Ok(Self { web, client })
    }
}

#[async_trait]
impl Capability for WebSearchCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "web_search",
            "Search the web. Returns a list of results with title, url and snippet.",
        )
        .param(ParamDescriptor::required("query", ParamType::String, "The search query"))
        .param(
            ParamDescriptor::optional("count", ParamType::Integer, "Number of results (1-20)")
                .with_default(json!(5)),
        )
        .param(ParamDescriptor::optional(
            "sites",
            ParamType::StringArray,
            "Only return results from these domains",
        ))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let query = params.require_str("query")?;
        if query.trim().is_empty() {
            return Err(CapabilityError::invalid("query must not be empty").into());
        }
        let count = params.i64("count").unwrap_or(5).clamp(1, 20);

        let api_key = self.web.search_api_key().ok_or_else(|| {
            CapabilityError::Execution(format!(
                "Web search is not configured: set [web] search_api_key or {}",
                self.web.search_api_key_env
            ))
        })?;

        let scoped = scoped_query(query, params.list("sites").unwrap_or_default());
        let count = count.to_string();
        debug!(query = %scoped, count = %count, "Web search");
        let response = self
            .client
            .get(&self.web.search_endpoint)
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .query(&[("q", scoped.as_str()), ("count", count.as_str())])
            .send()
            .await
            .context("Search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Search API error ({}): {}", status, body);
        }

        let data: Value = response
            .json()
            .await
            .context("Failed to parse search response")?;
        let results = parse_search_results(&data);

        let message = format!("{} result(s) for '{}'", results.len(), query);
        Ok(CapabilityResult::success(
            json!({ "query": query, "results": results }),
            message,
        ))
    }
}

fn parse_search_results(data: &Value) -> Vec<Value> {
    data["web"]["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .map(|r| {
                    json!({
                        "title": r["title"],
                        "url": r["url"],
                        "snippet": r["description"],
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

pub struct WebReadCapability {
    web: WebConfig,
    client: Client,
}

impl WebReadCapability {
    pub fn new(web: WebConfig) -> Result<Self> {
        let client = build_client(&web)?;
        Ok(Self { web, client })
    }
}

#[async_trait]
impl Capability for WebReadCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "web_read",
            "Fetch a web page and return its readable text content.",
        )
        .param(ParamDescriptor::required("url", ParamType::String, "http(s) URL to fetch"))
        .param(ParamDescriptor::optional(
            "max_chars",
            ParamType::Integer,
            "Maximum characters of text to return",
        ))
        .param(ParamDescriptor::optional(
            "headers",
            ParamType::Map,
            "Extra request headers (string values)",
        ))
        .param(ParamDescriptor::optional(
            "timeout_secs",
            ParamType::Float,
            "Timeout for this request in seconds",
        ))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let raw = params.require_str("url")?;
        let url = reqwest::Url::parse(raw)
            .map_err(|e| CapabilityError::invalid(format!("Invalid URL '{}': {}", raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CapabilityError::invalid(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            ))
            .into());
        }
        let max_chars = params
            .i64("max_chars")
            .map(|n| n.max(1) as usize)
            .unwrap_or(self.web.max_chars);

        let headers = request_headers(params.map("headers"))?;
        let mut request = self.client.get(url.clone()).headers(headers);
        if let Some(secs) = params.f64("timeout_secs") {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(CapabilityError::invalid("timeout_secs must be a positive number").into());
            }
            request = request.timeout(Duration::from_secs_f64(secs));
        }

        debug!(url = %url, "Fetching page");
        let response = request
            .send()
            .await
            .with_context(|| format!("Fetch failed: {}", url))?;

        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Fetch of {} returned HTTP {}", url, status);
        }
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        let text = if content_type.contains("text/html") {
            extract_text_from_html(&body)
        } else {
            body
        };
        let (text, truncated) = truncate_chars(&text, max_chars);

        Ok(CapabilityResult::success(
            json!({
                "url": url.as_str(),
                "final_url": final_url,
                "status": status.as_u16(),
                "content_type": content_type,
                "truncated": truncated,
                "text": text,
            }),
            format!("Fetched {} characters from {}", text.chars().count(), final_url),
        ))
    }
}

fn request_headers(extra: Option<&Map<String, Value>>) -> Result<HeaderMap, CapabilityError> {
    let mut headers = HeaderMap::new();
    for (name, value) in extra.into_iter().flatten() {
        let value = value.as_str().ok_or_else(|| {
            CapabilityError::invalid(format!("Header '{}' must be a string", name))
        })?;
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CapabilityError::invalid(format!("Invalid header name '{}': {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| CapabilityError::invalid(format!("Invalid value for header '{}': {}", name, e)))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// First `max_chars` characters of `text`, and whether anything was cut.
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => (text[..end].to_string(), true),
        None => (text.to_string(), false),
    }
}

fn extract_text_from_html(html: &str) -> String {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);

    for sel in ["article", "main", "body"] {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(element) = document.select(&selector).next() {
                let text = collapse_whitespace(element.text());
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }

    collapse_whitespace(document.root_element().text())
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::params::ParamValue;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    #[test]
    fn test_extract_text_prefers_article() {
        let html = "<html><body><nav>menu</nav><article><h1>Title</h1>\
                    <p>Body   text\n here</p></article></body></html>";
        assert_eq!(extract_text_from_html(html), "Title Body text here");
    }

    #[test]
    fn test_extract_text_falls_back_to_body() {
        let html = "<html><body><div>just <b>this</b></div></body></html>";
        assert_eq!(extract_text_from_html(html), "just this");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), ("hé".to_string(), true));
        assert_eq!(truncate_chars("hi", 5), ("hi".to_string(), false));
    }

    #[test]
    fn test_scoped_query() {
        assert_eq!(scoped_query("rust", &[]), "rust");
        assert_eq!(
            scoped_query("rust", &["docs.rs".to_string()]),
            "rust site:docs.rs"
        );
        assert_eq!(
            scoped_query("rust", &["docs.rs".to_string(), " ".to_string(), "crates.io".to_string()]),
            "rust (site:docs.rs OR site:crates.io)"
        );
    }

    #[test]
    fn test_zero_timeout_disables_client_timeout() {
        assert_eq!(client_timeout(0), None);
        assert_eq!(client_timeout(30), Some(Duration::from_secs(30)));
        let web = WebConfig {
            timeout_secs: 0,
            ..WebConfig::default()
        };
        assert!(WebReadCapability::new(web).is_ok());
    }

    #[test]
    fn test_request_headers() {
        let extra = json!({"Accept-Language": "en"});
        let headers = request_headers(extra.as_object()).unwrap();
        assert_eq!(headers["accept-language"], "en");
        assert!(request_headers(None).unwrap().is_empty());

        let bad = json!({"X-Count": 3});
        let err = request_headers(bad.as_object()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_read_rejects_bad_timeout() {
        rt().block_on(async {
            let cap = WebReadCapability::new(WebConfig::default()).unwrap();
            let mut p = Params::new();
            p.insert("url", ParamValue::String("http://127.0.0.1:9/".to_string()));
            p.insert("timeout_secs", ParamValue::Float(0.0));
            let err = cap.execute(p).await.unwrap_err();
            assert_eq!(
                crate::error::classify(&err),
                crate::error::ErrorKind::InvalidArgument
            );
        });
    }

    #[test]
    fn test_parse_search_results() {
        let data = json!({"web": {"results": [
            {"title": "Rust", "url": "https://rust-lang.org", "description": "A language"}
        ]}});
        let results = parse_search_results(&data);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["snippet"], "A language");
        assert!(parse_search_results(&json!({})).is_empty());
    }

    #[test]
    fn test_search_without_key_fails() {
        rt().block_on(async {
            let web = WebConfig {
                search_api_key: None,
                search_api_key_env: "__PLUGBOARD_TEST_UNSET_KEY__".to_string(),
                ..WebConfig::default()
            };
            let cap = WebSearchCapability::new(web).unwrap();
            let mut p = Params::new();
            p.insert("query", ParamValue::String("rust".to_string()));
            let err = cap.execute(p).await.unwrap_err();
            assert_eq!(
                crate::error::classify(&err),
                crate::error::ErrorKind::ExecutionError
            );
            assert!(err.to_string().contains("not configured"));
        });
    }

    #[test]
    fn test_read_rejects_non_http() {
        rt().block_on(async {
            let cap = WebReadCapability::new(WebConfig::default()).unwrap();
            let mut p = Params::new();
            p.insert("url", ParamValue::String("file:///etc/passwd".to_string()));
            let err = cap.execute(p).await.unwrap_err();
            assert_eq!(
                crate::error::classify(&err),
                crate::error::ErrorKind::InvalidArgument
            );
        });
    }
}
