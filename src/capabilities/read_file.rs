//! Read File capability.
//!
//! Reads a file and returns its contents. With `line_numbers` set, each
//! line is prefixed with its 1-based number, which is the numbering
//! `apply_line_changes` and `present_answer` expect in their change sets.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;

use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::error::CapabilityError;
use crate::types::CapabilityResult;

/// Capability that reads the contents of a file.
pub struct ReadFileCapability;

#[async_trait]
impl Capability for ReadFileCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "read_file",
            "Read the contents of a file at the given path. Optionally restrict to a \
             line range and prefix each line with its 1-based line number.",
        )
        .param(ParamDescriptor::required("path", ParamType::String, "The path to the file to read"))
        .param(
            ParamDescriptor::optional(
                "line_numbers",
                ParamType::Boolean,
                "Prefix each line with its 1-based line number",
            )
            .with_default(json!(false)),
        )
        .param(ParamDescriptor::optional(
            "start_line",
            ParamType::Integer,
            "First line to return (1-based, inclusive)",
        ))
        .param(ParamDescriptor::optional(
            "end_line",
            ParamType::Integer,
            "Last line to return (1-based, inclusive)",
        ))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let path = params.require_str("path")?;
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path))?;

        let numbered = params.bool("line_numbers").unwrap_or(false);
        let windowed = params.contains("start_line") || params.contains("end_line");
        if !numbered && !windowed {
            let message = format!("Read {} bytes from {}", content.len(), path);
            return Ok(CapabilityResult::success(
                json!({ "path": path, "content": content, "total_lines": content.lines().count() }),
                message,
            ));
        }

        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len() as i64;
        let start = params.i64("start_line").unwrap_or(1);
        let requested_end = params.i64("end_line");
        if start < 1 || requested_end.is_some_and(|end| end < start) {
            return Err(CapabilityError::invalid(format!(
                "Invalid line range {}..{} (lines are 1-based)",
                start,
                requested_end.map(|end| end.to_string()).unwrap_or_default()
            ))
            .into());
        }

        if total == 0 && start == 1 {
            return Ok(CapabilityResult::success(
                json!({ "path": path, "content": "", "total_lines": 0 }),
                format!("{} is empty", path),
            ));
        }
        if start > total {
            return Err(CapabilityError::invalid(format!(
                "start_line {} is past the end of {} ({} lines)",
                start, path, total
            ))
            .into());
        }
        let end = requested_end.unwrap_or(total).min(total);

        let selected: Vec<String> = lines
            .iter()
            .enumerate()
            .skip((start - 1) as usize)
            .take((end - start + 1).max(0) as usize)
            .map(|(idx, line)| {
                if numbered {
                    format!("{}: {}", idx + 1, line)
                } else {
                    line.to_string()
                }
            })
            .collect();

        Ok(CapabilityResult::success(
            json!({
                "path": path,
                "content": selected.join("\n"),
                "total_lines": total,
                "start_line": start,
                "end_line": end,
            }),
            format!("Read lines {}-{} of {} from {}", start, end, total, path),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::params::ParamValue;
    use std::io::Write;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    fn path_params(path: &str) -> Params {
        let mut p = Params::new();
        p.insert("path", ParamValue::String(path.to_string()));
        p
    }

    #[test]
    fn test_metadata() {
        let d = ReadFileCapability.descriptor();
        assert_eq!(d.name, "read_file");
        assert!(!d.description.is_empty());
        assert_eq!(d.required_parameters().next().unwrap().name, "path");
    }

    #[test]
    fn test_read_existing_file() {
        rt().block_on(async {
            let mut tmp = tempfile::NamedTempFile::new().unwrap();
            write!(tmp, "hello plugboard").unwrap();

            let result = ReadFileCapability
                .execute(path_params(tmp.path().to_str().unwrap()))
                .await
                .unwrap();

            assert_eq!(result.data().unwrap()["content"], "hello plugboard");
        });
    }

    #[test]
    fn test_numbered_window() {
        rt().block_on(async {
            let mut tmp = tempfile::NamedTempFile::new().unwrap();
            write!(tmp, "a\nb\nc\nd\n").unwrap();

            let mut p = path_params(tmp.path().to_str().unwrap());
            p.insert("line_numbers", ParamValue::Boolean(true));
            p.insert("start_line", ParamValue::Integer(2));
            p.insert("end_line", ParamValue::Integer(9));
            let result = ReadFileCapability.execute(p).await.unwrap();

            let data = result.data().unwrap();
            assert_eq!(data["content"], "2: b\n3: c\n4: d");
            assert_eq!(data["total_lines"], 4);
            assert_eq!(data["end_line"], 4);
        });
    }

    #[test]
    fn test_bad_range() {
        rt().block_on(async {
            let tmp = tempfile::NamedTempFile::new().unwrap();
            let mut p = path_params(tmp.path().to_str().unwrap());
            p.insert("start_line", ParamValue::Integer(0));
            assert!(ReadFileCapability.execute(p).await.is_err());
        });
    }

    #[test]
    fn test_numbered_empty_file() {
        rt().block_on(async {
            let tmp = tempfile::NamedTempFile::new().unwrap();
            let mut p = path_params(tmp.path().to_str().unwrap());
            p.insert("line_numbers", ParamValue::Boolean(true));
            let result = ReadFileCapability.execute(p).await.unwrap();

            let data = result.data().unwrap();
            assert_eq!(data["content"], "");
            assert_eq!(data["total_lines"], 0);
        });
    }

    #[test]
    fn test_start_past_end_rejected() {
        rt().block_on(async {
            let mut tmp = tempfile::NamedTempFile::new().unwrap();
            write!(tmp, "a\nb\nc\n").unwrap();

            let mut p = path_params(tmp.path().to_str().unwrap());
            p.insert("start_line", ParamValue::Integer(5));
            p.insert("end_line", ParamValue::Integer(9));
            let err = ReadFileCapability.execute(p).await.unwrap_err();
            assert_eq!(
                crate::error::classify(&err),
                crate::error::ErrorKind::InvalidArgument
            );
            assert!(err.to_string().contains("past the end"));
        });
    }

    #[test]
    fn test_read_nonexistent_file() {
        rt().block_on(async {
            let result = ReadFileCapability
                .execute(path_params("/tmp/__plugboard_no_such_file__"))
                .await;
            let err = result.unwrap_err();
            assert_eq!(
                crate::error::classify(&err),
                crate::error::ErrorKind::ExecutionError
            );
        });
    }
}
