//! Line-change edit capability.
//!
//! Reads a file, runs the diff engine over its lines with the caller's
//! change set, takes a backup if configured, and writes the result back.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::write_file::backup_file;
use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::config::FilesConfig;
use crate::diff::apply_changes;
use crate::error::CapabilityError;
use crate::types::CapabilityResult;

pub struct ApplyLineChangesCapability {
    files: FilesConfig,
}

impl ApplyLineChangesCapability {
    pub fn new(files: FilesConfig) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Capability for ApplyLineChangesCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "apply_line_changes",
            "Edit a file by line number. Each entry in `changes` is keyed by a 1-based \
             line number of the current file: Added inserts before that line (or appends \
             past the end), Modified replaces it, Deleted removes it, Context leaves it as is.",
        )
        .param(ParamDescriptor::required("path", ParamType::String, "The path to the file to edit"))
        .param(ParamDescriptor::required(
            "changes",
            ParamType::LineChanges,
            "Line changes keyed by original 1-based line number",
        ))
        .param(ParamDescriptor::optional(
            "header_comment",
            ParamType::String,
            "A line to place at the top of the file",
        ))
        .param(ParamDescriptor::optional(
            "backup",
            ParamType::Boolean,
            "Copy the file aside before writing (defaults to the configured policy)",
        ))
        .param(
            ParamDescriptor::optional(
                "dry_run",
                ParamType::Boolean,
                "Compute the result without writing the file",
            )
            .with_default(json!(false)),
        )
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let path = params.require_str("path")?;
        let changes = params
            .line_changes("changes")
            .ok_or_else(|| CapabilityError::invalid("Missing required parameter: changes"))?;
        let dry_run = params.bool("dry_run").unwrap_or(false);
        let backup = params.bool("backup").unwrap_or(self.files.backup);

        let original = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path))?;
        let original_lines: Vec<&str> = original.lines().collect();

        let outcome = apply_changes(&original_lines, changes, params.str("header_comment"))?;
        let content = outcome.render(&original);

        let mut backup_path = None;
        if !dry_run {
            if backup {
                backup_path = backup_file(Path::new(path), &self.files.backup_suffix).await?;
            }
            tokio::fs::write(path, &content)
                .await
                .with_context(|| format!("Failed to write file: {}", path))?;
            info!(
                path = %path,
                added = outcome.stats.added,
                modified = outcome.stats.modified,
                deleted = outcome.stats.deleted,
                "Applied line changes"
            );
        }

        let stats = outcome.stats;
        Ok(CapabilityResult::success(
            json!({
                "path": path,
                "dry_run": dry_run,
                "backup": backup_path,
                "stats": stats.to_json(),
                "content": content,
            }),
            format!(
                "{} {} change(s) to {} ({} added, {} modified, {} deleted)",
                if dry_run { "Previewed" } else { "Applied" },
                stats.total_changes(),
                path,
                stats.added,
                stats.modified,
                stats.deleted
            ),
        ))
    }
}
