//! Write File capability.
//!
//! Writes or deletes a file. When backups are enabled and the target
//! exists, a copy is taken before anything destructive happens.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::config::FilesConfig;
use crate::error::CapabilityError;
use crate::types::CapabilityResult;

/// Copy `path` to `path + suffix` if it exists. Completes before returning,
/// so callers can write immediately afterwards.
pub async fn backup_file(path: &Path, suffix: &str) -> Result<Option<PathBuf>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let mut backup = path.as_os_str().to_owned();
    backup.push(suffix);
    let backup = PathBuf::from(backup);
    tokio::fs::copy(path, &backup)
        .await
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;
    info!(path = %path.display(), backup = %backup.display(), "Backed up file");
    Ok(Some(backup))
}

/// Capability that writes content to, or deletes, a file.
pub struct WriteFileCapability {
    files: FilesConfig,
}

impl WriteFileCapability {
    pub fn new(files: FilesConfig) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Capability for WriteFileCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "write_file",
            "Write content to a file at the given path, or delete it. Creates the file \
             (and parent directories) if it doesn't exist, overwrites if it does.",
        )
        .param(ParamDescriptor::required("path", ParamType::String, "The path to the file"))
        .param(ParamDescriptor::optional(
            "content",
            ParamType::String,
            "The content to write (required for operation=write)",
        ))
        .param(
            ParamDescriptor::optional(
                "operation",
                ParamType::one_of(&["write", "delete"]),
                "Whether to write or delete the file",
            )
            .with_default(json!("write")),
        )
        .param(ParamDescriptor::optional(
            "backup",
            ParamType::Boolean,
            "Copy the existing file aside first (defaults to the configured policy)",
        ))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let path = params.require_str("path")?;
        let backup = params.bool("backup").unwrap_or(self.files.backup);

        if params.str("operation") == Some("delete") {
            let backup_path = if backup {
                backup_file(Path::new(path), &self.files.backup_suffix).await?
            } else {
                None
            };
            tokio::fs::remove_file(path)
                .await
                .with_context(|| format!("Failed to delete file: {}", path))?;
            info!(path = %path, "Deleted file");
            return Ok(CapabilityResult::success(
                json!({ "path": path, "deleted": true, "backup": backup_path }),
                format!("Deleted file: {}", path),
            ));
        }

        let content = params.str("content").ok_or_else(|| {
            CapabilityError::invalid("Missing required parameter: content (operation=write)")
        })?;

        // Create directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory for: {}", path))?;
            }
        }

        let backup_path = if backup {
            backup_file(Path::new(path), &self.files.backup_suffix).await?
        } else {
            None
        };

        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", path))?;
        info!(path = %path, bytes = content.len(), "Wrote file");

        Ok(CapabilityResult::success(
            json!({ "path": path, "bytes": content.len(), "backup": backup_path }),
            format!("Successfully wrote {} characters to file: {}", content.len(), path),
        ))
    }
}
