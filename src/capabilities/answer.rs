//! Present / retrieve answer capabilities.
//!
//! `present_answer` records a final answer, optionally with a proposed set
//! of line changes against a file. When both a path and changes are given
//! the diff engine computes a preview of the edited file (nothing is
//! written). `retrieve_answer` reads a stored answer back by id.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{Capability, CapabilityDescriptor, ParamDescriptor, ParamType, Params};
use crate::answers::{AnswerStore, StoredAnswer};
use crate::diff::{apply_changes, DiffStats};
use crate::error::CapabilityError;
use crate::types::CapabilityResult;

pub struct PresentAnswerCapability {
    store: Arc<AnswerStore>,
}

impl PresentAnswerCapability {
    pub fn new(store: Arc<AnswerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for PresentAnswerCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "present_answer",
            "Present a final answer to the user. Optionally attach proposed line changes \
             to a file; a preview of the edited file is computed but the file is not \
             modified. Pass answer_id to revise an earlier answer.",
        )
        .param(ParamDescriptor::required("answer", ParamType::String, "The answer text"))
        .param(ParamDescriptor::optional("title", ParamType::String, "A short title"))
        .param(ParamDescriptor::optional(
            "path",
            ParamType::String,
            "File the proposed changes apply to",
        ))
        .param(ParamDescriptor::optional(
            "changes",
            ParamType::LineChanges,
            "Proposed line changes keyed by original 1-based line number",
        ))
        .param(ParamDescriptor::optional(
            "answer_id",
            ParamType::String,
            "Id of an answer to revise",
        ))
        .param(ParamDescriptor::optional(
            "expected_version",
            ParamType::Integer,
            "Version the revision is based on; the update is rejected if it has moved on",
        ))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let answer = params.require_str("answer")?.to_string();
        let title = params.str("title").map(str::to_string);
        let path = params.str("path").map(str::to_string);
        let changes = params.line_changes("changes").cloned();

        if changes.as_ref().is_some_and(|c| c.is_empty()) {
            return Err(CapabilityError::invalid("No changes specified").into());
        }

        let (preview, stats): (Option<String>, Option<DiffStats>) = match (&path, &changes) {
            (Some(path), Some(changes)) => {
                let original = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read file: {}", path))?;
                let lines: Vec<&str> = original.lines().collect();
                let outcome = apply_changes(&lines, changes, None)?;
                (Some(outcome.render(&original)), Some(outcome.stats))
            }
            _ => (None, None),
        };

        let stored = match params.str("answer_id") {
            Some(id) => {
                let expected = match params.i64("expected_version") {
                    Some(v) if v < 1 => {
                        return Err(CapabilityError::invalid("expected_version must be positive").into())
                    }
                    Some(v) => v as u64,
                    None => {
                        self.store
                            .get(id)
                            .map_err(CapabilityError::from)?
                            .ok_or_else(|| CapabilityError::NotFound(format!("Answer not found: {}", id)))?
                            .version
                    }
                };
                self.store
                    .compare_and_swap(id, expected, |a| {
                        a.answer = answer;
                        if title.is_some() {
                            a.title = title;
                        }
                        if path.is_some() {
                            a.path = path;
                        }
                        if changes.is_some() {
                            a.changes = changes;
                            a.preview = preview;
                            a.stats = stats;
                        }
                    })
                    .map_err(CapabilityError::from)?
            }
            None => {
                let mut fresh = StoredAnswer::new(answer);
                fresh.title = title;
                fresh.path = path;
                fresh.changes = changes;
                fresh.preview = preview;
                fresh.stats = stats;
                if !self.store.insert_if_absent(fresh.clone()).map_err(CapabilityError::from)? {
                    return Err(CapabilityError::Execution(format!(
                        "Answer id collision: {}",
                        fresh.id
                    ))
                    .into());
                }
                fresh
            }
        };

        debug!(
            answer_id = %stored.id,
            version = stored.version,
            stored = self.store.len(),
            "Answer stored"
        );
        Ok(CapabilityResult::success(
            json!({
                "answer_id": stored.id,
                "version": stored.version,
                "preview": stored.preview,
                "stats": stored.stats.map(|s| s.to_json()),
            }),
            format!("Answer {} stored (version {})", stored.id, stored.version),
        ))
    }
}

pub struct RetrieveAnswerCapability {
    store: Arc<AnswerStore>,
}

impl RetrieveAnswerCapability {
    pub fn new(store: Arc<AnswerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for RetrieveAnswerCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new("retrieve_answer", "Retrieve a previously presented answer by id.")
            .param(ParamDescriptor::required(
                "answer_id",
                ParamType::String,
                "Id returned by present_answer",
            ))
    }

    async fn execute(&self, params: Params) -> Result<CapabilityResult> {
        let id = params.require_str("answer_id")?;
        let stored = self
            .store
            .get(id)
            .map_err(CapabilityError::from)?
            .ok_or_else(|| CapabilityError::NotFound(format!("Answer not found: {}", id)))?;
        let message = format!("Answer {} (version {})", stored.id, stored.version);
        Ok(CapabilityResult::success(serde_json::to_value(&stored)?, message))
    }
}
