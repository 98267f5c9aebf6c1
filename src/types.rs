//! Core data types used throughout plugboard.
//!
//! This module defines the chat message types consumed by request shaping,
//! the line-change record shared by the diff engine and the answer
//! capabilities, and the uniform result envelope every capability returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CapabilityError, ErrorKind};

// --- Message Roles ---

/// The role of a message in a chat request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

// --- Messages ---

/// A single role/content pair in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[cfg(test)]
impl Message {
    /// Create a system message (sets the AI's behavior/instructions).
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// --- Line Changes ---

/// One edit operation against a line of the original file.
///
/// Change sets key these by the 1-based line number in the *original*
/// numbering. The wire form is `{"changeType": "...", "content": "...",
/// "originalContent": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "changeType")]
pub enum LineChange {
    /// Inserted before the original line with the same number, or appended
    /// when the number is past the end of the file.
    Added { content: String },
    Modified {
        content: String,
        #[serde(
            rename = "originalContent",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        original_content: Option<String>,
    },
    /// `content` is informational; it never reaches the output.
    Deleted { content: String },
    /// Carries no transformation.
    Context { content: String },
}

#[cfg(test)]
impl LineChange {
    pub fn added(content: impl Into<String>) -> Self {
        LineChange::Added {
            content: content.into(),
        }
    }

    pub fn modified(content: impl Into<String>, original: Option<&str>) -> Self {
        LineChange::Modified {
            content: content.into(),
            original_content: original.map(str::to_string),
        }
    }

    pub fn deleted(content: impl Into<String>) -> Self {
        LineChange::Deleted {
            content: content.into(),
        }
    }

    pub fn context(content: impl Into<String>) -> Self {
        LineChange::Context {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            LineChange::Added { content }
            | LineChange::Modified { content, .. }
            | LineChange::Deleted { content }
            | LineChange::Context { content } => content,
        }
    }

    /// The wire name of this change's kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            LineChange::Added { .. } => "Added",
            LineChange::Modified { .. } => "Modified",
            LineChange::Deleted { .. } => "Deleted",
            LineChange::Context { .. } => "Context",
        }
    }
}

// --- Capability Result ---

/// The uniform envelope returned by every capability invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CapabilityResult {
    Success { data: Value, message: String },
    Failure { error: ErrorKind, message: String },
}

impl CapabilityResult {
    pub fn success(data: Value, message: impl Into<String>) -> Self {
        CapabilityResult::Success {
            data,
            message: message.into(),
        }
    }

    pub fn failure(error: ErrorKind, message: impl Into<String>) -> Self {
        CapabilityResult::Failure {
            error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CapabilityResult::Success { .. })
    }

    /// The error kind for a failure, `None` for a success.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            CapabilityResult::Success { .. } => None,
            CapabilityResult::Failure { error, .. } => Some(*error),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CapabilityResult::Success { message, .. } | CapabilityResult::Failure { message, .. } => {
                message
            }
        }
    }
}

#[cfg(test)]
impl CapabilityResult {
    pub fn data(&self) -> Option<&Value> {
        match self {
            CapabilityResult::Success { data, .. } => Some(data),
            CapabilityResult::Failure { .. } => None,
        }
    }
}

impl From<CapabilityError> for CapabilityResult {
    fn from(err: CapabilityError) -> Self {
        CapabilityResult::failure(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_line_change_wire_format() {
        let change: LineChange = serde_json::from_value(json!({
            "changeType": "Modified",
            "content": "new",
            "originalContent": "old"
        }))
        .unwrap();
        assert_eq!(change, LineChange::modified("new", Some("old")));

        let change: LineChange =
            serde_json::from_value(json!({"changeType": "Deleted", "content": "gone"})).unwrap();
        assert_eq!(change.kind_name(), "Deleted");
        assert_eq!(change.content(), "gone");
    }

    #[test]
    fn test_line_change_rejects_unknown_kind() {
        let r: Result<LineChange, _> =
            serde_json::from_value(json!({"changeType": "Renamed", "content": "x"}));
        assert!(r.is_err());
    }

    #[test]
    fn test_line_change_requires_content() {
        let r: Result<LineChange, _> = serde_json::from_value(json!({"changeType": "Added"}));
        assert!(r.is_err());
    }

    #[test]
    fn test_modified_without_original_omits_field() {
        let v = serde_json::to_value(LineChange::modified("x", None)).unwrap();
        assert_eq!(v, json!({"changeType": "Modified", "content": "x"}));
    }

    #[test]
    fn test_result_envelope() {
        let ok = CapabilityResult::success(json!(42), "done");
        assert!(ok.is_success());
        assert_eq!(ok.error_kind(), None);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "success", "data": 42, "message": "done"})
        );

        let err: CapabilityResult = CapabilityError::NotFound("Capability not found: nope".to_string()).into();
        assert_eq!(err.error_kind(), Some(ErrorKind::NotFound));
        assert!(err.data().is_none());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "failure", "error": "NotFound", "message": "Capability not found: nope"})
        );
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role.as_str(), "user");
        let m: Message = serde_json::from_value(json!({"role": "assistant", "content": "hi"})).unwrap();
        assert_eq!(m, Message::assistant("hi"));
    }
}
