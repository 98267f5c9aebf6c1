//! Error types shared by the registry, the diff engine and schema derivation.
//!
//! `ErrorKind` is the tag carried inside a failed `CapabilityResult`.
//! `CapabilityError` is the typed error the core raises internally; the
//! registry folds it (and anything else a capability returns) into a
//! `Failure` result so nothing propagates past `invoke`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The originating category of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    ExecutionError,
    UnsupportedDialect,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::ExecutionError => "ExecutionError",
            ErrorKind::UnsupportedDialect => "UnsupportedDialect",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Execution(String),
    #[error("Unsupported provider dialect: '{0}'")]
    UnsupportedDialect(String),
}

impl CapabilityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CapabilityError::NotFound(_) => ErrorKind::NotFound,
            CapabilityError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CapabilityError::Execution(_) => ErrorKind::ExecutionError,
            CapabilityError::UnsupportedDialect(_) => ErrorKind::UnsupportedDialect,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CapabilityError::InvalidArgument(message.into())
    }
}

/// Classify an error that escaped a capability.
///
/// A `CapabilityError` anywhere in the chain keeps its own kind; anything
/// else (I/O, HTTP, parse failures) is an execution error.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CapabilityError>())
        .map(CapabilityError::kind)
        .unwrap_or(ErrorKind::ExecutionError)
}
