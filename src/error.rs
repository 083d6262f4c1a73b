//! Errors surfaced by the fix engine and configuration loading.

use thiserror::Error;

/// Errors that can occur while loading configuration or applying a fix.
#[derive(Error, Debug)]
pub enum ThrowcheckError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("unknown fix action: {0} (expected declare, ignore or handle)")]
    UnknownFixAction(String),
    #[error("fix '{action}' is not available for {rule}")]
    FixUnavailable { action: String, rule: String },
    #[error("no diagnostic at {file}:{line}")]
    NoDiagnostic { file: String, line: usize },
    #[error("target declaration not found in {0}")]
    TargetNotFound(String),
}
