//! Structured error types for the definition compiler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
  /// A raw extraction query (or raw bucket selector) is not parseable JSON.
  #[error("invalid query syntax: {0}")]
  InvalidQuerySyntax(String),

  #[error("unsupported schedule type: {0}")]
  UnsupportedScheduleType(String),

  /// The script tokenizer hit a clause that does not match the generated layout.
  #[error("ambiguous reverse parse: {reason} (script: {script:?})")]
  AmbiguousReverseParse { script: String, reason: String },

  #[error("missing sidecar metadata for trigger {0:?}")]
  MissingSidecarMetadata(String),

  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl CompileError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn reverse_parse(script: &str, reason: impl Into<String>) -> Self {
    Self::AmbiguousReverseParse {
      script: script.to_string(),
      reason: reason.into(),
    }
  }

  pub fn invalid_query(err: &serde_json::Error) -> Self {
    Self::InvalidQuerySyntax(err.to_string())
  }
}
