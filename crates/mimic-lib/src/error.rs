//! Typed errors for the two external boundaries of the crate: reading chat
//! exports from disk and talking to the hosted model.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading an export document. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to read export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("export {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Top level is neither a message list nor an object wrapping one.
    #[error("export {path} has unsupported top-level shape ({found}); expected a list or an object with `messages`")]
    UnsupportedShape { path: PathBuf, found: &'static str },

    #[error("export {path}: message #{index} is not a JSON object")]
    InvalidMessage { path: PathBuf, index: usize },
}

/// Failure while calling the generative model endpoint.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Endpoint answered with a non-success status.
    #[error("model endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("model request timed out after {0}s")]
    Timeout(u64),

    /// Connection refused, DNS, TLS and other transport failures.
    #[error("model request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("could not decode model response: {0}")]
    Decode(String),
}

impl GenerateError {
    /// Transport failures, timeouts and server-side errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerateError::Http { status, .. } => *status >= 500,
            GenerateError::Timeout(_) | GenerateError::Transport(_) => true,
            GenerateError::Decode(_) => false,
        }
    }
}

/// Human-readable name of a JSON value's kind, for error messages.
pub(crate) fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
