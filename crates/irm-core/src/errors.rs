//! Structured error types shared across IRM crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`IrmError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (indices, sizes, kernel kinds, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for IRM inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum IrmError {
    /// Invalid definitions, kernel configurations or runner wiring.
    #[error("configuration error: {0}")]
    Config(ErrorInfo),
    /// Invalid operations against a latent state.
    #[error("model error: {0}")]
    Model(ErrorInfo),
    /// Failures raised by a sampling primitive.
    #[error("primitive failure: {0}")]
    Primitive(ErrorInfo),
    /// A failure raised inside one chain of an ensemble.
    #[error("ensemble failure: {0}")]
    Ensemble(ErrorInfo),
    /// Serialization, checkpoint and file errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl IrmError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            IrmError::Config(info)
            | IrmError::Model(info)
            | IrmError::Primitive(info)
            | IrmError::Ensemble(info)
            | IrmError::Serde(info) => info,
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(code: &str, message: impl Into<String>) -> Self {
        IrmError::Config(ErrorInfo::new(code, message))
    }

    /// Shorthand for a model error.
    pub fn model(code: &str, message: impl Into<String>) -> Self {
        IrmError::Model(ErrorInfo::new(code, message))
    }

    /// Shorthand for a primitive failure.
    pub fn primitive(code: &str, message: impl Into<String>) -> Self {
        IrmError::Primitive(ErrorInfo::new(code, message))
    }

    /// Wraps a failure raised by the chain at `chain` of an ensemble.
    pub fn ensemble(chain: usize, source: IrmError) -> Self {
        let info = source.info();
        let mut wrapped = ErrorInfo::new(info.code.clone(), source.to_string())
            .with_context("chain", chain);
        for (key, value) in &info.context {
            wrapped = wrapped.with_context(format!("source.{key}"), value);
        }
        IrmError::Ensemble(wrapped)
    }

    /// Returns true for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, IrmError::Config(_))
    }
}
