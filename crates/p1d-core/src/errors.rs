//! Structured error types shared across the labeling crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`LabelError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (keys, redshifts, sizes, etc.).
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

/// Canonical error type for the labeling pipeline.
///
/// Every failure is fatal to the current labeling run; callers are expected
/// to fix their inputs and rerun rather than recover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum LabelError {
    /// Malformed, missing or unsupported simulation configuration keys.
    #[error("config parse error: {0}")]
    ConfigParse(ErrorInfo),
    /// Not enough usable samples for the requested fit.
    #[error("insufficient data error: {0}")]
    InsufficientData(ErrorInfo),
    /// Expansion-history query failed or produced a non-finite factor.
    #[error("conversion error: {0}")]
    Conversion(ErrorInfo),
    /// Rows reported by a collaborator could not be matched to the request.
    #[error("alignment error: {0}")]
    Alignment(ErrorInfo),
    /// The 1D power source could not provide a measurement.
    #[error("measurement error: {0}")]
    Measurement(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Filesystem errors while reading inputs.
    #[error("io error: {0}")]
    Io(ErrorInfo),
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

impl LabelError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            LabelError::ConfigParse(info)
            | LabelError::InsufficientData(info)
            | LabelError::Conversion(info)
            | LabelError::Alignment(info)
            | LabelError::Measurement(info)
            | LabelError::Serde(info)
            | LabelError::Io(info) => info,
        }
    }

    /// Returns the stable code of the underlying payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Wraps an I/O failure for the given path.
    pub fn io(code: &str, path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        LabelError::Io(
            ErrorInfo::new(code, err.to_string())
                .with_context("path", path.as_ref().display()),
        )
    }
}
