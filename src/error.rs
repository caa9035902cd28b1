//! Error types for Flowpact.
//!
//! All errors in Flowpact are represented by the `FlowpactError` enum,
//! which provides specific variants for different error categories.
//! Spec validation findings are carried together in [`ValidationErrors`]
//! so callers see every violation at once.

use std::{fmt, io::ErrorKind};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Flowpact operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum FlowpactError {
    /// Configuration parsing errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (YAML, JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Workflow-level precondition errors (e.g. no contract to audit).
    #[error("{0}")]
    Workflow(String),

    /// The workflow document failed validation.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// Drift audit errors.
    #[error("{0}")]
    Audit(String),

    /// Policy store fetch/apply errors.
    #[error("{0}")]
    Store(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

/// Ordered list of human-readable validation errors.
///
/// Never empty when returned from [`crate::parse`].
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        message: impl Into<String>,
    ) {
        self.0.push(message.into());
    }

    pub fn extend<I: IntoIterator<Item = String>>(
        &mut self,
        messages: I,
    ) {
        self.0.extend(messages);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// True if any error message contains `needle`.
    pub fn contains(
        &self,
        needle: &str,
    ) -> bool {
        self.0.iter().any(|e| e.contains(needle))
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "workflow spec has {} validation error(s):", self.0.len())?;
        for e in &self.0 {
            write!(f, "\n  - {}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<ValidationErrors> for FlowpactError {
    fn from(errors: ValidationErrors) -> Self {
        FlowpactError::Validation(errors)
    }
}

impl From<FlowpactError> for String {
    fn from(val: FlowpactError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for FlowpactError {
    fn from(error: std::io::Error) -> Self {
        FlowpactError::IoError(error.to_string())
    }
}

impl From<FlowpactError> for std::io::Error {
    fn from(val: FlowpactError) -> Self {
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for FlowpactError {
    fn from(error: serde_json::Error) -> Self {
        FlowpactError::Convert(error.to_string())
    }
}

impl From<serde_yaml::Error> for FlowpactError {
    fn from(error: serde_yaml::Error) -> Self {
        FlowpactError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for FlowpactError {
    fn from(error: toml::de::Error) -> Self {
        FlowpactError::Config(error.to_string())
    }
}
