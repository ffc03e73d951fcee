//! Error types for recurrence-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    /// A rule or state violated a model invariant. `field` is a dotted path
    /// into the input value (e.g. `pattern.interval`, `end.count`).
    #[error("invalid rule: {field}: {message}")]
    InvalidRule { field: String, message: String },

    /// A rule cannot round-trip through the provider's RRULE text.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

impl RecurrenceError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::UnsupportedEncoding(detail.into())
    }

    /// Nest an `InvalidRule` field path under `prefix` (`nth` -> `pattern.nth`).
    pub fn within(self, prefix: &str) -> Self {
        match self {
            Self::InvalidRule { field, message } => Self::InvalidRule {
                field: format!("{prefix}.{field}"),
                message,
            },
            other => other,
        }
    }

    /// The offending field path, for `InvalidRule` errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidRule { field, .. } => Some(field),
            Self::UnsupportedEncoding(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecurrenceError>;
