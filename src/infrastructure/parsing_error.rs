//! Parsing error types for review extraction
//!
//! Per-review errors are recovered by skipping the offending node; only
//! configuration errors prevent a parser from being built.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Required fields missing: {}", fields.join(", "))]
    RequiredFieldsMissing { fields: Vec<String> },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No valid selectors compiled for '{field}': {}", errors.join(", "))]
    NoValidSelectors { field: String, errors: Vec<String> },

    #[error("AJAX response chunk malformed: {reason}")]
    MalformedAjaxChunk { reason: String },
}

impl ParsingError {
    pub fn required_fields_missing<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RequiredFieldsMissing {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether parsing of the remaining input can continue after this error.
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::RequiredFieldsMissing { .. }
            | Self::InvalidSelector { .. }
            | Self::MalformedAjaxChunk { .. } => true,
            Self::NoValidSelectors { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
