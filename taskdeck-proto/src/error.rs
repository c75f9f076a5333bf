//! Error shapes shared across the wire.

use serde::{Deserialize, Serialize};

/// Input that cannot be turned into a valid task or query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Title is missing or blank after trimming.
    #[error("task title is required")]
    TitleEmpty,
    /// Title exceeds the maximum length.
    #[error("title must be between 1 and {max} characters")]
    TitleTooLong {
        /// Maximum allowed length in characters.
        max: usize,
    },
    /// Description exceeds the maximum length.
    #[error("description cannot be more than {max} characters")]
    DescriptionTooLong {
        /// Maximum allowed length in characters.
        max: usize,
    },
    /// A filter or sort parameter has a value outside its enumeration.
    #[error("invalid value {value:?} for {field}")]
    InvalidFilter {
        /// Parameter name as seen by the caller.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
    /// A due date that is neither `YYYY-MM-DD` nor an RFC 3339 timestamp.
    #[error("due date must be a valid date, got {0:?}")]
    InvalidDueDate(String),
    /// Page number or page size is out of range.
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),
}

/// Coarse error category visible to remote callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request was malformed; fix the input and resend.
    Validation,
    /// The target task does not exist for this owner.
    NotFound,
    /// The store failed; nothing about the input was wrong.
    Unavailable,
    /// The credential was missing or rejected.
    Unauthorized,
}

/// Error carried in an RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ErrorReply {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorReply {
    /// Build a reply of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ErrorReply {
    fn from(err: ValidationError) -> Self {
        Self::new(ErrorKind::Validation, err.to_string())
    }
}
