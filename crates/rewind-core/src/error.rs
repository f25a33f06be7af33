//! Error types for rewind operations.
//!
//! Every failure of a snapshot operation travels through [`RewindError`], the
//! same channel used for failures of the primary store, so a save aborted by
//! its snapshot write looks like any other failed save.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for rewind operations.
pub type RewindResult<T> = Result<T, RewindError>;

/// Main error type for all rewind operations.
#[derive(Error, Debug)]
pub enum RewindError {
    /// A history or document store could not be opened, read or written.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A snapshot record or entity failed validation.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Storage (STO_xxx)
    StoOpenFailed,
    StoWriteFailed,
    StoReadFailed,
    StoDeleteFailed,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidAction,
    ValInvalidEntityId,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::StoOpenFailed => "STO_001",
            ErrorCode::StoWriteFailed => "STO_002",
            ErrorCode::StoReadFailed => "STO_003",
            ErrorCode::StoDeleteFailed => "STO_004",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidAction => "VAL_003",
            ErrorCode::ValInvalidEntityId => "VAL_004",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl RewindError {
    /// Create a storage error for a failed write.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoWriteFailed,
            source: None,
        }
    }

    /// Create a storage error with an explicit code and underlying cause.
    pub fn storage_with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            code,
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for a required snapshot field that is missing.
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.clone());
        Self::Validation {
            message: format!("Required field '{}' is missing", field),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: None,
        }
    }

    /// Create a validation error for an unknown action tag.
    pub fn invalid_action(action: impl Into<String>) -> Self {
        let action = action.into();
        let mut details = HashMap::new();
        details.insert("action".to_string(), action.clone());
        Self::Validation {
            message: format!("Unknown snapshot action '{}'", action),
            code: ErrorCode::ValInvalidAction,
            details,
            suggestion: Some("Use one of: create, update, roll-back, delete".to_string()),
        }
    }

    /// Create a validation error for an entity id that does not match the configured id type.
    pub fn invalid_entity_id(id: impl Into<String>, expected: impl Into<String>) -> Self {
        let id = id.into();
        let expected = expected.into();
        let mut details = HashMap::new();
        details.insert("entity_id".to_string(), id.clone());
        details.insert("expected".to_string(), expected.clone());
        Self::Validation {
            message: format!("Entity id '{}' is not a valid {}", id, expected),
            code: ErrorCode::ValInvalidEntityId,
            details,
            suggestion: Some("Check the configured id_type".to_string()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Storage { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the error came from a storage engine.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Whether the error is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Storage { code: ErrorCode::StoOpenFailed, .. } => {
                Some("Please check the history backend path and permissions")
            }
            Self::Storage { .. } => Some("Please check the history backend connection"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Configuration(_) => Some("Please check the rewind configuration file"),
            _ => None,
        }
    }
}
