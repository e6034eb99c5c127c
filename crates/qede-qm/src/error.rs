//! Error types for queue-manager planning and configuration.
//!
//! Every fallible operation of this crate returns [`QmResult`]. Collaborators
//! behind [`crate::QmCallbacks`] report their failures with the same type so
//! that firmware timeouts and busy conditions reach the caller unchanged.

use qede_types::{ParseError, ResourceKind};
use thiserror::Error;

/// Result type for queue-manager operations.
pub type QmResult<T> = Result<T, QmError>;

/// Errors that can occur while planning or configuring the queue manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QmError {
    /// Budget or sanity failure, unknown personality, conflicting flags or
    /// a rejected WFQ request.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// Not enough rate limiters, vports or PQs after reservations.
    #[error("Resource exhausted: {resource} (required {required}, available {available})")]
    ResourceExhausted {
        /// The resource that ran out.
        resource: ResourceKind,
        /// Units the layout needs.
        required: u32,
        /// Units that were available.
        available: u32,
    },

    /// The coordination lock or firmware was busy.
    #[error("Busy: {operation}")]
    Busy {
        /// The operation that could not proceed.
        operation: String,
    },

    /// A firmware round trip timed out.
    #[error("Timed out: {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },

    /// Firmware or the device rejects the feature.
    #[error("Feature not supported: {feature}")]
    Unsupported {
        /// The rejected feature.
        feature: String,
    },

    /// Programming invariant violation.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl QmError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        QmError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a resource exhausted error.
    pub fn resource_exhausted(resource: ResourceKind, required: u32, available: u32) -> Self {
        QmError::ResourceExhausted {
            resource,
            required,
            available,
        }
    }

    /// Creates a busy error.
    pub fn busy(operation: impl Into<String>) -> Self {
        QmError::Busy {
            operation: operation.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        QmError::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        QmError::Unsupported {
            feature: feature.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        QmError::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the failure is transient.
    ///
    /// The core never retries on its own; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QmError::Busy { .. } | QmError::Timeout { .. })
    }
}

impl From<ParseError> for QmError {
    fn from(err: ParseError) -> Self {
        QmError::invalid_config(err.to_string())
    }
}
