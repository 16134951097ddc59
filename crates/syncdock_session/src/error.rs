//! Error types for the session layer.

use crate::activity::ActivityLevel;
use syncdock_store::StoreError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur in session layer operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A required setting is empty or missing.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the missing or malformed setting.
        message: String,
    },

    /// Replication was started without an endpoint configuration.
    #[error("no endpoint configured for replication")]
    NoEndpointConfigured,

    /// A blocking wait expired before the replication settled.
    #[error("timed out waiting for replication (last activity: {last})")]
    WaitTimeout {
        /// The activity level observed when the deadline expired.
        last: ActivityLevel,
    },

    /// Store collaborator failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Replication collaborator failure.
    #[error("replicator error: {message}")]
    Replicator {
        /// Collaborator-reported detail.
        message: String,
    },
}

impl SessionError {
    /// Creates an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Creates a replicator collaborator error.
    pub fn replicator(message: impl Into<String>) -> Self {
        Self::Replicator {
            message: message.into(),
        }
    }

    /// Returns true if the error is a caller/configuration mistake rather
    /// than a collaborator failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration { .. } | Self::NoEndpointConfigured
        ) || matches!(
            self,
            Self::Store(
                StoreError::InvalidConfiguration { .. }
                    | StoreError::NoOpenStore
                    | StoreError::DuplicateRegistration { .. }
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SessionError::NoEndpointConfigured;
        assert_eq!(err.to_string(), "no endpoint configured for replication");

        let err = SessionError::WaitTimeout {
            last: ActivityLevel::Connecting,
        };
        assert!(err.to_string().contains("connecting"));
    }

    #[test]
    fn configuration_classification() {
        assert!(SessionError::invalid_configuration("empty hostname").is_configuration());
        assert!(SessionError::Store(StoreError::NoOpenStore).is_configuration());
        assert!(!SessionError::replicator("socket reset").is_configuration());
        assert!(!SessionError::WaitTimeout {
            last: ActivityLevel::Busy
        }
        .is_configuration());
    }
}
