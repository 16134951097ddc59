//! Error types for the store layer.

use crate::catalog::QueryKey;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store layer operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required setting is empty or missing.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the missing or malformed setting.
        message: String,
    },

    /// The operation requires an open store.
    #[error("no open store")]
    NoOpenStore,

    /// The query catalog is already populated.
    #[error("query catalog already populated (existing key {key:?})")]
    DuplicateRegistration {
        /// A key that already has an entry.
        key: QueryKey,
    },

    /// The store format is too new or too old for this binary.
    #[error("incompatible store format for {name}: {message}")]
    VersionMismatch {
        /// Store name.
        name: String,
        /// Collaborator-reported detail.
        message: String,
    },

    /// The store could not be opened or created.
    #[error("failed to open store {name}: {message}")]
    OpenFailed {
        /// Store name.
        name: String,
        /// Collaborator-reported detail.
        message: String,
    },

    /// A declarative query failed to compile.
    #[error("failed to compile query [{query}]: {message}")]
    QueryCompile {
        /// Query source text.
        query: String,
        /// Collaborator-reported detail.
        message: String,
    },

    /// The store handle is closed.
    #[error("store is closed")]
    Closed,

    /// The store could not be deleted.
    #[error("failed to delete store {name}: {message}")]
    DeleteFailed {
        /// Store name.
        name: String,
        /// Collaborator-reported detail.
        message: String,
    },
}

impl StoreError {
    /// Creates an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Creates a version mismatch error.
    pub fn version_mismatch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VersionMismatch {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an open failure error.
    pub fn open_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a query compile error.
    pub fn query_compile(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryCompile {
            query: source.into(),
            message: message.into(),
        }
    }

    /// Creates a delete failure error.
    pub fn delete_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeleteFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The failure domain, used in collaborator diagnostics.
    pub fn domain(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration { .. }
            | Self::NoOpenStore
            | Self::DuplicateRegistration { .. } => "config",
            Self::QueryCompile { .. } => "query",
            _ => "store",
        }
    }

    /// Numeric code within the failure domain, used in collaborator
    /// diagnostics.
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidConfiguration { .. } => 1,
            Self::NoOpenStore => 2,
            Self::DuplicateRegistration { .. } => 3,
            Self::VersionMismatch { .. } => 10,
            Self::OpenFailed { .. } => 11,
            Self::Closed => 12,
            Self::DeleteFailed { .. } => 13,
            Self::QueryCompile { .. } => 20,
        }
    }

    /// Returns true if the error indicates an incompatible store format.
    ///
    /// This condition is terminal for the current process: the lifecycle
    /// manager deletes the store and does not retry the open.
    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. })
    }
}
