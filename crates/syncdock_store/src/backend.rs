//! Store collaborator trait definitions.

use crate::error::StoreResult;
use crate::paths::StorePaths;
use std::sync::Arc;

/// One materialized query result row.
///
/// Rows handed to application callbacks are owned snapshots; they stay
/// valid after the collaborator's result set is gone.
pub type Row = serde_json::Value;

/// An opaque handle identifying a registered listener.
///
/// Tokens are only meaningful to the handle that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

impl ListenerToken {
    /// Creates a token from a collaborator-assigned id.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The collaborator-assigned id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A borrowed view over one change notification's result set.
///
/// The set is owned by the collaborator and must not be retained past the
/// listener invocation. Callers copy the rows they need.
pub trait ResultSet {
    /// Returns true if the result set is usable.
    ///
    /// Invalid sets are delivered when the underlying query was invalidated
    /// mid-notification; they carry no rows.
    fn is_valid(&self) -> bool;

    /// Number of rows in the set.
    fn len(&self) -> usize;

    /// Returns true if the set has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the row at `index`, in result order.
    fn row(&self, index: usize) -> Option<&Row>;
}

/// Callback invoked by the collaborator when a query's result set changes.
///
/// Invocations are serialized per listener by the collaborator; the calling
/// thread is the collaborator's worker thread, never the host's.
pub type ChangeListener = Arc<dyn Fn(&dyn ResultSet) + Send + Sync>;

/// A compiled declarative query.
///
/// The handle's lifetime is tied to the open store that compiled it; the
/// registry removes listeners before releasing the handle.
pub trait QueryHandle: Send + Sync {
    /// The query source text this handle was compiled from.
    fn source(&self) -> &str;

    /// Registers a change listener.
    fn add_change_listener(&self, listener: ChangeListener) -> ListenerToken;

    /// Removes a previously registered listener.
    ///
    /// Unknown tokens are ignored. After this returns, the listener will
    /// not be invoked again.
    fn remove_listener(&self, token: ListenerToken);
}

/// An open local store.
///
/// Shared read-only between the query registry and the replication layer;
/// only the lifecycle manager closes or deletes it.
pub trait StoreHandle: Send + Sync {
    /// The store name.
    fn name(&self) -> &str;

    /// Returns true while the handle reports itself open and valid.
    fn is_open(&self) -> bool;

    /// Compiles declarative query text against this store.
    fn compile_query(&self, source: &str) -> StoreResult<Box<dyn QueryHandle>>;

    /// Closes the store.
    fn close(&self) -> StoreResult<()>;
}

/// The store collaborator: opens, creates and deletes named local stores.
///
/// # Implementors
///
/// - [`super::MemoryStore`] - in-memory backend for testing
pub trait StoreBackend: Send + Sync {
    /// Initializes the process-wide storage subsystem with the resolved
    /// store locations.
    ///
    /// Invoked whenever the store path is (re)configured, before any open.
    fn init_paths(&self, paths: &StorePaths) -> StoreResult<()>;

    /// Opens the named store at the configured locations, creating it if
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::VersionMismatch`] if the store exists
    /// in a format this binary cannot read, and
    /// [`crate::StoreError::OpenFailed`] for any other open failure.
    fn open(&self, name: &str, paths: &StorePaths) -> StoreResult<Arc<dyn StoreHandle>>;

    /// Deletes the named store without requiring an open handle.
    fn delete(&self, name: &str, paths: &StorePaths) -> StoreResult<()>;
}
