//! Store lifecycle management.

use crate::backend::{StoreBackend, StoreHandle};
use crate::error::{StoreError, StoreResult};
use crate::paths::StorePaths;
use crate::registry::QueryRegistry;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the store path configuration, the open/create/delete lifecycle and
/// the query registry tied to the open store.
///
/// The open handle is shared read-only with the registry and the
/// replication layer; only this manager closes or deletes it, and it tears
/// the registry down first.
pub struct StoreLifecycleManager {
    backend: Arc<dyn StoreBackend>,
    store_name: String,
    paths: Mutex<Option<StorePaths>>,
    remote_host: Mutex<Option<String>>,
    handle: Mutex<Option<Arc<dyn StoreHandle>>>,
    registry: QueryRegistry,
}

impl StoreLifecycleManager {
    /// Creates a manager for the named store over the given backend.
    pub fn new(backend: Arc<dyn StoreBackend>, store_name: impl Into<String>) -> Self {
        Self {
            backend,
            store_name: store_name.into(),
            paths: Mutex::new(None),
            remote_host: Mutex::new(None),
            handle: Mutex::new(None),
            registry: QueryRegistry::new(),
        }
    }

    /// Configures the store location and initializes the storage
    /// subsystem with the resolved data and cache paths.
    ///
    /// Re-invocation re-derives the paths; handles opened under a prior
    /// path are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] if the path is empty
    /// or the cache path cannot be derived from it.
    pub fn set_store_path(&self, path: &str) -> StoreResult<()> {
        let paths = StorePaths::derive(path)?;
        debug!("store path: {}", paths.data.display());
        debug!("store cache path: {}", paths.cache.display());

        self.backend.init_paths(&paths)?;
        *self.paths.lock() = Some(paths);
        Ok(())
    }

    /// Records the remote hostname used later by the endpoint
    /// configurator. No validation beyond storage.
    pub fn set_remote_host(&self, hostname: impl Into<String>) {
        *self.remote_host.lock() = Some(hostname.into());
    }

    /// The configured remote hostname, if any.
    #[must_use]
    pub fn remote_host(&self) -> Option<String> {
        self.remote_host.lock().clone()
    }

    /// Opens the store at the configured path, creating it if absent, and
    /// creates every catalog query against it.
    ///
    /// An incompatible store format is terminal for this process: the
    /// store is deleted and the error returned without retrying the open.
    /// The caller decides whether to rebuild from scratch.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidConfiguration`] if no path has been set
    /// - [`StoreError::VersionMismatch`] after the destructive recovery
    /// - any other collaborator open failure, unrecovered
    pub fn open_or_create(&self) -> StoreResult<()> {
        let Some(paths) = self.paths.lock().clone() else {
            return Err(StoreError::invalid_configuration("store path not set"));
        };

        let handle = match self.backend.open(&self.store_name, &paths) {
            Ok(handle) => handle,
            Err(err) if err.is_version_mismatch() => {
                warn!("store format mismatch, deleting {}: {err}", self.store_name);
                if let Err(delete_err) = self.backend.delete(&self.store_name, &paths) {
                    warn!("recovery delete failed: {delete_err}");
                }
                return Err(err);
            }
            Err(err) => {
                warn!("failed to open store {} ({}/{}): {err}", self.store_name, err.domain(), err.code());
                return Err(err);
            }
        };

        info!("local store {} open", self.store_name);
        *self.handle.lock() = Some(Arc::clone(&handle));
        self.registry.create_all(&handle)?;
        Ok(())
    }

    /// Releases every registry entry, then closes the store; with
    /// `remove`, the store is deleted afterwards. A never-opened store is
    /// deleted by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] when deleting by name
    /// without a configured path, or the collaborator's close/delete
    /// failure.
    pub fn close(&self, remove: bool) -> StoreResult<()> {
        debug!("closing store {} (remove: {remove})", self.store_name);

        self.registry.clear();

        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => {
                handle.close()?;
                info!("local store {} closed", self.store_name);
                if remove {
                    let paths = self.require_paths()?;
                    self.backend.delete(&self.store_name, &paths)?;
                }
            }
            None if remove => {
                let paths = self.require_paths()?;
                self.backend.delete(&self.store_name, &paths)?;
            }
            None => {}
        }
        Ok(())
    }

    /// Returns true while a handle exists and reports itself open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.is_open())
    }

    /// The open store handle, shared with the replication layer.
    #[must_use]
    pub fn handle(&self) -> Option<Arc<dyn StoreHandle>> {
        self.handle.lock().clone()
    }

    /// The query registry bound to this store.
    #[must_use]
    pub fn registry(&self) -> &QueryRegistry {
        &self.registry
    }

    fn require_paths(&self) -> StoreResult<StorePaths> {
        self.paths
            .lock()
            .clone()
            .ok_or_else(|| StoreError::invalid_configuration("store path not set"))
    }
}
