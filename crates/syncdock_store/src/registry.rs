//! Query registry: catalog creation, callback binding and change routing.

use crate::backend::{ChangeListener, ListenerToken, QueryHandle, ResultSet, Row, StoreHandle};
use crate::catalog::{QueryKey, CATALOG};
use crate::error::{StoreError, StoreResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Application callback bound to one query key.
///
/// Receives the full, ordered row snapshot of the query's result set each
/// time it changes.
pub type RowsCallback = Arc<dyn Fn(Vec<Row>) + Send + Sync>;

/// One live catalog entry: the compiled query and its listener, if any.
struct Entry {
    query: Box<dyn QueryHandle>,
    listener: Option<ListenerToken>,
}

/// Owns the compiled catalog queries, their change listeners and the
/// application callbacks they fan out to.
///
/// Callback bindings and catalog entries have independent lifetimes: a
/// callback may be registered before [`QueryRegistry::create_all`] and
/// survives [`QueryRegistry::clear`].
pub struct QueryRegistry {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    callbacks: Arc<RwLock<HashMap<QueryKey, RowsCallback>>>,
}

impl QueryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            callbacks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Compiles every catalog query against the open store, in catalog
    /// order, and registers change listeners for entries that want one.
    ///
    /// A compile failure for one key is logged and does not abort the
    /// remaining keys.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NoOpenStore`] if the store reports itself closed
    /// - [`StoreError::DuplicateRegistration`] if any entry already exists;
    ///   the registry must be cleared before re-creation
    pub fn create_all(&self, store: &Arc<dyn StoreHandle>) -> StoreResult<()> {
        if !store.is_open() {
            return Err(StoreError::NoOpenStore);
        }

        let mut entries = self.entries.lock();
        if let Some(key) = entries.keys().next() {
            return Err(StoreError::DuplicateRegistration { key: *key });
        }

        debug!("creating {} catalog queries", CATALOG.len());
        for def in CATALOG {
            let query = match store.compile_query(def.source) {
                Ok(query) => query,
                Err(err) => {
                    warn!(
                        "query {:?} failed to compile ({}/{}): {err}",
                        def.key,
                        err.domain(),
                        err.code()
                    );
                    continue;
                }
            };
            debug!("created query {:?} [{}]", def.key, def.source);

            let listener = def.listen.then(|| {
                debug!("adding change listener for {:?}", def.key);
                query.add_change_listener(self.change_listener(def.key))
            });

            entries.insert(def.key, Entry { query, listener });
        }

        Ok(())
    }

    /// Binds or replaces the application callback for `key`.
    ///
    /// Independent of listener registration; safe to call at any time,
    /// including before [`QueryRegistry::create_all`].
    pub fn register_callback(&self, key: QueryKey, callback: RowsCallback) {
        self.callbacks.write().insert(key, callback);
    }

    /// Removes every entry, releasing each entry's listener strictly
    /// before its query handle.
    ///
    /// Callback bindings survive; a later [`QueryRegistry::create_all`]
    /// reuses them.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        for def in CATALOG {
            if let Some(mut entry) = entries.remove(&def.key) {
                if let Some(token) = entry.listener.take() {
                    entry.query.remove_listener(token);
                }
                drop(entry.query);
            }
        }
    }

    /// Returns true if no entries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Builds the collaborator-facing listener for one key.
    ///
    /// The listener validates the result set, materializes every row into
    /// an owned snapshot and dispatches to the bound callback, preserving
    /// result order.
    fn change_listener(&self, key: QueryKey) -> ChangeListener {
        let callbacks = Arc::clone(&self.callbacks);
        Arc::new(move |results: &dyn ResultSet| {
            debug!("change notification for {key:?}");
            if !results.is_valid() {
                warn!("result set for {key:?} is not valid, dropping notification");
                return;
            }

            let mut rows = Vec::with_capacity(results.len());
            for index in 0..results.len() {
                if let Some(row) = results.row(index) {
                    rows.push(row.clone());
                }
            }

            let callback = callbacks.read().get(&key).cloned();
            match callback {
                Some(callback) => callback(rows),
                None => debug!("no callback bound for {key:?}"),
            }
        })
    }
}

impl Default for QueryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
