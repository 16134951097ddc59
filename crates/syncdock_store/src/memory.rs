//! In-memory store backend for testing.

use crate::backend::{
    ChangeListener, ListenerToken, QueryHandle, ResultSet, Row, StoreBackend, StoreHandle,
};
use crate::error::{StoreError, StoreResult};
use crate::paths::StorePaths;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// The store format this backend reads and writes.
pub const MEMORY_FORMAT_VERSION: u32 = 3;

/// An in-memory store backend.
///
/// Suitable for unit and integration tests of the coordination layer. The
/// backend executes no queries: tests script compile failures and emit
/// change notifications by hand.
///
/// # Example
///
/// ```rust
/// use syncdock_store::{MemoryStore, StoreBackend, StorePaths};
///
/// let backend = MemoryStore::new();
/// let paths = StorePaths::derive("/data/app/files/store").unwrap();
/// let store = backend.open("db", &paths).unwrap();
/// assert!(store.is_open());
/// ```
#[derive(Default)]
pub struct MemoryStore {
    init_paths: Mutex<Option<StorePaths>>,
    fail_compile: Arc<Mutex<Vec<String>>>,
    stores: Mutex<HashMap<String, StoreRecord>>,
}

struct StoreRecord {
    format_version: u32,
    handle: Option<Arc<MemoryStoreHandle>>,
}

impl MemoryStore {
    /// Creates a new backend with no stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a compile failure for every query whose source contains
    /// `fragment`.
    pub fn fail_compile_containing(&self, fragment: impl Into<String>) {
        self.fail_compile.lock().push(fragment.into());
    }

    /// Pre-creates the named store stamped with an arbitrary format
    /// version, as if written by another binary.
    pub fn stamp_format(&self, name: impl Into<String>, format_version: u32) {
        self.stores.lock().insert(
            name.into(),
            StoreRecord {
                format_version,
                handle: None,
            },
        );
    }

    /// Returns true if the named store exists.
    #[must_use]
    pub fn store_exists(&self, name: &str) -> bool {
        self.stores.lock().contains_key(name)
    }

    /// The paths most recently passed to [`StoreBackend::init_paths`].
    #[must_use]
    pub fn last_init_paths(&self) -> Option<StorePaths> {
        self.init_paths.lock().clone()
    }

    /// Number of listeners currently registered on the named store's
    /// query.
    #[must_use]
    pub fn listener_count(&self, name: &str, source: &str) -> usize {
        self.with_query(name, source, |state| state.listeners.lock().len())
            .unwrap_or(0)
    }

    /// Emits a valid change notification carrying `rows` to every listener
    /// of the named store's query.
    pub fn emit_change(&self, name: &str, source: &str, rows: Vec<Row>) {
        self.emit_result_set(name, source, VecResultSet::new(rows));
    }

    /// Emits an arbitrary result set, valid or not, to every listener of
    /// the named store's query.
    pub fn emit_result_set(&self, name: &str, source: &str, results: VecResultSet) {
        let listeners = self
            .with_query(name, source, |state| {
                state.listeners.lock().values().cloned().collect::<Vec<_>>()
            })
            .unwrap_or_default();
        for listener in listeners {
            listener(&results);
        }
    }

    fn with_query<T>(
        &self,
        name: &str,
        source: &str,
        f: impl FnOnce(&QueryState) -> T,
    ) -> Option<T> {
        let stores = self.stores.lock();
        let handle = stores.get(name)?.handle.as_ref()?;
        let queries = handle.queries.lock();
        queries.get(source).map(|state| f(state))
    }
}

impl StoreBackend for MemoryStore {
    fn init_paths(&self, paths: &StorePaths) -> StoreResult<()> {
        *self.init_paths.lock() = Some(paths.clone());
        Ok(())
    }

    fn open(&self, name: &str, _paths: &StorePaths) -> StoreResult<Arc<dyn StoreHandle>> {
        let mut stores = self.stores.lock();
        let record = stores.entry(name.to_string()).or_insert(StoreRecord {
            format_version: MEMORY_FORMAT_VERSION,
            handle: None,
        });

        if record.format_version != MEMORY_FORMAT_VERSION {
            return Err(StoreError::version_mismatch(
                name,
                format!(
                    "store is format v{}, this binary reads v{}",
                    record.format_version, MEMORY_FORMAT_VERSION
                ),
            ));
        }

        let handle = Arc::new(MemoryStoreHandle {
            name: name.to_string(),
            open: AtomicBool::new(true),
            fail_compile: Arc::clone(&self.fail_compile),
            queries: Mutex::new(HashMap::new()),
        });
        record.handle = Some(Arc::clone(&handle));
        Ok(handle)
    }

    fn delete(&self, name: &str, _paths: &StorePaths) -> StoreResult<()> {
        if let Some(record) = self.stores.lock().remove(name) {
            if let Some(handle) = record.handle {
                handle.open.store(false, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

struct QueryState {
    next_token: AtomicU64,
    listeners: Mutex<HashMap<u64, ChangeListener>>,
}

/// An open in-memory store.
pub struct MemoryStoreHandle {
    name: String,
    open: AtomicBool,
    fail_compile: Arc<Mutex<Vec<String>>>,
    queries: Mutex<HashMap<String, Arc<QueryState>>>,
}

impl StoreHandle for MemoryStoreHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn compile_query(&self, source: &str) -> StoreResult<Box<dyn QueryHandle>> {
        if !self.is_open() {
            return Err(StoreError::Closed);
        }
        if self
            .fail_compile
            .lock()
            .iter()
            .any(|fragment| source.contains(fragment.as_str()))
        {
            return Err(StoreError::query_compile(source, "scripted compile failure"));
        }

        let state = Arc::clone(
            self.queries
                .lock()
                .entry(source.to_string())
                .or_insert_with(|| {
                    Arc::new(QueryState {
                        next_token: AtomicU64::new(1),
                        listeners: Mutex::new(HashMap::new()),
                    })
                }),
        );
        Ok(Box::new(MemoryQueryHandle {
            source: source.to_string(),
            state,
        }))
    }

    fn close(&self) -> StoreResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryQueryHandle {
    source: String,
    state: Arc<QueryState>,
}

impl QueryHandle for MemoryQueryHandle {
    fn source(&self) -> &str {
        &self.source
    }

    fn add_change_listener(&self, listener: ChangeListener) -> ListenerToken {
        let id = self.state.next_token.fetch_add(1, Ordering::SeqCst);
        self.state.listeners.lock().insert(id, listener);
        ListenerToken::new(id)
    }

    fn remove_listener(&self, token: ListenerToken) {
        self.state.listeners.lock().remove(&token.id());
    }
}

/// A result set backed by a plain row vector.
pub struct VecResultSet {
    valid: bool,
    rows: Vec<Row>,
}

impl VecResultSet {
    /// Creates a valid result set over `rows`.
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self { valid: true, rows }
    }

    /// Creates an invalid result set carrying no rows.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            valid: false,
            rows: Vec::new(),
        }
    }
}

impl ResultSet for VecResultSet {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }
}
