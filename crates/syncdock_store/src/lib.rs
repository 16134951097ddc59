//! # syncdock Store Layer
//!
//! Local store lifecycle and query change routing for syncdock.
//!
//! This crate provides:
//! - Collaborator traits for the underlying document store
//! - Store path resolution (data + cache locations)
//! - The fixed query catalog and its registry
//! - Change-listener registration and callback fan-out
//! - An in-memory store backend for testing
//!
//! ## Architecture
//!
//! The actual storage/query engine lives behind the [`StoreBackend`],
//! [`StoreHandle`] and [`QueryHandle`] traits. This crate never executes a
//! query or persists a document; it sequences open/create/close/delete and
//! routes change notifications from compiled queries to application
//! callbacks.
//!
//! ## Key Invariants
//!
//! - The catalog is static; every key compiles against the open store in
//!   declaration order
//! - Change listeners are removed before their query handle is released,
//!   per entry
//! - Query handles and listeners are torn down before the store is closed
//!   or deleted
//! - Rows handed to callbacks are owned snapshots; the collaborator's
//!   result set is never retained past the callback

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod catalog;
mod error;
mod lifecycle;
mod memory;
mod paths;
mod registry;

pub use backend::{
    ChangeListener, ListenerToken, QueryHandle, ResultSet, Row, StoreBackend, StoreHandle,
};
pub use catalog::{QueryDef, QueryKey, CATALOG};
pub use error::{StoreError, StoreResult};
pub use lifecycle::StoreLifecycleManager;
pub use memory::{MemoryStore, VecResultSet, MEMORY_FORMAT_VERSION};
pub use paths::{StorePaths, CACHE_FOLDER_NAME, DATA_FOLDER_NAME};
pub use registry::{QueryRegistry, RowsCallback};
