//! Host-facing session facade.

use crate::activity::ActivityLevel;
use crate::config::SessionConfig;
use crate::endpoint::{EndpointConfig, EndpointConfigurator};
use crate::error::SessionResult;
use crate::replicator::ReplicatorBackend;
use crate::session::{ReplicationSession, StatusCallback};
use parking_lot::Mutex;
use std::sync::Arc;
use syncdock_store::{QueryKey, RowsCallback, StoreBackend, StoreError, StoreLifecycleManager};
use tracing::debug;

/// The single entry point the host drives.
///
/// Wires the store lifecycle manager and the replication session together
/// and serializes every lifecycle operation: at most one of
/// [`SyncSession::init`], [`SyncSession::resume`], [`SyncSession::stop`]
/// or [`SyncSession::close_store`] runs at a time. The session is an
/// explicit object owned by the host; nothing here is process-wide.
pub struct SyncSession {
    config: SessionConfig,
    store: StoreLifecycleManager,
    configurator: EndpointConfigurator,
    endpoint: Mutex<Option<EndpointConfig>>,
    replication: ReplicationSession,
    lifecycle_op: Mutex<()>,
}

impl SyncSession {
    /// Creates a session over the two collaborator backends.
    pub fn new(
        config: SessionConfig,
        store_backend: Arc<dyn StoreBackend>,
        replicator_backend: Arc<dyn ReplicatorBackend>,
    ) -> Self {
        let store = StoreLifecycleManager::new(store_backend, config.store_name.clone());
        let configurator =
            EndpointConfigurator::new(config.proxy.clone(), config.credentials.clone());
        let replication = ReplicationSession::new(
            replicator_backend,
            config.start_wait_timeout,
            config.stop_wait_timeout,
        );
        Self {
            config,
            store,
            configurator,
            endpoint: Mutex::new(None),
            replication,
            lifecycle_op: Mutex::new(()),
        }
    }

    /// Opens the store at `store_path`, creates the query catalog, builds
    /// the endpoint configuration and starts the first replication.
    ///
    /// Any store setup failure aborts before replication is attempted.
    pub fn init(&self, store_path: &str) -> SessionResult<()> {
        let _op = self.lifecycle_op.lock();

        self.store.set_store_path(store_path)?;
        self.store.set_remote_host(&self.config.hostname);
        self.store.open_or_create()?;

        let handle = self.store.handle().ok_or(StoreError::NoOpenStore)?;

        // The previous configuration, if any, is discarded wholesale.
        let hostname = self.store.remote_host().unwrap_or_default();
        let mut endpoint = self.endpoint.lock();
        *endpoint = Some(self.configurator.build(&hostname)?);

        self.replication.start(endpoint.as_ref(), handle)?;
        Ok(())
    }

    /// Restarts the replication if it went offline or stopped; otherwise
    /// a no-op.
    ///
    /// There is no partial-reconnect path: a resume is always a full
    /// `stop` followed by `start` with a freshly built configuration.
    pub fn resume(&self) -> SessionResult<()> {
        let _op = self.lifecycle_op.lock();

        let status = self.replication.current_status();
        if !matches!(status, ActivityLevel::Offline | ActivityLevel::Stopped) {
            debug!("resume skipped, replication is {status}");
            return Ok(());
        }

        self.replication.stop()?;

        let handle = self.store.handle().ok_or(StoreError::NoOpenStore)?;
        let hostname = self.store.remote_host().unwrap_or_default();
        let mut endpoint = self.endpoint.lock();
        *endpoint = Some(self.configurator.build(&hostname)?);
        self.replication.start(endpoint.as_ref(), handle)?;
        Ok(())
    }

    /// Stops the replication, blocking until the collaborator reports it
    /// stopped.
    pub fn stop(&self) -> SessionResult<()> {
        let _op = self.lifecycle_op.lock();
        self.replication.stop()
    }

    /// Stops the replication, then closes the store; with `remove` the
    /// store is deleted afterwards.
    pub fn close_store(&self, remove: bool) -> SessionResult<()> {
        let _op = self.lifecycle_op.lock();
        self.replication.stop()?;
        self.store.close(remove)?;
        Ok(())
    }

    /// Binds or replaces the application callback receiving `key`'s row
    /// snapshots. Safe to call before [`SyncSession::init`].
    pub fn register_callback(&self, key: QueryKey, callback: RowsCallback) {
        self.store.registry().register_callback(key, callback);
    }

    /// Binds or replaces the host callback receiving deduplicated
    /// replication activity transitions.
    pub fn register_status_callback(&self, callback: StatusCallback) {
        self.replication.set_status_callback(callback);
    }

    /// The live replication activity level.
    pub fn replication_status(&self) -> ActivityLevel {
        self.replication.current_status()
    }

    /// Returns true while the local store is open.
    pub fn store_connected(&self) -> bool {
        self.store.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::BasicCredentials;
    use crate::replicator::MockReplicator;
    use syncdock_store::MemoryStore;

    const STORE_PATH: &str = "/data/app/files/store";

    fn session() -> (Arc<MemoryStore>, Arc<MockReplicator>, SyncSession) {
        let store_backend = Arc::new(MemoryStore::new());
        let replicator_backend = Arc::new(MockReplicator::new());
        let config = SessionConfig::new("sync.example.com")
            .with_credentials(BasicCredentials::new("reader", "secret"));
        let session = SyncSession::new(
            config,
            Arc::clone(&store_backend) as Arc<dyn StoreBackend>,
            Arc::clone(&replicator_backend) as Arc<dyn ReplicatorBackend>,
        );
        (store_backend, replicator_backend, session)
    }

    #[test]
    fn init_opens_store_and_starts_replication() {
        let (store_backend, replicator_backend, session) = session();

        session.init(STORE_PATH).unwrap();

        assert!(session.store_connected());
        assert!(store_backend.store_exists("db"));
        assert_eq!(session.replication_status(), ActivityLevel::Idle);

        let config = replicator_backend.last_config().unwrap();
        assert_eq!(config.url, "wss://sync.example.com:443/db");
        assert_eq!(replicator_backend.start_resets(), vec![true]);
    }

    #[test]
    fn init_aborts_before_replication_on_store_failure() {
        let (_store_backend, replicator_backend, session) = session();

        let err = session.init("/data/app/documents/store").unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(replicator_backend.created_count(), 0);
        assert_eq!(session.replication_status(), ActivityLevel::Stopped);
    }

    #[test]
    fn resume_is_a_no_op_while_idle() {
        let (_store_backend, replicator_backend, session) = session();

        session.init(STORE_PATH).unwrap();
        session.resume().unwrap();

        assert_eq!(replicator_backend.created_count(), 1);
        assert_eq!(replicator_backend.start_resets(), vec![true]);
    }

    #[test]
    fn resume_restarts_after_offline() {
        let (_store_backend, replicator_backend, session) = session();
        replicator_backend.script_start(vec![ActivityLevel::Connecting, ActivityLevel::Offline]);

        session.init(STORE_PATH).unwrap();
        assert_eq!(session.replication_status(), ActivityLevel::Offline);

        replicator_backend.script_start(vec![
            ActivityLevel::Connecting,
            ActivityLevel::Busy,
            ActivityLevel::Idle,
        ]);
        session.resume().unwrap();

        // A resume is a full restart: the old handle is released and a
        // fresh one created.
        assert_eq!(replicator_backend.created_count(), 2);
        assert_eq!(session.replication_status(), ActivityLevel::Idle);
    }

    #[test]
    fn stop_is_repeatable() {
        let (_store_backend, _replicator_backend, session) = session();

        session.stop().unwrap();
        session.init(STORE_PATH).unwrap();
        session.stop().unwrap();
        session.stop().unwrap();
        assert_eq!(session.replication_status(), ActivityLevel::Stopped);
    }

    #[test]
    fn close_store_tears_replication_down_first() {
        let (store_backend, _replicator_backend, session) = session();

        session.init(STORE_PATH).unwrap();
        session.close_store(true).unwrap();

        assert_eq!(session.replication_status(), ActivityLevel::Stopped);
        assert!(!session.store_connected());
        assert!(!store_backend.store_exists("db"));
    }
}
