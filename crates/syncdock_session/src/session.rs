//! Replication session state machine.

use crate::activity::ActivityLevel;
use crate::endpoint::EndpointConfig;
use crate::error::{SessionError, SessionResult};
use crate::replicator::{ReplicatorBackend, ReplicatorHandle, StatusListener};
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use syncdock_store::{ListenerToken, StoreHandle};
use tracing::{debug, info, warn};

/// Host callback invoked once per observed activity level transition.
///
/// Consecutive duplicate levels are suppressed; the callback arrives on
/// the replication collaborator's worker thread.
pub type StatusCallback = Arc<dyn Fn(ActivityLevel) + Send + Sync>;

/// Re-check granularity of the blocking waits. The status listener
/// normally wakes the waiter immediately; the tick only bounds how long a
/// missed notification can delay the exit.
const WAIT_TICK: Duration = Duration::from_millis(100);

struct ActiveReplicator {
    handle: Box<dyn ReplicatorHandle>,
    listener: ListenerToken,
}

struct Observed {
    cached: Mutex<ActivityLevel>,
    signal: Condvar,
}

/// The lifecycle state machine of one pull replication.
///
/// States walk `Stopped → Connecting → (Offline | Idle | Busy) → Stopped`.
/// The underlying replicator is created lazily on the first
/// [`ReplicationSession::start`], reused across repeated starts and
/// released on [`ReplicationSession::stop`].
///
/// Callers must serialize `start`/`stop`/`current_status`; the facade
/// guarantees at most one lifecycle operation in flight.
pub struct ReplicationSession {
    backend: Arc<dyn ReplicatorBackend>,
    active: Mutex<Option<ActiveReplicator>>,
    observed: Arc<Observed>,
    status_callback: Arc<RwLock<Option<StatusCallback>>>,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl ReplicationSession {
    /// Creates a handle-less session over the replication collaborator.
    pub fn new(
        backend: Arc<dyn ReplicatorBackend>,
        start_timeout: Duration,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            active: Mutex::new(None),
            observed: Arc::new(Observed {
                cached: Mutex::new(ActivityLevel::Stopped),
                signal: Condvar::new(),
            }),
            status_callback: Arc::new(RwLock::new(None)),
            start_timeout,
            stop_timeout,
        }
    }

    /// Binds or replaces the host status callback.
    pub fn set_status_callback(&self, callback: StatusCallback) {
        *self.status_callback.write() = Some(callback);
    }

    /// Starts (or restarts) the replication and blocks until it settles.
    ///
    /// Creates the underlying replicator from `config` on first use. The
    /// checkpoint is always reset: a session re-pulls from scratch. The
    /// call returns once the live activity reaches `Idle`, `Offline` or
    /// `Stopped`, whichever comes first.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoEndpointConfigured`] when a replicator must be
    ///   created and no configuration was supplied
    /// - [`SessionError::WaitTimeout`] if the deadline expires before the
    ///   replication settles; the replicator is left running
    /// - the collaborator's create failure
    pub fn start(
        &self,
        config: Option<&EndpointConfig>,
        store: Arc<dyn StoreHandle>,
    ) -> SessionResult<ActivityLevel> {
        let mut slot = self.active.lock();
        let active = match slot.take() {
            Some(active) => active,
            None => {
                let config = config.ok_or(SessionError::NoEndpointConfigured)?;
                debug!("creating replicator for {}", config.url);
                let handle = self.backend.create(config, store)?;
                let listener = handle.add_status_listener(self.status_listener());
                ActiveReplicator { handle, listener }
            }
        };
        let active = slot.insert(active);

        let started = Instant::now();
        active.handle.start(true);
        info!("replication started (pull)");

        let deadline = started + self.start_timeout;
        let level = Self::wait_until(&self.observed, active.handle.as_ref(), deadline, |level| {
            level.is_settled()
        })?;

        info!(
            "replication settled at {level} in {:.3}s (pull)",
            started.elapsed().as_secs_f64()
        );
        Ok(level)
    }

    /// Stops the replication, blocking until the collaborator reports
    /// `Stopped`, then removes the status listener and releases the
    /// handle. Without a handle this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WaitTimeout`] if the deadline expires; the
    /// handle and listener are kept so the caller can retry.
    pub fn stop(&self) -> SessionResult<()> {
        let mut slot = self.active.lock();
        let Some(active) = slot.take() else {
            debug!("stop requested with no replicator");
            return Ok(());
        };

        debug!("stopping replication (pull)");
        if active.handle.status().activity != ActivityLevel::Stopped {
            active.handle.stop();
        }

        let deadline = Instant::now() + self.stop_timeout;
        let wait = Self::wait_until(&self.observed, active.handle.as_ref(), deadline, |level| {
            level == ActivityLevel::Stopped
        });
        if let Err(err) = wait {
            warn!("replication did not stop in time: {err}");
            *slot = Some(active);
            return Err(err);
        }

        // Unregister before release so no notification fires against a
        // freed handle.
        active.handle.remove_status_listener(active.listener);
        drop(active);
        *self.observed.cached.lock() = ActivityLevel::Stopped;
        info!("replication stopped (pull)");
        Ok(())
    }

    /// The live activity level; `Stopped` when no replicator exists.
    pub fn current_status(&self) -> ActivityLevel {
        let slot = self.active.lock();
        let level = match slot.as_ref() {
            Some(active) => active.handle.status().activity,
            None => ActivityLevel::Stopped,
        };
        debug!("replication status: {level}");
        level
    }

    /// Blocks until the live activity satisfies `settled` or the deadline
    /// expires. Woken by the status listener; re-checks at least every
    /// [`WAIT_TICK`].
    fn wait_until(
        observed: &Observed,
        handle: &dyn ReplicatorHandle,
        deadline: Instant,
        settled: impl Fn(ActivityLevel) -> bool,
    ) -> SessionResult<ActivityLevel> {
        loop {
            let level = handle.status().activity;
            if settled(level) {
                return Ok(level);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::WaitTimeout { last: level });
            }

            let mut cached = observed.cached.lock();
            let _ = observed
                .signal
                .wait_for(&mut cached, WAIT_TICK.min(deadline - now));
        }
    }

    /// Builds the collaborator-facing status listener.
    ///
    /// Pure observation: logs and caches level transitions with duplicate
    /// suppression, forwards distinct levels to the host callback and
    /// wakes any blocked wait. Never mutates the replication itself.
    fn status_listener(&self) -> StatusListener {
        let observed = Arc::clone(&self.observed);
        let callback = Arc::clone(&self.status_callback);
        Arc::new(move |status| {
            let changed = {
                let mut cached = observed.cached.lock();
                let changed = *cached != status.activity;
                if changed || status.error.is_some() {
                    match &status.error {
                        Some(err) => warn!(
                            "replicator status updated: {} -> {} (error {}: {})",
                            *cached, status.activity, err.code, err.message
                        ),
                        None => debug!(
                            "replicator status updated: {} -> {}",
                            *cached, status.activity
                        ),
                    }
                    *cached = status.activity;
                }
                changed
            };

            if changed {
                if let Some(callback) = callback.read().as_ref() {
                    callback(status.activity);
                }
            }
            observed.signal.notify_all();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{BasicCredentials, EndpointConfigurator, ProxySettings};
    use crate::replicator::MockReplicator;
    use std::sync::Mutex as StdMutex;
    use syncdock_store::{MemoryStore, StoreBackend, StorePaths};

    fn store() -> Arc<dyn StoreHandle> {
        let backend = MemoryStore::new();
        let paths = StorePaths::derive("/data/app/files/store").unwrap();
        backend.open("db", &paths).unwrap()
    }

    fn config() -> EndpointConfig {
        EndpointConfigurator::new(ProxySettings::default(), BasicCredentials::new("u", "p"))
            .build("sync.example.com")
            .unwrap()
    }

    fn session(backend: &Arc<MockReplicator>) -> ReplicationSession {
        ReplicationSession::new(
            Arc::clone(backend) as Arc<dyn ReplicatorBackend>,
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn start_blocks_until_idle() {
        let backend = Arc::new(MockReplicator::new());
        let session = session(&backend);

        let level = session.start(Some(&config()), store()).unwrap();
        assert_eq!(level, ActivityLevel::Idle);
        assert_eq!(session.current_status(), ActivityLevel::Idle);
        assert_eq!(backend.created_count(), 1);
        assert_eq!(backend.start_resets(), vec![true]);
    }

    #[test]
    fn start_without_config_fails() {
        let backend = Arc::new(MockReplicator::new());
        let session = session(&backend);

        let err = session.start(None, store()).unwrap_err();
        assert!(matches!(err, SessionError::NoEndpointConfigured));
        assert_eq!(backend.created_count(), 0);
    }

    #[test]
    fn start_settles_on_offline() {
        let backend = Arc::new(MockReplicator::new());
        backend.script_start(vec![ActivityLevel::Connecting, ActivityLevel::Offline]);
        let session = session(&backend);

        let level = session.start(Some(&config()), store()).unwrap();
        assert_eq!(level, ActivityLevel::Offline);
    }

    #[test]
    fn start_times_out_when_never_settling() {
        let backend = Arc::new(MockReplicator::new());
        backend.script_start(vec![ActivityLevel::Connecting, ActivityLevel::Busy]);
        let session = ReplicationSession::new(
            Arc::clone(&backend) as Arc<dyn ReplicatorBackend>,
            Duration::from_millis(150),
            Duration::from_secs(2),
        );

        let err = session.start(Some(&config()), store()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::WaitTimeout {
                last: ActivityLevel::Busy
            }
        ));

        // The session is still usable: stop tears it down.
        session.stop().unwrap();
        assert_eq!(session.current_status(), ActivityLevel::Stopped);
    }

    #[test]
    fn stop_without_handle_is_a_no_op_twice() {
        let backend = Arc::new(MockReplicator::new());
        let session = session(&backend);

        session.stop().unwrap();
        session.stop().unwrap();
        assert_eq!(session.current_status(), ActivityLevel::Stopped);
    }

    #[test]
    fn stop_after_start_returns_to_stopped() {
        let backend = Arc::new(MockReplicator::new());
        let session = session(&backend);

        session.start(Some(&config()), store()).unwrap();
        session.stop().unwrap();
        assert_eq!(session.current_status(), ActivityLevel::Stopped);

        // A fresh start after stop creates a new replicator.
        session.start(Some(&config()), store()).unwrap();
        assert_eq!(backend.created_count(), 2);
    }

    #[test]
    fn handle_is_reused_across_starts() {
        let backend = Arc::new(MockReplicator::new());
        let session = session(&backend);

        session.start(Some(&config()), store()).unwrap();
        session.start(Some(&config()), store()).unwrap();

        assert_eq!(backend.created_count(), 1);
        assert_eq!(backend.start_resets(), vec![true, true]);
    }

    #[test]
    fn status_callback_suppresses_duplicate_levels() {
        let backend = Arc::new(MockReplicator::new());
        backend.script_start(vec![
            ActivityLevel::Connecting,
            ActivityLevel::Connecting,
            ActivityLevel::Busy,
            ActivityLevel::Idle,
        ]);
        let session = session(&backend);

        let seen: Arc<StdMutex<Vec<ActivityLevel>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.set_status_callback(Arc::new(move |level| {
            sink.lock().unwrap().push(level);
        }));

        session.start(Some(&config()), store()).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ActivityLevel::Connecting,
                ActivityLevel::Busy,
                ActivityLevel::Idle
            ]
        );
    }

    #[test]
    fn status_error_does_not_disturb_suppression() {
        let backend = Arc::new(MockReplicator::new());
        backend.script_start(vec![
            ActivityLevel::Connecting,
            ActivityLevel::Connecting,
            ActivityLevel::Idle,
        ]);
        backend.script_error_at(ActivityLevel::Connecting, 11001, "socket reset");
        let session = session(&backend);

        let seen: Arc<StdMutex<Vec<ActivityLevel>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.set_status_callback(Arc::new(move |level| {
            sink.lock().unwrap().push(level);
        }));

        session.start(Some(&config()), store()).unwrap();

        // The duplicate connecting update carried an error: it is logged
        // but not forwarded as a transition.
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ActivityLevel::Connecting, ActivityLevel::Idle]
        );
    }

    #[test]
    fn create_failure_propagates() {
        let backend = Arc::new(MockReplicator::new());
        backend.fail_create("no transport");
        let session = session(&backend);

        let err = session.start(Some(&config()), store()).unwrap_err();
        assert!(matches!(err, SessionError::Replicator { .. }));
        assert_eq!(session.current_status(), ActivityLevel::Stopped);
    }
}
