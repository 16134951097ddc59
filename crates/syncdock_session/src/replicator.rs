//! Replication collaborator trait definitions and mock backend.

use crate::activity::{ActivityLevel, ReplicatorStatus, StatusError};
use crate::endpoint::EndpointConfig;
use crate::error::{SessionError, SessionResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use syncdock_store::{ListenerToken, StoreHandle};

/// Callback invoked by the collaborator on every status update.
///
/// Invocations are serialized per listener by the collaborator and arrive
/// on its worker thread.
pub type StatusListener = Arc<dyn Fn(&ReplicatorStatus) + Send + Sync>;

/// The replication collaborator: creates replicators bound to a store.
///
/// # Implementors
///
/// - [`MockReplicator`] - scripted backend for testing
pub trait ReplicatorBackend: Send + Sync {
    /// Creates a replicator for the endpoint, bound to the open store.
    fn create(
        &self,
        config: &EndpointConfig,
        store: Arc<dyn StoreHandle>,
    ) -> SessionResult<Box<dyn ReplicatorHandle>>;
}

/// One underlying replication instance.
pub trait ReplicatorHandle: Send + Sync {
    /// Starts the replication.
    ///
    /// With `reset_checkpoint`, any previously saved progress is discarded
    /// and the replication re-pulls from scratch. Implementations leave
    /// the `Stopped` level before returning, so a status read after
    /// `start` never reports the pre-start `Stopped`.
    fn start(&self, reset_checkpoint: bool);

    /// Requests the replication to stop. Asynchronous; observe
    /// [`ReplicatorHandle::status`] for the transition to
    /// [`ActivityLevel::Stopped`].
    fn stop(&self);

    /// Reads the live status.
    fn status(&self) -> ReplicatorStatus;

    /// Registers a status listener.
    fn add_status_listener(&self, listener: StatusListener) -> ListenerToken;

    /// Removes a previously registered listener. Unknown tokens are
    /// ignored.
    fn remove_status_listener(&self, token: ListenerToken);
}

struct ScriptState {
    start_walk: Mutex<Vec<ActivityLevel>>,
    stop_walk: Mutex<Vec<ActivityLevel>>,
    step_delay: Mutex<Duration>,
    error_at: Mutex<Option<(ActivityLevel, StatusError)>>,
}

/// A scripted replicator backend for testing.
///
/// Each `start`/`stop` walks the scripted activity levels on a worker
/// thread, firing status listeners at every step. Defaults: start walks
/// `connecting → busy → idle`, stop walks to `stopped`.
pub struct MockReplicator {
    script: Arc<ScriptState>,
    created: AtomicUsize,
    last_config: Mutex<Option<EndpointConfig>>,
    start_resets: Arc<Mutex<Vec<bool>>>,
    fail_create: Mutex<Option<String>>,
}

impl MockReplicator {
    /// Creates a backend with the default scripts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(ScriptState {
                start_walk: Mutex::new(vec![
                    ActivityLevel::Connecting,
                    ActivityLevel::Busy,
                    ActivityLevel::Idle,
                ]),
                stop_walk: Mutex::new(vec![ActivityLevel::Stopped]),
                step_delay: Mutex::new(Duration::from_millis(2)),
                error_at: Mutex::new(None),
            }),
            created: AtomicUsize::new(0),
            last_config: Mutex::new(None),
            start_resets: Arc::new(Mutex::new(Vec::new())),
            fail_create: Mutex::new(None),
        }
    }

    /// Scripts the activity walk performed on `start`.
    pub fn script_start(&self, walk: Vec<ActivityLevel>) {
        *self.script.start_walk.lock() = walk;
    }

    /// Scripts the activity walk performed on `stop`.
    pub fn script_stop(&self, walk: Vec<ActivityLevel>) {
        *self.script.stop_walk.lock() = walk;
    }

    /// Sets the delay between scripted steps.
    pub fn set_step_delay(&self, delay: Duration) {
        *self.script.step_delay.lock() = delay;
    }

    /// Attaches an error to every status update at `level`.
    pub fn script_error_at(&self, level: ActivityLevel, code: i32, message: impl Into<String>) {
        *self.script.error_at.lock() = Some((
            level,
            StatusError {
                code,
                message: message.into(),
            },
        ));
    }

    /// Makes the next `create` call fail.
    pub fn fail_create(&self, message: impl Into<String>) {
        *self.fail_create.lock() = Some(message.into());
    }

    /// Number of replicators created so far.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// The configuration most recently passed to `create`.
    #[must_use]
    pub fn last_config(&self) -> Option<EndpointConfig> {
        self.last_config.lock().clone()
    }

    /// The `reset_checkpoint` flags of every `start` call, in order.
    #[must_use]
    pub fn start_resets(&self) -> Vec<bool> {
        self.start_resets.lock().clone()
    }
}

impl Default for MockReplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicatorBackend for MockReplicator {
    fn create(
        &self,
        config: &EndpointConfig,
        _store: Arc<dyn StoreHandle>,
    ) -> SessionResult<Box<dyn ReplicatorHandle>> {
        if let Some(message) = self.fail_create.lock().take() {
            return Err(SessionError::replicator(message));
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock() = Some(config.clone());

        Ok(Box::new(MockReplicatorHandle {
            script: Arc::clone(&self.script),
            start_resets: Arc::clone(&self.start_resets),
            state: Arc::new(HandleState {
                activity: Mutex::new(ActivityLevel::Stopped),
                next_token: AtomicU64::new(1),
                listeners: Mutex::new(HashMap::new()),
            }),
        }))
    }
}

struct HandleState {
    activity: Mutex<ActivityLevel>,
    next_token: AtomicU64,
    listeners: Mutex<HashMap<u64, StatusListener>>,
}

impl HandleState {
    fn transition(&self, level: ActivityLevel, error_at: &Option<(ActivityLevel, StatusError)>) {
        *self.activity.lock() = level;

        let error = error_at
            .as_ref()
            .filter(|(at, _)| *at == level)
            .map(|(_, err)| err.clone());
        let status = ReplicatorStatus {
            activity: level,
            error,
        };

        let listeners: Vec<StatusListener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(&status);
        }
    }
}

struct MockReplicatorHandle {
    script: Arc<ScriptState>,
    start_resets: Arc<Mutex<Vec<bool>>>,
    state: Arc<HandleState>,
}

impl MockReplicatorHandle {
    fn walk(&self, levels: Vec<ActivityLevel>) {
        let state = Arc::clone(&self.state);
        let delay = *self.script.step_delay.lock();
        let error_at = self.script.error_at.lock().clone();
        thread::spawn(move || {
            for level in levels {
                thread::sleep(delay);
                state.transition(level, &error_at);
            }
        });
    }
}

impl ReplicatorHandle for MockReplicatorHandle {
    fn start(&self, reset_checkpoint: bool) {
        self.start_resets.lock().push(reset_checkpoint);
        let mut walk = self.script.start_walk.lock().clone();
        // The first step happens synchronously, matching the trait
        // contract that `start` leaves the `Stopped` level before
        // returning.
        if !walk.is_empty() {
            let error_at = self.script.error_at.lock().clone();
            self.state.transition(walk.remove(0), &error_at);
        }
        self.walk(walk);
    }

    fn stop(&self) {
        let walk = self.script.stop_walk.lock().clone();
        self.walk(walk);
    }

    fn status(&self) -> ReplicatorStatus {
        ReplicatorStatus::at(*self.state.activity.lock())
    }

    fn add_status_listener(&self, listener: StatusListener) -> ListenerToken {
        let id = self.state.next_token.fetch_add(1, Ordering::SeqCst);
        self.state.listeners.lock().insert(id, listener);
        ListenerToken::new(id)
    }

    fn remove_status_listener(&self, token: ListenerToken) {
        self.state.listeners.lock().remove(&token.id());
    }
}
