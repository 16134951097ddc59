//! Integration tests wiring the facade over the reference collaborators.

use serde_json::json;
use std::sync::{Arc, Mutex};
use syncdock_session::{
    ActivityLevel, BasicCredentials, MockReplicator, ReplicatorBackend, SessionConfig, SyncSession,
};
use syncdock_store::{MemoryStore, QueryKey, Row, StoreBackend, MEMORY_FORMAT_VERSION};

const STORE_PATH: &str = "/data/app/files/store";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn make_session(
    store_backend: &Arc<MemoryStore>,
    replicator_backend: &Arc<MockReplicator>,
) -> SyncSession {
    let config = SessionConfig::new("sync.example.com")
        .with_credentials(BasicCredentials::new("reader", "secret"));
    SyncSession::new(
        config,
        Arc::clone(store_backend) as Arc<dyn StoreBackend>,
        Arc::clone(replicator_backend) as Arc<dyn ReplicatorBackend>,
    )
}

#[test]
fn full_session_lifecycle() {
    init_tracing();

    let store_backend = Arc::new(MemoryStore::new());
    let replicator_backend = Arc::new(MockReplicator::new());
    let session = make_session(&store_backend, &replicator_backend);

    // Callbacks bound before init are honored once the catalog exists.
    let profiles: Arc<Mutex<Vec<Vec<Row>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&profiles);
    session.register_callback(
        QueryKey::UserProfile,
        Arc::new(move |rows| sink.lock().unwrap().push(rows)),
    );

    let transitions: Arc<Mutex<Vec<ActivityLevel>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&transitions);
    session.register_status_callback(Arc::new(move |level| {
        sink.lock().unwrap().push(level);
    }));

    session.init(STORE_PATH).unwrap();
    assert!(session.store_connected());
    assert_eq!(session.replication_status(), ActivityLevel::Idle);

    // A pulled document shows up through the change path, rows in order.
    let rows = vec![json!({"name": "ada"}), json!({"name": "grace"})];
    store_backend.emit_change(
        "db",
        QueryKey::UserProfile.definition().source,
        rows.clone(),
    );
    {
        let profiles = profiles.lock().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0], rows);
    }

    session.stop().unwrap();
    assert_eq!(session.replication_status(), ActivityLevel::Stopped);

    // The host saw each distinct activity level exactly once per
    // transition.
    let seen = transitions.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ActivityLevel::Connecting,
            ActivityLevel::Busy,
            ActivityLevel::Idle,
            ActivityLevel::Stopped
        ]
    );
}

#[test]
fn resume_after_offline_recovers() {
    init_tracing();

    let store_backend = Arc::new(MemoryStore::new());
    let replicator_backend = Arc::new(MockReplicator::new());
    replicator_backend.script_start(vec![ActivityLevel::Connecting, ActivityLevel::Offline]);
    let session = make_session(&store_backend, &replicator_backend);

    session.init(STORE_PATH).unwrap();
    assert_eq!(session.replication_status(), ActivityLevel::Offline);

    // The endpoint comes back; the host resumes from its lifecycle hook.
    replicator_backend.script_start(vec![
        ActivityLevel::Connecting,
        ActivityLevel::Busy,
        ActivityLevel::Idle,
    ]);
    session.resume().unwrap();
    assert_eq!(session.replication_status(), ActivityLevel::Idle);

    // Every start was a checkpoint reset: sessions re-pull from scratch.
    assert!(replicator_backend.start_resets().iter().all(|reset| *reset));

    // Resuming while idle changes nothing.
    let created = replicator_backend.created_count();
    session.resume().unwrap();
    assert_eq!(replicator_backend.created_count(), created);
}

#[test]
fn incompatible_store_is_deleted_and_surfaced() {
    init_tracing();

    let store_backend = Arc::new(MemoryStore::new());
    store_backend.stamp_format("db", MEMORY_FORMAT_VERSION + 1);
    let replicator_backend = Arc::new(MockReplicator::new());
    let session = make_session(&store_backend, &replicator_backend);

    let err = session.init(STORE_PATH).unwrap_err();
    assert!(err.to_string().contains("incompatible store format"));

    // Destructive recovery ran, replication never started.
    assert!(!store_backend.store_exists("db"));
    assert_eq!(replicator_backend.created_count(), 0);

    // The caller decides whether to retry; a second init succeeds against
    // the now-absent store.
    session.init(STORE_PATH).unwrap();
    assert!(session.store_connected());
    assert_eq!(session.replication_status(), ActivityLevel::Idle);
}

#[test]
fn meta_keys_stay_quiet_while_data_keys_fan_out() {
    init_tracing();

    let store_backend = Arc::new(MemoryStore::new());
    let replicator_backend = Arc::new(MockReplicator::new());
    let session = make_session(&store_backend, &replicator_backend);

    let data_hits = Arc::new(Mutex::new(0u32));
    let meta_hits = Arc::new(Mutex::new(0u32));
    let sink = Arc::clone(&data_hits);
    session.register_callback(
        QueryKey::UserLicense,
        Arc::new(move |_| *sink.lock().unwrap() += 1),
    );
    let sink = Arc::clone(&meta_hits);
    session.register_callback(
        QueryKey::UserLicenseMetaId,
        Arc::new(move |_| *sink.lock().unwrap() += 1),
    );

    session.init(STORE_PATH).unwrap();

    store_backend.emit_change(
        "db",
        QueryKey::UserLicense.definition().source,
        vec![json!({"seats": 5})],
    );
    store_backend.emit_change(
        "db",
        QueryKey::UserLicenseMetaId.definition().source,
        vec![json!("license-1")],
    );

    assert_eq!(*data_hits.lock().unwrap(), 1);
    assert_eq!(*meta_hits.lock().unwrap(), 0);

    session.close_store(false).unwrap();

    // After teardown, changes reach nobody.
    store_backend.emit_change(
        "db",
        QueryKey::UserLicense.definition().source,
        vec![json!({"seats": 6})],
    );
    assert_eq!(*data_hits.lock().unwrap(), 1);
}
