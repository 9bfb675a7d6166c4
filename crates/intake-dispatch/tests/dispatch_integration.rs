#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end tests of the intake service against a mock downstream webhook,
//! a temp-dir storage provider and an in-memory audit trail.

use intake_audit::{events, MemoryAuditSink, WebhookAuditSink};
use intake_core::{CommandGrammar, FileCategory, IntakeError};
use intake_dispatch::{
    DeliveryContext, DeliveryPool, DispatchConfig, DispatchPayload, Dispatcher, IntakeService,
    RetryPolicy, ServiceDeps, TriggerOutcome, WebhookDeliverer,
};
use intake_session::{InMemorySessionStore, SessionState, SessionStore};
use intake_storage::{LocalFolderGateway, StorageConfig, StorageGateway};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    service: Arc<IntakeService>,
    audit: Arc<MemoryAuditSink>,
    root: PathBuf,
    _tmp: tempfile::TempDir,
}

fn fast_config(downstream_url: String) -> DispatchConfig {
    DispatchConfig {
        downstream_url,
        request_timeout_secs: 5,
        retry_policy: RetryPolicy {
            max_attempts: 3,
            backoff_base_ms: 10,
            backoff_max_ms: 50,
        },
        ..DispatchConfig::default()
    }
}

async fn harness(config: DispatchConfig) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("sessions");
    let storage = LocalFolderGateway::new(StorageConfig {
        root: root.clone(),
        file_url_base: Some("https://files.example.com".into()),
        ..StorageConfig::default()
    })
    .await
    .unwrap();
    let audit = Arc::new(MemoryAuditSink::new());
    let deliverer =
        WebhookDeliverer::new(config.downstream_url.clone(), config.request_timeout()).unwrap();

    let service = IntakeService::new(
        ServiceDeps {
            store: Arc::new(InMemorySessionStore::new()),
            storage: Arc::new(storage),
            audit: audit.clone(),
            deliverer: Arc::new(deliverer),
        },
        &config,
        CommandGrammar::default(),
        Duration::from_secs(5),
    );
    Harness {
        service: Arc::new(service),
        audit,
        root,
        _tmp: tmp,
    }
}

fn upload(root: &Path, session_id: &str, name: &str) {
    std::fs::write(root.join(session_id).join(name), b"data").unwrap();
}

/// Polls until the session reaches `state` or five seconds pass.
async fn wait_for_state(service: &IntakeService, id: &str, state: SessionState) {
    for _ in 0..100 {
        if service.session(id).unwrap().state == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "session {id} stuck in {} waiting for {state}",
        service.session(id).unwrap().state
    );
}

async fn ok_downstream(expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assess"))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

// --- Session lifecycle ---

#[tokio::test]
async fn test_open_session_creates_folder_and_audits() {
    let server = ok_downstream(0).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;

    let session = h
        .service
        .open_session(" ops@example.com ", "Assess network")
        .await
        .unwrap();

    assert!(session.id.starts_with("Temp_"));
    assert!(session.id.contains("ops_example_com"));
    assert_eq!(session.email, "ops@example.com");
    assert_eq!(session.state, SessionState::Created);
    assert!(h.root.join(&session.id).is_dir());
    assert!(session.folder.display_url().ends_with(&session.id));
    assert_eq!(h.audit.events_for(&session.id), vec![events::SESSION_CREATED]);
}

#[tokio::test]
async fn test_open_session_requires_email_and_goal() {
    let server = ok_downstream(0).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;

    let err = h.service.open_session("", "goal").await.unwrap_err();
    assert!(matches!(err, IntakeError::InvalidInput(_)));
    let err = h.service.open_session("a@b.com", "   ").await.unwrap_err();
    assert!(matches!(err, IntakeError::InvalidInput(_)));
    assert_eq!(h.service.session_count(), 0);
}

#[tokio::test]
async fn test_list_files_classifies_and_checks_email() {
    let server = ok_downstream(0).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "Q3_asset_inventory.xlsx");
    upload(&h.root, &session.id, "randomfile.txt");

    let listed = h.service.list_files(&session.id, "A@B.com").await.unwrap();
    assert_eq!(listed.state, SessionState::FilesReady);
    let categories: Vec<FileCategory> = listed.files.iter().map(|f| f.category).collect();
    assert_eq!(
        categories,
        vec![FileCategory::AssetInventory, FileCategory::General]
    );
    assert_eq!(
        listed.files[0].url,
        format!("https://files.example.com/{}/Q3_asset_inventory.xlsx", session.id)
    );

    let err = h
        .service
        .list_files(&session.id, "someone@else.com")
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::NotFound(_)));

    let err = h.service.list_files("Temp_missing", "a@b.com").await.unwrap_err();
    assert!(matches!(err, IntakeError::NotFound(_)));

    assert_eq!(
        h.audit.events_for(&session.id),
        vec![events::SESSION_CREATED, events::FILES_LISTED]
    );
}

#[tokio::test]
async fn test_empty_listing_keeps_previous_snapshot() {
    let server = ok_downstream(0).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "firewall_rules_v2.csv");
    h.service.list_files(&session.id, "a@b.com").await.unwrap();

    std::fs::remove_file(h.root.join(&session.id).join("firewall_rules_v2.csv")).unwrap();
    let listed = h.service.list_files(&session.id, "a@b.com").await.unwrap();
    assert_eq!(listed.files.len(), 1);
    assert_eq!(listed.files[0].category, FileCategory::FirewallRules);
}

#[tokio::test]
async fn test_refresh_with_stale_snapshot_keeps_stored_files() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("sessions");
    let storage = Arc::new(
        LocalFolderGateway::new(StorageConfig {
            root: root.clone(),
            ..StorageConfig::default()
        })
        .await
        .unwrap(),
    );
    let store = Arc::new(InMemorySessionStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let pool = Arc::new(DeliveryPool::start(
        1,
        1,
        DeliveryContext {
            store: store.clone(),
            deliverer: Arc::new(
                WebhookDeliverer::new("http://127.0.0.1:1/assess", Duration::from_secs(1))
                    .unwrap(),
            ),
            audit: audit.clone(),
            deadline: Duration::from_secs(5),
        },
    ));
    let dispatcher = Dispatcher::new(
        store.clone(),
        storage.clone(),
        audit,
        pool,
        Duration::from_secs(5),
        None,
    );

    let folder = storage.create_folder("s-1").await.unwrap();
    store
        .create("s-1".into(), "a@b.com", "goal", folder)
        .unwrap();
    // Two concurrent listings both start from this empty snapshot.
    let stale = store.get("s-1").unwrap();

    upload(&root, "s-1", "network_diagram.png");
    let first = dispatcher.refresh(&stale).await.unwrap();
    assert_eq!(first.files.len(), 1);

    // The second listing lags and comes back empty.
    std::fs::remove_file(root.join("s-1").join("network_diagram.png")).unwrap();
    let second = dispatcher.refresh(&stale).await.unwrap();
    assert_eq!(second.files.len(), 1);

    let stored = store.get("s-1").unwrap();
    assert_eq!(stored.files.len(), 1);
    assert_eq!(stored.state, SessionState::FilesReady);
}

#[tokio::test]
async fn test_listing_replaces_files_wholesale() {
    let server = ok_downstream(0).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "a_backup.pdf");
    h.service.list_files(&session.id, "a@b.com").await.unwrap();
    upload(&h.root, &session.id, "b_roadmap.docx");

    let listed = h.service.list_files(&session.id, "a@b.com").await.unwrap();
    let names: Vec<&str> = listed.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a_backup.pdf", "b_roadmap.docx"]);
}

// --- Dispatch ---

#[tokio::test]
async fn test_trigger_without_files_waits() {
    let server = ok_downstream(0).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();

    let outcome = h.service.dispatch(&session.id).await.unwrap();
    assert_eq!(outcome, TriggerOutcome::WaitingForFiles);
    assert_eq!(outcome.as_status(), "waiting_for_files");
    assert_eq!(
        h.service.session(&session.id).unwrap().state,
        SessionState::Created
    );
}

#[tokio::test]
async fn test_trigger_refreshes_files_itself() {
    let server = ok_downstream(1).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "capacity_plan.xlsx");

    let outcome = h.service.dispatch(&session.id).await.unwrap();
    assert_eq!(outcome, TriggerOutcome::Triggered);
    wait_for_state(&h.service, &session.id, SessionState::Dispatched).await;
}

#[tokio::test]
async fn test_concurrent_triggers_dispatch_once() {
    let server = ok_downstream(1).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "network_latency_log.csv");
    h.service.list_files(&session.id, "a@b.com").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = h.service.clone();
        let id = session.id.clone();
        handles.push(tokio::spawn(async move { service.dispatch(&id).await }));
    }
    let mut triggered = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            TriggerOutcome::Triggered => triggered += 1,
            TriggerOutcome::AlreadyTriggered => {}
            other => panic!("unexpected outcome {other}"),
        }
    }
    assert_eq!(triggered, 1);

    wait_for_state(&h.service, &session.id, SessionState::Dispatched).await;
    let stored = h.service.session(&session.id).unwrap();
    assert!(stored.last_dispatch_attempt.is_some());
    assert!(stored.last_error.is_none());
    assert_eq!(
        h.audit.events_for(&session.id),
        vec![
            events::SESSION_CREATED,
            events::FILES_LISTED,
            events::ASSESSMENT_TRIGGERED
        ]
    );
}

#[tokio::test]
async fn test_second_trigger_after_success_is_noop() {
    let server = ok_downstream(1).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "gap_working.xlsx");

    assert_eq!(
        h.service.dispatch(&session.id).await.unwrap(),
        TriggerOutcome::Triggered
    );
    wait_for_state(&h.service, &session.id, SessionState::Dispatched).await;
    assert_eq!(
        h.service.dispatch(&session.id).await.unwrap(),
        TriggerOutcome::AlreadyTriggered
    );
    assert_eq!(
        h.service.submit_message(&session.id, "upload done").await.unwrap(),
        TriggerOutcome::AlreadyTriggered
    );
}

#[tokio::test]
async fn test_payload_shape() {
    let server = ok_downstream(1).await;
    let mut config = fast_config(format!("{}/assess", server.uri()));
    config.next_action_webhook = Some("https://hooks.example.com/next".into());
    let h = harness(config).await;
    let session = h.service.open_session("a@b.com", "Assess DR").await.unwrap();
    upload(&h.root, &session.id, "backup_compliance.pdf");

    h.service.dispatch(&session.id).await.unwrap();
    wait_for_state(&h.service, &session.id, SessionState::Dispatched).await;

    let requests = server.received_requests().await.unwrap();
    let payload: DispatchPayload = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload.session_id, session.id);
    assert_eq!(payload.goal, "Assess DR");
    assert_eq!(payload.folder_ref.id, session.id);
    assert_eq!(payload.files[0].category, FileCategory::ComplianceReport);
    assert_eq!(
        payload.next_action_webhook.as_deref(),
        Some("https://hooks.example.com/next")
    );

    let raw: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(raw["files"][0]["type"], "compliance_report");
    assert_eq!(raw["files"][0]["file_name"], "backup_compliance.pdf");
}

#[tokio::test]
async fn test_exhausted_retries_fail_then_manual_retry_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "asset_list.csv");

    assert_eq!(
        h.service.dispatch(&session.id).await.unwrap(),
        TriggerOutcome::Triggered
    );
    wait_for_state(&h.service, &session.id, SessionState::DispatchFailed).await;
    let failed = h.service.session(&session.id).unwrap();
    assert!(failed.last_error.as_deref().unwrap().contains("503"));

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    assert_eq!(
        h.service.submit_message(&session.id, "retry").await.unwrap(),
        TriggerOutcome::Triggered
    );
    wait_for_state(&h.service, &session.id, SessionState::Dispatched).await;
    assert!(h.service.session(&session.id).unwrap().last_error.is_none());
    assert_eq!(
        h.audit.events_for(&session.id),
        vec![
            events::SESSION_CREATED,
            events::ASSESSMENT_TRIGGER_FAILED,
            events::ASSESSMENT_TRIGGERED
        ]
    );
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad folder"))
        .expect(1)
        .mount(&server)
        .await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "strategy.docx");

    h.service.dispatch(&session.id).await.unwrap();
    wait_for_state(&h.service, &session.id, SessionState::DispatchFailed).await;
    let failed = h.service.session(&session.id).unwrap();
    let error = failed.last_error.unwrap();
    assert!(error.contains("Permanent"));
    assert!(error.contains("bad folder"));
}

#[tokio::test]
async fn test_delivery_deadline_fails_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
        .mount(&server)
        .await;
    let mut config = fast_config(format!("{}/assess", server.uri()));
    config.delivery_deadline_secs = 1;
    let h = harness(config).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "logs.txt");

    h.service.dispatch(&session.id).await.unwrap();
    wait_for_state(&h.service, &session.id, SessionState::DispatchFailed).await;
    let failed = h.service.session(&session.id).unwrap();
    assert!(failed.last_error.unwrap().contains("deadline"));
}

#[tokio::test]
async fn test_full_queue_fails_trigger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    let mut config = fast_config(format!("{}/assess", server.uri()));
    config.workers = 1;
    config.queue_capacity = 1;
    let h = harness(config).await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let session = h
            .service
            .open_session(&format!("user{i}@b.com"), "goal")
            .await
            .unwrap();
        upload(&h.root, &session.id, "inventory.csv");
        h.service.list_files(&session.id, &session.email).await.unwrap();
        ids.push(session.id);
    }

    let mut rejected = Vec::new();
    for id in &ids {
        match h.service.dispatch(id).await {
            Ok(outcome) => assert_eq!(outcome, TriggerOutcome::Triggered),
            Err(e) => {
                assert!(e.is_transient());
                rejected.push(id.clone());
            }
        }
    }
    assert!(!rejected.is_empty());
    for id in &rejected {
        let session = h.service.session(id).unwrap();
        assert_eq!(session.state, SessionState::DispatchFailed);
        assert!(session.last_error.unwrap().contains("queue full"));
        assert!(h
            .audit
            .events_for(id)
            .contains(&events::ASSESSMENT_TRIGGER_FAILED.to_string()));
    }

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_drains_queue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .expect(2)
        .mount(&server)
        .await;
    let mut config = fast_config(format!("{}/assess", server.uri()));
    config.workers = 1;
    let h = harness(config).await;

    let mut ids = Vec::new();
    for i in 0..2 {
        let session = h
            .service
            .open_session(&format!("user{i}@b.com"), "goal")
            .await
            .unwrap();
        upload(&h.root, &session.id, "firewall.txt");
        h.service.dispatch(&session.id).await.unwrap();
        ids.push(session.id);
    }

    h.service.shutdown().await;
    for id in &ids {
        assert_eq!(
            h.service.session(id).unwrap().state,
            SessionState::Dispatched
        );
    }
}

// --- Messages ---

#[tokio::test]
async fn test_messages_drive_dispatch() {
    let server = ok_downstream(1).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    let session = h.service.open_session("a@b.com", "goal").await.unwrap();
    upload(&h.root, &session.id, "scale_plan.xlsx");

    assert_eq!(
        h.service.submit_message(&session.id, "Yes").await.unwrap(),
        TriggerOutcome::WaitingForMoreInput
    );
    assert_eq!(
        h.service.submit_message(&session.id, "what now?").await.unwrap(),
        TriggerOutcome::WaitingForMoreInput
    );
    assert_eq!(
        h.service.session(&session.id).unwrap().state,
        SessionState::Created
    );

    assert_eq!(
        h.service
            .submit_message(&session.id, "  Upload done! ")
            .await
            .unwrap(),
        TriggerOutcome::Triggered
    );
    wait_for_state(&h.service, &session.id, SessionState::Dispatched).await;

    let err = h
        .service
        .submit_message("Temp_unknown", "upload done")
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::NotFound(_)));
}

#[tokio::test]
async fn test_evict_idle_keeps_recent_sessions() {
    let server = ok_downstream(0).await;
    let h = harness(fast_config(format!("{}/assess", server.uri()))).await;
    h.service.open_session("a@b.com", "goal").await.unwrap();

    assert_eq!(h.service.evict_idle(Duration::from_secs(3600)), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.service.evict_idle(Duration::from_millis(1)), 1);
    assert_eq!(h.service.session_count(), 0);
}

// --- Audit ---

#[tokio::test]
async fn test_slow_audit_collector_does_not_delay_callers() {
    let collector = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&collector)
        .await;
    let server = ok_downstream(1).await;
    let config = fast_config(format!("{}/assess", server.uri()));

    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("sessions");
    let storage = LocalFolderGateway::new(StorageConfig {
        root: root.clone(),
        ..StorageConfig::default()
    })
    .await
    .unwrap();
    let audit = WebhookAuditSink::new(collector.uri(), Duration::from_secs(10)).unwrap();
    let deliverer =
        WebhookDeliverer::new(config.downstream_url.clone(), config.request_timeout()).unwrap();
    let service = IntakeService::new(
        ServiceDeps {
            store: Arc::new(InMemorySessionStore::new()),
            storage: Arc::new(storage),
            audit: Arc::new(audit),
            deliverer: Arc::new(deliverer),
        },
        &config,
        CommandGrammar::default(),
        Duration::from_secs(5),
    );

    let started = Instant::now();
    let session = service.open_session("a@b.com", "goal").await.unwrap();
    upload(&root, &session.id, "vuln_scan.pdf");
    service.list_files(&session.id, "a@b.com").await.unwrap();
    assert_eq!(
        service.dispatch(&session.id).await.unwrap(),
        TriggerOutcome::Triggered
    );
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "callers waited {:?} on the audit collector",
        started.elapsed()
    );

    wait_for_state(&service, &session.id, SessionState::Dispatched).await;
}
