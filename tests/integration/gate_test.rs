//! End-to-end tests for the gate admission flow.

use chrono::{Duration, Utc};
use gate_database::SessionStore;
use gate_entity::NewGateSession;
use gate_realtime::{ClientMessage, ServerMessage};
use http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_checkin_admits_until_capacity_then_queues() {
    let app = TestApp::new(2);

    let v1 = app.checkin("Visitor One", "203.0.113.1").await;
    assert_eq!(v1.status, StatusCode::OK);
    assert_eq!(v1.body["status"], "ACTIVE");
    assert!(v1.gate_cookie().is_some());

    let v2 = app.checkin("Visitor Two", "203.0.113.2").await;
    assert_eq!(v2.body["status"], "ACTIVE");

    let v3 = app.checkin("Visitor Three", "203.0.113.3").await;
    assert_eq!(v3.body["status"], "QUEUED");
    assert_eq!(v3.body["queue_position"], 1);
    assert_eq!(v3.body["active_count"], 2);
    assert_eq!(v3.body["queue_length"], 1);
}

#[tokio::test]
async fn test_exit_frees_slot_and_promotes_next_in_queue() {
    let app = TestApp::new(2);

    let v1 = app.checkin("Visitor One", "203.0.113.1").await;
    app.checkin("Visitor Two", "203.0.113.2").await;
    let v3 = app.checkin("Visitor Three", "203.0.113.3").await;
    assert_eq!(v3.body["status"], "QUEUED");

    // V3 sees their queued state.
    let status = app
        .request(
            "GET",
            "/api/gate/status",
            None,
            v3.gate_cookie().as_deref(),
            "203.0.113.3",
        )
        .await;
    assert_eq!(status.body["your_status"], "QUEUED");
    assert_eq!(status.body["queue_position"], 1);

    // V1 leaves; the freed slot goes to V3.
    let exit = app
        .request(
            "POST",
            "/api/gate/exit",
            None,
            v1.gate_cookie().as_deref(),
            "203.0.113.1",
        )
        .await;
    assert_eq!(exit.status, StatusCode::OK);
    assert_eq!(exit.body["status"], "EXITED");

    let beat = app
        .request(
            "POST",
            "/api/gate/heartbeat",
            None,
            v3.gate_cookie().as_deref(),
            "203.0.113.3",
        )
        .await;
    assert_eq!(beat.status, StatusCode::OK);
    assert_eq!(beat.body["status"], "ACTIVE");
    assert!(beat.body.get("queue_position").is_none());

    // Anonymous status reflects the new occupancy.
    let anon = app
        .request("GET", "/api/gate/status", None, None, "203.0.113.9")
        .await;
    assert_eq!(anon.body["active_count"], 2);
    assert_eq!(anon.body["queue_length"], 0);
    assert!(anon.body.get("your_status").is_none());
}

#[tokio::test]
async fn test_checkin_rejects_invalid_body() {
    let app = TestApp::new(2);

    let response = app
        .request(
            "POST",
            "/api/gate/checkin",
            Some(serde_json::json!({ "display_name": "" })),
            None,
            "203.0.113.1",
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), Some("validation_error"));
}

#[tokio::test]
async fn test_honeypot_gets_fake_success_and_no_session() {
    let app = TestApp::new(2);

    let response = app
        .request(
            "POST",
            "/api/gate/checkin",
            Some(serde_json::json!({
                "display_name": "Totally Human",
                "website": "https://spam.example",
            })),
            None,
            "203.0.113.1",
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ACTIVE");
    assert_eq!(response.body["pass_token"], "");
    assert!(response.gate_cookie().is_none());

    // No session was actually created.
    let now = chrono::Utc::now();
    assert_eq!(app.store.count_active(now - chrono::Duration::hours(1)).await.unwrap(), 0);
    assert_eq!(app.store.count_queued().await.unwrap(), 0);
}

#[tokio::test]
async fn test_checkin_is_rate_limited_per_client() {
    let app = TestApp::new(100);

    for i in 0..5 {
        let response = app.checkin(&format!("Visitor {i}"), "203.0.113.50").await;
        assert_eq!(response.status, StatusCode::OK, "attempt {i} should pass");
    }

    let blocked = app.checkin("One Too Many", "203.0.113.50").await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(blocked.error_code(), Some("rate_limited"));
    assert!(blocked.headers.contains_key(http::header::RETRY_AFTER));

    // A different client is unaffected.
    let other = app.checkin("Someone Else", "203.0.113.51").await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn test_heartbeat_requires_credential() {
    let app = TestApp::new(2);

    let missing = app
        .request("POST", "/api/gate/heartbeat", None, None, "203.0.113.1")
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.error_code(), Some("token_missing"));

    let garbage = app
        .request(
            "POST",
            "/api/gate/heartbeat",
            None,
            Some("gate_pass=not-a-real-token"),
            "203.0.113.1",
        )
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.error_code(), Some("token_invalid"));
}

#[tokio::test]
async fn test_credential_is_bound_to_client_ip() {
    let app = TestApp::new(2);

    let v1 = app.checkin("Visitor One", "203.0.113.1").await;
    let cookie = v1.gate_cookie();

    // Same credential from a different address is rejected.
    let stolen = app
        .request(
            "POST",
            "/api/gate/heartbeat",
            None,
            cookie.as_deref(),
            "198.51.100.99",
        )
        .await;
    assert_eq!(stolen.status, StatusCode::UNAUTHORIZED);
    assert_eq!(stolen.error_code(), Some("token_invalid"));

    // From the original address it still works.
    let legit = app
        .request(
            "POST",
            "/api/gate/heartbeat",
            None,
            cookie.as_deref(),
            "203.0.113.1",
        )
        .await;
    assert_eq!(legit.status, StatusCode::OK);
}

#[tokio::test]
async fn test_heartbeat_after_exit_returns_gone() {
    let app = TestApp::new(2);

    let v1 = app.checkin("Visitor One", "203.0.113.1").await;
    let cookie = v1.gate_cookie();

    app.request(
        "POST",
        "/api/gate/exit",
        None,
        cookie.as_deref(),
        "203.0.113.1",
    )
    .await;

    let beat = app
        .request(
            "POST",
            "/api/gate/heartbeat",
            None,
            cookie.as_deref(),
            "203.0.113.1",
        )
        .await;
    assert_eq!(beat.status, StatusCode::GONE);
    assert_eq!(beat.error_code(), Some("session_expired"));
}

#[tokio::test]
async fn test_status_with_valid_credential_includes_session_fields() {
    let app = TestApp::new(2);

    let v1 = app.checkin("Visitor One", "203.0.113.1").await;
    let status = app
        .request(
            "GET",
            "/api/gate/status",
            None,
            v1.gate_cookie().as_deref(),
            "203.0.113.1",
        )
        .await;

    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["your_status"], "ACTIVE");
    assert_eq!(status.body["is_admin"], false);
    assert_eq!(status.body["capacity"], 2);
}

#[tokio::test]
async fn test_status_with_invalid_credential_degrades_to_anonymous() {
    let app = TestApp::new(2);
    app.checkin("Visitor One", "203.0.113.1").await;

    let status = app
        .request(
            "GET",
            "/api/gate/status",
            None,
            Some("gate_pass=bogus"),
            "203.0.113.2",
        )
        .await;

    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["active_count"], 1);
    assert!(status.body.get("your_status").is_none());
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(2);

    let response = app
        .request("GET", "/api/health", None, None, "203.0.113.1")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_malformed_json_body_returns_validation_error() {
    let app = TestApp::new(2);

    let response = app
        .request_raw(
            "POST",
            "/api/gate/checkin",
            r#"{"display_name": "#,
            None,
            "203.0.113.1",
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), Some("validation_error"));
    assert!(response.body["details"]["body"].is_string());
}

#[tokio::test]
async fn test_status_broadcasts_occupancy_when_promotion_changes_state() {
    let app = TestApp::new(1);
    let now = Utc::now();

    // A stale active occupying the only slot, and someone waiting.
    app.store
        .create(NewGateSession::active(
            "Stale".into(),
            None,
            None,
            "h-stale".into(),
            "iphash".into(),
            now - Duration::minutes(10),
        ))
        .await
        .unwrap();
    app.store
        .create(NewGateSession::queued(
            "Waiting".into(),
            None,
            None,
            "h-waiting".into(),
            "iphash".into(),
            now,
        ))
        .await
        .unwrap();

    let (handle, mut rx) = app.hub.register();
    app.hub
        .handle_inbound(
            &handle,
            ClientMessage::Subscribe {
                topics: vec!["occupancy".into()],
            },
        )
        .await;
    let accept = rx.recv().await.unwrap();
    assert!(matches!(accept.data, ServerMessage::Accept { .. }));

    // An anonymous status poll runs a promotion pass; the stale session
    // expires, the waiting one takes its slot, and subscribers hear the
    // new occupancy.
    let status = app
        .request("GET", "/api/gate/status", None, None, "203.0.113.9")
        .await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["active_count"], 1);
    assert_eq!(status.body["queue_length"], 0);

    let frame = rx.try_recv().expect("Expected an occupancy broadcast");
    match frame.data {
        ServerMessage::Occupancy {
            active_count,
            queue_length,
            ..
        } => {
            assert_eq!(active_count, 1);
            assert_eq!(queue_length, 0);
        }
        other => panic!("Expected occupancy frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_heartbeat_stays_silent_when_nothing_changed() {
    let app = TestApp::new(2);

    let checkin = app.checkin("Visitor One", "203.0.113.1").await;
    assert_eq!(checkin.body["status"], "ACTIVE");

    let (handle, mut rx) = app.hub.register();
    app.hub
        .handle_inbound(
            &handle,
            ClientMessage::Subscribe {
                topics: vec!["occupancy".into()],
            },
        )
        .await;
    let accept = rx.recv().await.unwrap();
    assert!(matches!(accept.data, ServerMessage::Accept { .. }));

    let heartbeat = app
        .request(
            "POST",
            "/api/gate/heartbeat",
            None,
            checkin.gate_cookie().as_deref(),
            "203.0.113.1",
        )
        .await;
    assert_eq!(heartbeat.status, StatusCode::OK);

    // No session expired and nothing was promoted, so no broadcast.
    assert!(rx.try_recv().is_err());
}
