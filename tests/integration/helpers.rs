//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use gate_api::AppState;
use gate_auth::TokenSealer;
use gate_core::config::AppConfig;
use gate_database::{MemorySessionStore, SessionStore};
use gate_realtime::GateHub;

/// Test application context backed by the in-memory session store.
pub struct TestApp {
    /// The Axum router for making test requests.
    pub router: Router,
    /// Direct access to the session store.
    pub store: Arc<MemorySessionStore>,
    /// The realtime hub, for wiring fake connections into tests.
    pub hub: Arc<GateHub>,
    /// Application config.
    pub config: Arc<AppConfig>,
}

impl TestApp {
    /// Create a test application with the given gate capacity.
    pub fn new(capacity: u32) -> Self {
        let mut config = AppConfig::default();
        config.gate.capacity = capacity;
        config.gate.ip_salt = "test-salt".to_string();
        Self::with_config(config)
    }

    /// Create a test application from a fully specified config.
    pub fn with_config(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(MemorySessionStore::new());
        let sealer = Arc::new(
            TokenSealer::new(
                &config.gate.seal_secret,
                config.gate.token_ttl_ms as i64,
            )
            .expect("Failed to build sealer"),
        );
        let hub = Arc::new(GateHub::new(config.realtime.clone()));

        let state = AppState::new(
            Arc::clone(&config),
            store.clone() as Arc<dyn SessionStore>,
            sealer,
            Arc::clone(&hub),
        );
        let router = gate_api::build_router(state);

        Self {
            router,
            store,
            hub,
            config,
        }
    }

    /// Make an HTTP request to the test app.
    ///
    /// `cookie` is sent verbatim as the `Cookie` header; `ip` is sent
    /// as `x-forwarded-for` so tests can simulate distinct clients.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        cookie: Option<&str>,
        ip: &str,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();
        self.request_raw(method, path, &body_str, cookie, ip).await
    }

    /// Make an HTTP request with a verbatim body, bypassing JSON
    /// serialization so tests can send malformed payloads.
    pub async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body_str: &str,
        cookie: Option<&str>,
        ip: &str,
    ) -> TestResponse {
        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .header("x-forwarded-for", ip);

        if let Some(cookie) = cookie {
            req = req.header("Cookie", cookie);
        }

        let req = req
            .body(Body::from(body_str.to_string()))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Check a visitor in and return the response.
    pub async fn checkin(&self, name: &str, ip: &str) -> TestResponse {
        self.request(
            "POST",
            "/api/gate/checkin",
            Some(serde_json::json!({ "display_name": name })),
            None,
            ip,
        )
        .await
    }
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Parsed JSON body.
    pub body: Value,
}

impl TestResponse {
    /// The `gate_pass` cookie pair from `Set-Cookie`, ready to send
    /// back in a `Cookie` header.
    pub fn gate_cookie(&self) -> Option<String> {
        self.headers
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("gate_pass="))
            .map(|v| v.split(';').next().unwrap_or(v).to_string())
    }

    /// The machine-readable error code from the body.
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("code").and_then(|v| v.as_str())
    }
}
