//! End-to-end tests for the HTTP API.
//!
//! Each test starts the router on an ephemeral port backed by a `MemoryStore`
//! and stands in for the tenant's CRM webhook with an `httpmock` server.
//!
//! Run with:
//!   cargo test -p voxlead-intake --test api

use std::sync::Arc;

use httpmock::prelude::*;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use voxlead::auth::{unix_now, Hs256Key, SessionClaims, VoiceTokenIssuer};
use voxlead::config::SecretString;
use voxlead::store::{NewTenant, Tenant};
use voxlead::{router, AppState, Config, DeliveryStatus, MemoryStore, Store};

const VOICE_SECRET: &str = "test-voice-secret";
const AUTH_SECRET: &str = "test-auth-secret";

// ── Helpers ───────────────────────────────────────────────────────────────────

struct TestApp {
    base_url: String,
    store: MemoryStore,
    client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn seed_tenant(&self, owner: &str, slug: &str, webhook_url: &str, tag: Option<&str>) -> Tenant {
        self.store
            .create_tenant(NewTenant {
                owner_user_id: owner.to_string(),
                slug: slug.to_string(),
                webhook_url: webhook_url.to_string(),
                default_tag: tag.map(str::to_string),
            })
            .await
            .expect("seed tenant")
    }

    async fn post_intake(&self, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/intake"))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("intake request failed")
    }

    async fn post_as_owner(&self, owner: &str, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(owner_session(owner))
            .json(body)
            .send()
            .await
            .expect("owner request failed")
    }
}

fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "VOICE_TOKEN_SECRET" => Some(VOICE_SECRET.to_string()),
        "AUTH_JWT_SECRET" => Some(AUTH_SECRET.to_string()),
        "WEBHOOK_TIMEOUT_MS" => Some("2000".to_string()),
        _ => None,
    })
    .expect("test config")
}

async fn spawn_app() -> TestApp {
    let store = MemoryStore::new();
    let state = AppState::new(test_config(), Arc::new(store.clone())).expect("app state");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router(state))
            .await
            .expect("server error");
    });

    TestApp {
        base_url: format!("http://{addr}"),
        store,
        client: reqwest::Client::new(),
    }
}

fn owner_session(user_id: &str) -> String {
    Hs256Key::new(AUTH_SECRET)
        .sign(&SessionClaims {
            sub: user_id.to_string(),
            exp: unix_now() + 3600,
            email: None,
        })
        .unwrap()
}

fn voice_token(slug: &str, issued_at: u64) -> String {
    VoiceTokenIssuer::new(&SecretString::new(VOICE_SECRET))
        .issue(slug, issued_at)
        .unwrap()
}

fn intake_body(slug: &str) -> Value {
    json!({
        "full_name": "  Mary Jane Watson ",
        "email": "mj@example.com",
        "phone": "(555) 123-4567",
        "business_name": "Daily Bugle",
        "fun_fact": "Loves photography",
        "duration_sec": 95,
        "slug": slug,
    })
}

fn expected_webhook_body(tag: Option<&str>) -> Value {
    let mut body = json!({
        "first_name": "Mary",
        "last_name": "Jane Watson",
        "email": "mj@example.com",
        "phone": "+15551234567",
        "business_name": "Daily Bugle",
        "fun_fact": "Loves photography",
    });
    if let Some(tag) = tag {
        body["tag"] = json!(tag);
    }
    body
}

// ── Health ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = spawn_app().await;
    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

// ── Voice token ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn token_issued_for_owned_slug() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "https://crm.example.com/hook", None).await;

    let resp = app.post_as_owner("owner-1", "/token", &json!({"slug": "acme"})).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    let token = body["token"].as_str().unwrap();

    let claims = VoiceTokenIssuer::new(&SecretString::new(VOICE_SECRET))
        .verify(token, unix_now())
        .unwrap();
    assert_eq!(claims.slug, "acme");
    assert_eq!(claims.expires_at - claims.issued_at, 600);
}

#[tokio::test]
async fn token_requires_session() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "https://crm.example.com/hook", None).await;

    let resp = app
        .client
        .post(app.url("/token"))
        .json(&json!({"slug": "acme"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let forged = Hs256Key::new("wrong-secret")
        .sign(&SessionClaims {
            sub: "owner-1".to_string(),
            exp: unix_now() + 3600,
            email: None,
        })
        .unwrap();
    let resp = app
        .client
        .post(app.url("/token"))
        .bearer_auth(forged)
        .json(&json!({"slug": "acme"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_slug_owned_by_someone_else_is_not_found() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "https://crm.example.com/hook", None).await;

    let resp = app.post_as_owner("owner-2", "/token", &json!({"slug": "acme"})).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn token_requires_slug() {
    let app = spawn_app().await;
    let resp = app.post_as_owner("owner-1", "/token", &json!({})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Slug is required");
}

// ── Intake ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn intake_forwards_normalized_contact_with_tag() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    let hook = crm
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .header("content-type", "application/json")
                .json_body(expected_webhook_body(Some("Event2025")));
            then.status(200);
        })
        .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), Some("Event2025")).await;

    let resp = app.post_intake(&voice_token("acme", unix_now()), &intake_body("acme")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": true}));
    hook.assert_async().await;

    let intakes = app.store.intakes().await;
    assert_eq!(intakes.len(), 1);
    assert_eq!(intakes[0].status, DeliveryStatus::Sent);
    assert_eq!(intakes[0].duration_sec, Some(95));
    assert_eq!(intakes[0].payload["phone"], "(555) 123-4567");
}

#[tokio::test]
async fn intake_accepts_fractional_and_negative_duration() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    let hook = crm
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .json_body(expected_webhook_body(None));
            then.status(200);
        })
        .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), None).await;

    for duration in [json!(95.4), json!(-1)] {
        let mut body = intake_body("acme");
        body["duration_sec"] = duration;
        let resp = app.post_intake(&voice_token("acme", unix_now()), &body).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({"success": true}));
    }

    hook.assert_hits_async(2).await;
    let intakes = app.store.intakes().await;
    let mut durations: Vec<_> = intakes.iter().map(|i| i.duration_sec).collect();
    durations.sort();
    assert_eq!(durations, vec![None, Some(95)]);
}

#[tokio::test]
async fn intake_logs_body_as_received() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    crm.mock_async(|when, then| {
        when.method(POST).path("/hook");
        then.status(200);
    })
    .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), None).await;

    let mut body = intake_body("acme");
    body["call_id"] = json!("conv_123");
    body["transcript"] = json!(["hi", "hello"]);
    let resp = app.post_intake(&voice_token("acme", unix_now()), &body).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let intakes = app.store.intakes().await;
    assert_eq!(intakes.len(), 1);
    assert_eq!(intakes[0].payload, body);
}

#[tokio::test]
async fn intake_omits_tag_when_tenant_has_none() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    let hook = crm
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .json_body(expected_webhook_body(None));
            then.status(201);
        })
        .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), None).await;

    let resp = app.post_intake(&voice_token("acme", unix_now()), &intake_body("acme")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    hook.assert_async().await;
}

#[tokio::test]
async fn intake_webhook_failure_is_recorded_not_raised() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    let hook = crm
        .mock_async(|when, then| {
            when.method(POST).path("/hook");
            then.status(500).body("upstream exploded");
        })
        .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), None).await;

    let resp = app.post_intake(&voice_token("acme", unix_now()), &intake_body("acme")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Failed to send to webhook: webhook responded with status 500"
    );
    hook.assert_async().await;

    let intakes = app.store.intakes().await;
    assert_eq!(intakes.len(), 1);
    assert_eq!(intakes[0].status, DeliveryStatus::Error);
}

#[tokio::test]
async fn intake_unreachable_webhook_is_recorded_as_error() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "http://127.0.0.1:1/hook", None).await;

    let resp = app.post_intake(&voice_token("acme", unix_now()), &intake_body("acme")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(app.store.intakes().await[0].status, DeliveryStatus::Error);
}

#[tokio::test]
async fn intake_log_failure_does_not_change_response() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    crm.mock_async(|when, then| {
        when.method(POST).path("/hook");
        then.status(200);
    })
    .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), None).await;
    app.store.fail_intake_writes(true);

    let resp = app.post_intake(&voice_token("acme", unix_now()), &intake_body("acme")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": true}));
    assert!(app.store.intakes().await.is_empty());
}

#[tokio::test]
async fn intake_rejects_slug_substitution() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    let hook = crm
        .mock_async(|when, then| {
            when.method(POST).path("/hook");
            then.status(200);
        })
        .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), None).await;
    app.seed_tenant("owner-2", "rival", &crm.url("/hook"), None).await;

    let resp = app.post_intake(&voice_token("acme", unix_now()), &intake_body("rival")).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Slug mismatch");
    assert_eq!(hook.hits_async().await, 0);
    assert!(app.store.intakes().await.is_empty());
}

#[tokio::test]
async fn intake_rejects_missing_fields() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "https://crm.example.com/hook", None).await;

    for field in ["full_name", "email", "phone", "slug"] {
        let mut body = intake_body("acme");
        body.as_object_mut().unwrap().remove(field);
        let resp = app.post_intake(&voice_token("acme", unix_now()), &body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "missing {field}");
    }
}

#[tokio::test]
async fn intake_rejects_bad_credentials() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "https://crm.example.com/hook", None).await;

    let resp = app
        .client
        .post(app.url("/intake"))
        .json(&intake_body("acme"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app.post_intake("not.a.token", &intake_body("acme")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or expired token");

    let forged = VoiceTokenIssuer::new(&SecretString::new("other-secret"))
        .issue("acme", unix_now())
        .unwrap();
    let resp = app.post_intake(&forged, &intake_body("acme")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn intake_rejects_expired_token() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "https://crm.example.com/hook", None).await;

    let expired = voice_token("acme", unix_now() - 601);
    let resp = app.post_intake(&expired, &intake_body("acme")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn intake_unknown_tenant_is_not_found() {
    let app = spawn_app().await;
    let resp = app.post_intake(&voice_token("ghost", unix_now()), &intake_body("ghost")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn intake_rejects_malformed_json() {
    let app = spawn_app().await;
    let resp = app
        .client
        .post(app.url("/intake"))
        .bearer_auth(voice_token("acme", unix_now()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Test send ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_delivers_synthetic_contact() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    let hook = crm
        .mock_async(|when, then| {
            when.method(POST).path("/hook").json_body(json!({
                "first_name": "Test",
                "last_name": "Contact",
                "email": "test@example.com",
                "phone": "+15551234567",
                "business_name": "Test Business",
                "fun_fact": "This is a test contact from your voice networking app",
                "tag": "Event2025-Test",
            }));
            then.status(200);
        })
        .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), Some("Event2025")).await;

    let resp = app.post_as_owner("owner-1", "/test-send", &json!({"slug": "acme"})).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": true}));
    hook.assert_async().await;

    let intakes = app.store.intakes().await;
    assert_eq!(intakes.len(), 1);
    assert_eq!(intakes[0].status, DeliveryStatus::Sent);
    assert_eq!(intakes[0].payload["full_name"], "Test Contact");
}

#[tokio::test]
async fn test_send_surfaces_webhook_rejection() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    crm.mock_async(|when, then| {
        when.method(POST).path("/hook");
        then.status(500);
    })
    .await;
    app.seed_tenant("owner-1", "acme", &crm.url("/hook"), None).await;

    let resp = app.post_as_owner("owner-1", "/test-send", &json!({"slug": "acme"})).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Webhook failed with status 500");
    assert!(app.store.intakes().await.is_empty());
}

#[tokio::test]
async fn test_send_surfaces_unreachable_webhook() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "http://127.0.0.1:1/hook", None).await;

    let resp = app.post_as_owner("owner-1", "/test-send", &json!({"slug": "acme"})).await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Failed to send test webhook");
}

#[tokio::test]
async fn test_send_requires_ownership() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "https://crm.example.com/hook", None).await;

    let resp = app.post_as_owner("owner-2", "/test-send", &json!({"slug": "acme"})).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .client
        .post(app.url("/test-send"))
        .json(&json!({"slug": "acme"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ── Tenants ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tenant_setup_and_dashboard() {
    let app = spawn_app().await;
    let crm = MockServer::start_async().await;
    crm.mock_async(|when, then| {
        when.method(POST).path("/hook");
        then.status(200);
    })
    .await;

    let resp = app
        .post_as_owner(
            "owner-1",
            "/tenants",
            &json!({"slug": "acme", "webhook_url": crm.url("/hook"), "default_tag": "Event2025"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tenant"]["slug"], "acme");
    assert_eq!(body["tenant"]["default_tag"], "Event2025");

    let resp = app.post_intake(&voice_token("acme", unix_now()), &intake_body("acme")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .client
        .get(app.url("/tenants/me"))
        .bearer_auth(owner_session("owner-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tenant"]["slug"], "acme");
    assert_eq!(body["intakes"].as_array().unwrap().len(), 1);
    assert_eq!(body["intakes"][0]["status"], "sent");
}

#[tokio::test]
async fn tenant_setup_rejects_taken_slug_and_bad_input() {
    let app = spawn_app().await;
    app.seed_tenant("owner-1", "acme", "https://crm.example.com/hook", None).await;

    let resp = app
        .post_as_owner(
            "owner-2",
            "/tenants",
            &json!({"slug": "acme", "webhook_url": "https://crm.example.com/other"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .post_as_owner(
            "owner-2",
            "/tenants",
            &json!({"slug": "Bad Slug", "webhook_url": "https://crm.example.com/other"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .post_as_owner(
            "owner-2",
            "/tenants",
            &json!({"slug": "rival", "webhook_url": "not a url"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
