// seatplan-gate/tests/login_api.rs
// 路由集成测试 (tower oneshot)

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use seatplan_gate::{
    AllowList, AppState, Config, GateError, MAX_BODY_BYTES, MagicCodeSender, StaticAllowList,
    TimeReference, router,
};
use serde_json::Value;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl MagicCodeSender for RecordingSender {
    async fn send_magic_code(&self, email: &str) -> Result<(), GateError> {
        self.sent.lock().unwrap().push(email.to_string());
        Ok(())
    }
}

struct FailingSender;

#[async_trait]
impl MagicCodeSender for FailingSender {
    async fn send_magic_code(&self, _email: &str) -> Result<(), GateError> {
        Err(GateError::Mailer("rate limited".into()))
    }
}

struct BrokenAllowList;

#[async_trait]
impl AllowList for BrokenAllowList {
    async fn is_allowed(&self, _email: &str) -> Result<bool, GateError> {
        Err(GateError::AllowList("connection refused".into()))
    }
}

struct SlowAllowList;

#[async_trait]
impl AllowList for SlowAllowList {
    async fn is_allowed(&self, _email: &str) -> Result<bool, GateError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(true)
    }
}

fn app_with(allow_list: Arc<dyn AllowList>, mailer: Arc<dyn MagicCodeSender>) -> axum::Router {
    router(
        Arc::new(AppState::new(allow_list, mailer)),
        &Config::default(),
    )
}

fn default_app() -> (axum::Router, Arc<RecordingSender>) {
    let sender = Arc::new(RecordingSender::default());
    let app = app_with(
        Arc::new(StaticAllowList::new(["gast@example.com"])),
        sender.clone(),
    );
    (app, sender)
}

async fn post_login(app: axum::Router, body: &str) -> (StatusCode, Option<Value>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, json)
}

#[tokio::test]
async fn test_allowed_email_gets_code() {
    let (app, sender) = default_app();
    let (status, body) = post_login(app, r#"{"email":"gast@example.com"}"#).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_none());
    assert_eq!(*sender.sent.lock().unwrap(), vec!["gast@example.com"]);
}

#[tokio::test]
async fn test_unknown_email_is_401() {
    let (app, sender) = default_app();
    let (status, body) = post_login(app, r#"{"email":"fremd@example.com"}"#).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "E-Mail-Adresse nicht zugelassen");
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_allow_list_is_case_sensitive() {
    let (app, _) = default_app();
    let (status, _) = post_login(app, r#"{"email":"Gast@example.com"}"#).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_email_is_400() {
    for body in [r#"{}"#, r#"{"email":""}"#, r#"{"email":null}"#, r#"{"email":42}"#] {
        let (app, _) = default_app();
        let (status, json) = post_login(app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(json.unwrap()["error"], "E-Mail-Adresse fehlt");
    }
}

#[tokio::test]
async fn test_unparsable_body_is_500() {
    let (app, sender) = default_app();
    let (status, json) = post_login(app, "email=gast@example.com").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json.unwrap()["error"], "Serverfehler");
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_null_body_is_500() {
    let (app, sender) = default_app();
    let (status, json) = post_login(app, "null").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json.unwrap()["error"], "Serverfehler");
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_body_is_json_500() {
    let (app, sender) = default_app();
    let body = format!(r#"{{"email":"{}@example.com"}}"#, "a".repeat(MAX_BODY_BYTES));
    let (status, json) = post_login(app, &body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json.unwrap()["error"], "Serverfehler");
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_lookup_times_out_with_json_500() {
    let sender = Arc::new(RecordingSender::default());
    let state = AppState::new(Arc::new(SlowAllowList), sender.clone())
        .with_login_timeout(Duration::from_secs(5));
    let app = router(Arc::new(state), &Config::default());

    let (status, json) = post_login(app, r#"{"email":"gast@example.com"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json.unwrap()["error"], "Serverfehler");
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_failures_are_500() {
    let app = app_with(Arc::new(BrokenAllowList), Arc::new(RecordingSender::default()));
    let (status, json) = post_login(app, r#"{"email":"gast@example.com"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json.unwrap()["error"], "Serverfehler");

    let app = app_with(
        Arc::new(StaticAllowList::new(["gast@example.com"])),
        Arc::new(FailingSender),
    );
    let (status, json) = post_login(app, r#"{"email":"gast@example.com"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json.unwrap()["error"], "Serverfehler");
}

#[tokio::test]
async fn test_state_from_allow_list_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "anna@example.com").unwrap();

    let config = Config {
        allow_list_file: Some(file.path().to_path_buf()),
        allowed_emails: vec!["max@example.com".into()],
        ..Config::default()
    };
    let state = AppState::from_config(&config).unwrap();
    assert!(state.allow_list.is_allowed("anna@example.com").await.unwrap());
    assert!(state.allow_list.is_allowed("max@example.com").await.unwrap());
    assert!(!state.allow_list.is_allowed("fremd@example.com").await.unwrap());
}

#[tokio::test]
async fn test_backend_config_requires_key() {
    let config = Config {
        backend_url: Some("http://localhost:54321".into()),
        ..Config::default()
    };
    assert!(matches!(
        AppState::from_config(&config),
        Err(GateError::Config(_))
    ));
}

#[tokio::test]
async fn test_time_endpoint() {
    let (app, _) = default_app();
    let response = app
        .oneshot(Request::builder().uri("/api/time").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let time: TimeReference = serde_json::from_slice(&bytes).unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(&time.atom).is_ok());
    assert!(time.micro < 1_000_000);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = default_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
}
