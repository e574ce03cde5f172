//! Router-level tests for the HTTP API.
//!
//! Each test builds a fresh router over an in-memory database with a stub
//! analyzer and a mailer that hands reset links back to the test.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use trustai_api::analyzer::{AnalyzerError, TextAnalyzer};
use trustai_api::mailer::Mailer;
use trustai_api::{
    ApiConfig, AppState, AppStateInner, SECURITY_HEADERS, ai, cleanup, messages, router,
};
use trustai_db::Database;
use trustai_types::api::Analysis;

const PASSWORD: &str = "Password1";

struct FixedAnalyzer(f64);

#[async_trait]
impl TextAnalyzer for FixedAnalyzer {
    async fn analyze(&self, _text: &str) -> Result<Analysis, AnalyzerError> {
        Ok(Analysis {
            score: self.0,
            verdict: "neutral".to_string(),
            citations: vec!["source".to_string()],
            analysis_markdown: "### Analysis".to_string(),
        })
    }
}

struct DownAnalyzer;

#[async_trait]
impl TextAnalyzer for DownAnalyzer {
    async fn analyze(&self, _text: &str) -> Result<Analysis, AnalyzerError> {
        Err(AnalyzerError::Status(503))
    }
}

struct ChannelMailer(mpsc::UnboundedSender<(String, String)>);

#[async_trait]
impl Mailer for ChannelMailer {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> anyhow::Result<()> {
        self.0.send((to.to_string(), reset_link.to_string()))?;
        Ok(())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    outbox: mpsc::UnboundedReceiver<(String, String)>,
}

fn spawn_app_with(analyzer: Arc<dyn TextAnalyzer>) -> TestApp {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let (tx, outbox) = mpsc::unbounded_channel();
    let config = ApiConfig {
        jwt_secret: "integration-test-secret".to_string(),
        access_token_ttl: Duration::minutes(30),
        guest_daily_limit: 3,
        guest_text_limit: 5000,
        frontend_url: "http://localhost:5174".to_string(),
    };
    let state = AppStateInner::new(db, config, analyzer, Arc::new(ChannelMailer(tx)));
    TestApp {
        router: router(state.clone()),
        state,
        outbox,
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(FixedAnalyzer(90.0)))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn guest_analyze_from(app: &Router, ip: [u8; 4], text: &str) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/ai/analyze-guest")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "text": text }).to_string()))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    send(app, request).await
}

async fn signup(app: &Router, email: &str) {
    let (status, body) = call(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": email, "password": PASSWORD, "name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

async fn signup_and_login(app: &Router, email: &str) -> String {
    signup(app, email).await;
    let (status, body) = login(app, email, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

async fn create_project(app: &Router, token: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/projects",
        Some(token),
        Some(json!({ "name": "Vendor claims" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn next_reset_token(app: &mut TestApp) -> (String, String) {
    let (to, link) = tokio::time::timeout(StdDuration::from_secs(5), app.outbox.recv())
        .await
        .unwrap()
        .unwrap();
    let token = link.split("token=").nth(1).unwrap().to_string();
    (to, token)
}

#[tokio::test]
async fn test_signup_login_and_me() {
    let app = spawn_app();

    let (status, user) = call(
        &app.router,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "  Ada@Example.COM ", "password": PASSWORD, "name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("password").is_none());

    let (status, body) = login(&app.router, "ADA@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["id"], user["id"]);

    let token = body["access_token"].as_str().unwrap();
    let (status, me) = call(&app.router, "GET", "/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    assert!(me["last_login"].is_string());
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = spawn_app();
    signup(&app.router, "ada@example.com").await;

    let (status, body) = call(
        &app.router,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "ADA@example.com", "password": PASSWORD, "name": "Other" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "error": "Email already registered" }));
}

#[tokio::test]
async fn test_weak_password_reports_first_failed_rule() {
    let app = spawn_app();
    let (status, body) = call(
        &app.router,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "ada@example.com", "password": "Password", "name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must contain at least one number");
}

#[tokio::test]
async fn test_bad_credentials_and_missing_token() {
    let app = spawn_app();
    signup(&app.router, "ada@example.com").await;

    let (status, body) = login(&app.router, "ada@example.com", "Wrongpass1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");

    let (status, body) = login(&app.router, "nobody@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");

    let (status, body) = call(&app.router, "GET", "/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "error": "Could not validate credentials" }));

    let (status, _) = call(&app.router, "GET", "/auth/me", Some("not.a.token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_is_throttled_per_client() {
    let app = spawn_app();
    for _ in 0..5 {
        let (status, _) = login(&app.router, "nobody@example.com", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = login(&app.router, "nobody@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["remaining_credits"], 0);
}

#[tokio::test]
async fn test_profile_update() {
    let app = spawn_app();
    let token = signup_and_login(&app.router, "ada@example.com").await;

    let (status, _) = call(&app.router, "PUT", "/auth/me", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, me) = call(
        &app.router,
        "PUT",
        "/auth/me",
        Some(&token),
        Some(json!({ "bio": "Fact checker" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["bio"], "Fact checker");
    assert_eq!(me["name"], "Ada");
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let mut app = spawn_app();
    signup(&app.router, "ada@example.com").await;

    let (missing_status, missing_body) = call(
        &app.router,
        "POST",
        "/auth/forgot-password",
        None,
        Some(json!({ "email": "nobody@example.com" })),
    )
    .await;
    let (known_status, known_body) = call(
        &app.router,
        "POST",
        "/auth/forgot-password",
        None,
        Some(json!({ "email": "Ada@Example.com" })),
    )
    .await;

    assert_eq!(missing_status, StatusCode::OK);
    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(missing_body, known_body);

    // Only the existing account gets mail.
    let (to, _) = next_reset_token(&mut app).await;
    assert_eq!(to, "ada@example.com");
    assert!(app.outbox.try_recv().is_err());
}

#[tokio::test]
async fn test_reset_password_is_single_use() {
    let mut app = spawn_app();
    let session = signup_and_login(&app.router, "ada@example.com").await;

    call(
        &app.router,
        "POST",
        "/auth/forgot-password",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    let (_, reset_token) = next_reset_token(&mut app).await;

    // A session token is not a reset token, and vice versa.
    let (status, body) = call(
        &app.router,
        "POST",
        "/auth/reset-password",
        None,
        Some(json!({ "token": session, "new_password": "Newpassword2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid token");

    let (status, _) = call(&app.router, "GET", "/auth/me", Some(&reset_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app.router,
        "POST",
        "/auth/reset-password",
        None,
        Some(json!({ "token": reset_token, "new_password": "weak" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 8 characters long");

    let (status, body) = call(
        &app.router,
        "POST",
        "/auth/reset-password",
        None,
        Some(json!({ "token": reset_token, "new_password": "Newpassword2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password has been reset successfully");

    let (status, _) = login(&app.router, "ada@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app.router, "ada@example.com", "Newpassword2").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app.router,
        "POST",
        "/auth/reset-password",
        None,
        Some(json!({ "token": reset_token, "new_password": "Another3pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Reset token has already been used");
}

#[tokio::test]
async fn test_guest_quota_admits_three_per_day() {
    let app = spawn_app();
    let client = [203, 0, 113, 7];

    for expected in [2, 1, 0] {
        let (status, body) = guest_analyze_from(&app.router, client, "Some claim").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["remaining_credits"], expected);
        assert_eq!(body["score"], 90.0);
    }

    let (status, body) = guest_analyze_from(&app.router, client, "Some claim").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Daily limit reached. Sign up for unlimited analyses!");
    assert_eq!(body["remaining_credits"], 0);
    assert!(body["reset_time"].is_string());

    let (status, body) = guest_analyze_from(&app.router, [203, 0, 113, 8], "Some claim").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining_credits"], 2);
}

#[tokio::test]
async fn test_guest_credits_peek_and_text_cap() {
    let app = spawn_app();

    let long_text = "x".repeat(5001);
    let (status, body) = call(
        &app.router,
        "POST",
        "/ai/analyze-guest",
        None,
        Some(json!({ "text": long_text })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Text exceeds 5000 character limit. Sign up for unlimited analysis!"
    );

    // Rejected input does not spend a credit, and peeking is free.
    for _ in 0..2 {
        let (status, body) = call(&app.router, "GET", "/ai/guest-credits", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "remaining_credits": 3, "daily_limit": 3 }));
    }

    call(
        &app.router,
        "POST",
        "/ai/analyze-guest",
        None,
        Some(json!({ "text": "short" })),
    )
    .await;
    let (_, body) = call(&app.router, "GET", "/ai/guest-credits", None, None).await;
    assert_eq!(body["remaining_credits"], 2);
}

#[tokio::test]
async fn test_analysis_updates_project_trust() {
    let app = spawn_app();
    let token = signup_and_login(&app.router, "ada@example.com").await;
    let project_id = create_project(&app.router, &token).await;

    let (status, body) = call(
        &app.router,
        "POST",
        "/ai/analyze",
        Some(&token),
        Some(json!({ "text": "The moon is made of rock.", "project_id": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 90.0);
    assert!(body.get("warning").is_none());

    let (_, project) =
        call(&app.router, "GET", &format!("/projects/{}", project_id), Some(&token), None).await;
    assert_eq!(project["trust_score"], 90.0);
    assert_eq!(project["status"], "Trustworthy");

    let (_, messages) = call(
        &app.router,
        "GET",
        &format!("/projects/{}/messages", project_id),
        Some(&token),
        None,
    )
    .await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "ai");
    assert_eq!(messages[0]["content"], "### Analysis");
}

#[tokio::test]
async fn test_scored_messages_drive_project_status() {
    let app = spawn_app();
    let token = signup_and_login(&app.router, "ada@example.com").await;
    let project_id = create_project(&app.router, &token).await;
    let uri = format!("/projects/{}/messages", project_id);

    let (status, body) = call(
        &app.router,
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "role": "user", "content": "question", "score": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only AI messages can carry a score");

    let (status, _) = call(
        &app.router,
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "role": "user", "content": "question" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for score in [90, 70, 40] {
        let (status, _) = call(
            &app.router,
            "POST",
            &uri,
            Some(&token),
            Some(json!({ "role": "ai", "content": "answer", "score": score })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, project) =
        call(&app.router, "GET", &format!("/projects/{}", project_id), Some(&token), None).await;
    assert_eq!(project["trust_score"], 66.7);
    assert_eq!(project["status"], "Neutral");

    let (_, messages) = call(&app.router, "GET", &uri, Some(&token), None).await;
    let roles: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["user", "ai", "ai", "ai"]);
}

#[tokio::test]
async fn test_projects_are_owner_scoped() {
    let app = spawn_app();
    let owner = signup_and_login(&app.router, "ada@example.com").await;
    let intruder = signup_and_login(&app.router, "eve@example.com").await;
    let project_id = create_project(&app.router, &owner).await;
    let uri = format!("/projects/{}", project_id);

    let (status, body) = call(&app.router, "GET", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Project not found");

    let (status, _) = call(
        &app.router,
        "POST",
        "/ai/analyze",
        Some(&intruder),
        Some(json!({ "text": "claim", "project_id": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = call(&app.router, "GET", "/projects", Some(&intruder), None).await;
    assert_eq!(listed, json!([]));

    let (status, _) = call(&app.router, "DELETE", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, project) = call(
        &app.router,
        "PUT",
        &uri,
        Some(&owner),
        Some(json!({ "priority": "High", "tags": ["finance"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["priority"], "High");
    assert_eq!(project["tags"], json!(["finance"]));
    assert_eq!(project["category"], "General");

    let (status, _) = call(&app.router, "DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app.router, "GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway() {
    let app = spawn_app_with(Arc::new(DownAnalyzer));
    let token = signup_and_login(&app.router, "ada@example.com").await;

    let (status, body) = call(
        &app.router,
        "POST",
        "/ai/analyze",
        Some(&token),
        Some(json!({ "text": "claim" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "success": false, "error": "AI analysis service is unavailable" }));
}

#[tokio::test]
async fn test_cleanup_sweep_drops_idle_guests() {
    let app = spawn_app();
    guest_analyze_from(&app.router, [198, 51, 100, 1], "claim").await;
    assert_eq!(app.state.guest_quota.tracked_identities(), 1);

    let report = cleanup::sweep_at(&app.state, Utc::now()).unwrap();
    assert_eq!(report.idle_guests, 0);

    let report = cleanup::sweep_at(&app.state, Utc::now() + Duration::hours(25)).unwrap();
    assert_eq!(report.idle_guests, 1);
    assert_eq!(app.state.guest_quota.tracked_identities(), 0);
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

fn install_trigger(app: &TestApp, sql: &str) {
    app.state
        .db
        .with_conn(|conn| Ok(conn.execute_batch(sql)?))
        .unwrap();
}

#[tokio::test]
async fn test_every_response_carries_security_headers() {
    let app = spawn_app();
    for uri in ["/health", "/nope"] {
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        for (name, value) in SECURITY_HEADERS {
            assert_eq!(response.headers()[*name], *value, "{} on {}", name, uri);
        }
    }
}

#[tokio::test]
async fn test_unroutable_requests_use_the_error_envelope() {
    let app = spawn_app();
    let token = signup_and_login(&app.router, "ada@example.com").await;

    for uri in ["/projects/not-a-uuid", "/projects/not-a-uuid/messages"] {
        let (status, body) = call(&app.router, "GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, json!({ "success": false, "error": "Project not found" }));
    }

    let (status, body) = call(&app.router, "GET", "/analyses/42", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "error": "Analysis not found" }));

    let (status, body) = call(&app.router, "GET", "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "error": "Not Found" }));

    let (status, body) = call(&app.router, "DELETE", "/health", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "success": false, "error": "Method Not Allowed" }));
}

#[tokio::test]
async fn test_failed_aggregation_keeps_message_and_warns() {
    let app = spawn_app();
    let token = signup_and_login(&app.router, "ada@example.com").await;
    let project_id = create_project(&app.router, &token).await;
    let project_uri = format!("/projects/{}", project_id);
    let (_, before) = call(&app.router, "GET", &project_uri, Some(&token), None).await;

    install_trigger(
        &app,
        "CREATE TRIGGER freeze_score BEFORE UPDATE OF trust_score ON projects
         BEGIN SELECT RAISE(ABORT, 'score frozen'); END;",
    );

    let uri = format!("/projects/{}/messages", project_id);
    let (status, body) = call(
        &app.router,
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "role": "ai", "content": "answer", "score": 80 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["warning"], messages::SCORE_WARNING);
    assert_eq!(body["score"], 80.0);

    let (_, listed) = call(&app.router, "GET", &uri, Some(&token), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app.router,
        "POST",
        "/ai/analyze",
        Some(&token),
        Some(json!({ "text": "claim", "project_id": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 90.0);
    assert_eq!(body["warning"], messages::SCORE_WARNING);

    let (_, after) = call(&app.router, "GET", &project_uri, Some(&token), None).await;
    assert_eq!(after["trust_score"], before["trust_score"]);
    assert_eq!(after["last_updated"], before["last_updated"]);
}

#[tokio::test]
async fn test_unsaved_analysis_is_still_returned() {
    let app = spawn_app();
    let token = signup_and_login(&app.router, "ada@example.com").await;
    let project_id = create_project(&app.router, &token).await;

    install_trigger(
        &app,
        "CREATE TRIGGER refuse_messages BEFORE INSERT ON messages
         BEGIN SELECT RAISE(ABORT, 'read only'); END;",
    );

    let (status, body) = call(
        &app.router,
        "POST",
        "/ai/analyze",
        Some(&token),
        Some(json!({ "text": "claim", "project_id": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 90.0);
    assert_eq!(body["verdict"], "neutral");
    assert_eq!(body["warning"], ai::SAVE_WARNING);
}

#[tokio::test]
async fn test_project_notes() {
    let app = spawn_app();
    let owner = signup_and_login(&app.router, "ada@example.com").await;
    let intruder = signup_and_login(&app.router, "eve@example.com").await;
    let project_id = create_project(&app.router, &owner).await;
    let notes_uri = format!("/projects/{}/notes", project_id);

    let (status, body) =
        call(&app.router, "POST", &notes_uri, Some(&owner), Some(json!({ "content": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Content required");

    let note_body = Some(json!({ "content": "Check the press release" }));
    let (status, _) =
        call(&app.router, "POST", &notes_uri, Some(&intruder), note_body.clone()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, note) = call(&app.router, "POST", &notes_uri, Some(&owner), note_body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["content"], "Check the press release");
    assert_eq!(note["tags"], json!([]));

    let project_uri = format!("/projects/{}", project_id);
    let (_, project) = call(&app.router, "GET", &project_uri, Some(&owner), None).await;
    assert_eq!(project["notes"].as_array().unwrap().len(), 1);
    assert_eq!(project["notes"][0]["id"], note["id"]);

    let note_uri = format!("{}/{}", notes_uri, note["id"].as_str().unwrap());
    let (status, _) = call(&app.router, "DELETE", &note_uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app.router, "DELETE", &note_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app.router, "DELETE", &note_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, project) = call(&app.router, "GET", &project_uri, Some(&owner), None).await;
    assert_eq!(project["notes"], json!([]));
}

#[tokio::test]
async fn test_analysis_history() {
    let app = spawn_app();
    let owner = signup_and_login(&app.router, "ada@example.com").await;
    let intruder = signup_and_login(&app.router, "eve@example.com").await;
    let project_id = create_project(&app.router, &owner).await;

    let entry = |score: f64| {
        json!({
            "project_id": project_id,
            "input_text": "claim",
            "trust_score": score,
            "verdict": "Neutral",
            "analysis_markdown": "### Report",
        })
    };

    let (status, body) =
        call(&app.router, "POST", "/analyses", Some(&owner), Some(entry(101.0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Trust score must be between 0 and 100");

    let (status, _) =
        call(&app.router, "POST", "/analyses", Some(&intruder), Some(entry(40.0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, first) =
        call(&app.router, "POST", "/analyses", Some(&owner), Some(entry(40.0))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["ai_model"], "llama3-70b");
    assert_eq!(first["input_type"], "text");
    tokio::time::sleep(StdDuration::from_millis(5)).await;
    let (_, second) = call(&app.router, "POST", "/analyses", Some(&owner), Some(entry(75.0))).await;

    let first_uri = format!("/analyses/{}", first["id"].as_str().unwrap());
    let (status, fetched) = call(&app.router, "GET", &first_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["trust_score"], 40.0);
    let (status, body) = call(&app.router, "GET", &first_uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Analysis not found");

    let history_uri = format!("/analyses/project/{}", project_id);
    let (status, history) = call(&app.router, "GET", &history_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&Value> = history.as_array().unwrap().iter().map(|a| &a["id"]).collect();
    assert_eq!(ids, vec![&second["id"], &first["id"]]);

    let (status, _) = call(&app.router, "GET", &history_uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, project) =
        call(&app.router, "GET", &format!("/projects/{}", project_id), Some(&owner), None).await;
    assert_eq!(project["trust_score"], 0.0);
}

