pub mod aggregator;
pub mod ai;
pub mod analyses;
pub mod analyzer;
pub mod auth;
pub mod cleanup;
pub mod error;
pub mod mailer;
pub mod messages;
pub mod middleware;
pub mod projects;
pub mod quota;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue},
    routing::{delete, get, post},
};
use chrono::Duration;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::error;

use trustai_auth::TokenService;
use trustai_db::Database;

use crate::aggregator::ScoreAggregator;
use crate::analyzer::TextAnalyzer;
use crate::error::ApiError;
use crate::mailer::Mailer;
use crate::quota::SlidingWindowQuota;

pub type AppState = Arc<AppStateInner>;

/// Settings the HTTP layer needs. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub guest_daily_limit: u32,
    pub guest_text_limit: usize,
    pub frontend_url: String,
}

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub tokens: TokenService,
    pub guest_quota: SlidingWindowQuota,
    pub signup_limiter: SlidingWindowQuota,
    pub login_limiter: SlidingWindowQuota,
    pub aggregator: ScoreAggregator,
    pub analyzer: Arc<dyn TextAnalyzer>,
    pub mailer: Arc<dyn Mailer>,
    pub config: ApiConfig,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        config: ApiConfig,
        analyzer: Arc<dyn TextAnalyzer>,
        mailer: Arc<dyn Mailer>,
    ) -> AppState {
        Arc::new(Self {
            tokens: TokenService::new(config.jwt_secret.as_bytes(), config.access_token_ttl),
            guest_quota: SlidingWindowQuota::daily(config.guest_daily_limit),
            signup_limiter: SlidingWindowQuota::new(3, Duration::minutes(1)),
            login_limiter: SlidingWindowQuota::new(5, Duration::minutes(1)),
            aggregator: ScoreAggregator::new(db.clone()),
            db,
            analyzer,
            mailer,
            config,
        })
    }
}

/// Headers stamped on every response, replacing any a handler set.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

/// All routes with their state and security headers attached. Transport
/// layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/ai/analyze-guest", post(ai::analyze_guest))
        .route("/ai/guest-credits", get(ai::guest_credits))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me).put(auth::update_me))
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/{project_id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/projects/{project_id}/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route("/projects/{project_id}/notes", post(projects::add_note))
        .route(
            "/projects/{project_id}/notes/{note_id}",
            delete(projects::delete_note),
        )
        .route("/ai/analyze", post(ai::analyze))
        .route("/analyses", post(analyses::create_analysis))
        .route("/analyses/{analysis_id}", get(analyses::get_analysis))
        .route(
            "/analyses/project/{project_id}",
            get(analyses::list_project_analyses),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let mut app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(unknown_route)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state);

    for &(name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    app
}

async fn health() -> &'static str {
    "ok"
}

async fn unknown_route() -> ApiError {
    ApiError::NotFound("Not Found".to_string())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Run blocking work (SQLite, Argon2) off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal("background task failed".to_string())
    })?
}
