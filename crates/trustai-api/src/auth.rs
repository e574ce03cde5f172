use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use trustai_auth::{
    hash_password, validate_password_policy, verify_against_dummy, verify_password,
};
use trustai_db::models::{ResetOutcome, UserRow, format_timestamp};
use trustai_types::api::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageBody, ResetPasswordRequest,
    SignupRequest, TokenPurpose, UpdateProfileRequest,
};
use trustai_types::models::User;

use crate::error::{ApiError, ApiJson};
use crate::mailer::reset_link;
use crate::middleware::{ClientIp, CurrentUser};
use crate::quota::SlidingWindowQuota;
use crate::{AppState, run_blocking};

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists with this email, a password reset link has been sent.";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
    if valid {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid email address".to_string()))
    }
}

fn throttle(limiter: &SlidingWindowQuota, ip: &str) -> Result<(), ApiError> {
    let decision = limiter.check_and_consume(ip);
    if decision.allowed {
        return Ok(());
    }
    Err(ApiError::QuotaExceeded {
        message: "Too many attempts. Please try again later.".to_string(),
        reset_time: decision.reset_time,
    })
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    throttle(&state.signup_limiter, &ip)?;

    let email = normalize_email(&req.email);
    validate_email(&email)?;
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    validate_password_policy(&req.password)?;

    let now = Utc::now();
    let row = UserRow {
        id: Uuid::new_v4().to_string(),
        email,
        name,
        password: String::new(),
        role: "user".to_string(),
        bio: None,
        profile_image: None,
        last_login: Some(format_timestamp(now)),
        created_at: format_timestamp(now),
    };

    let db = state.clone();
    let password = req.password;
    let user = run_blocking(move || {
        let row = UserRow {
            password: hash_password(&password)?,
            ..row
        };
        if !db.db.create_user(&row)? {
            return Err(ApiError::Validation("Email already registered".to_string()));
        }
        Ok(row.to_model()?)
    })
    .await?;

    info!("New account {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    throttle(&state.login_limiter, &ip)?;

    let email = normalize_email(&req.email);
    let db = state.clone();
    let user = run_blocking(move || {
        let bad_credentials =
            || ApiError::Authentication("Incorrect email or password".to_string());

        let Some(row) = db.db.get_user_by_email(&email)? else {
            verify_against_dummy(&req.password);
            return Err(bad_credentials());
        };
        if !verify_password(&req.password, &row.password) {
            return Err(bad_credentials());
        }

        let now = format_timestamp(Utc::now());
        db.db.touch_last_login(&row.id, &now)?;
        Ok(UserRow {
            last_login: Some(now),
            ..row
        }
        .to_model()?)
    })
    .await?;

    let access_token = state.tokens.issue_session(&user.email)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user,
    }))
}

/// POST /auth/forgot-password
///
/// Answers identically whether or not the account exists. The reset token
/// is signed in both cases and delivery runs detached, so the response does
/// not wait on the mail collaborator.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    let email = normalize_email(&req.email);

    let db = state.clone();
    let lookup_email = email.clone();
    let exists =
        run_blocking(move || Ok(db.db.get_user_by_email(&lookup_email)?.is_some())).await?;

    let token = state.tokens.issue_reset(&email)?;

    if exists {
        let mailer = state.mailer.clone();
        let link = reset_link(&state.config.frontend_url, &token);
        tokio::spawn(async move {
            if let Err(e) = mailer.send_password_reset(&email, &link).await {
                warn!("Password reset email could not be sent: {:#}", e);
            }
        });
    }

    Ok(Json(MessageBody {
        message: FORGOT_PASSWORD_MESSAGE.to_string(),
    }))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    let claims = state.tokens.decode(&req.token, TokenPurpose::Reset)?;
    let nonce = claims
        .jti
        .ok_or_else(|| ApiError::TokenInvalid("Invalid token".to_string()))?;
    validate_password_policy(&req.new_password)?;

    let db = state.clone();
    let email = claims.sub;
    let expires_at = claims.exp;
    let password = req.new_password;
    let outcome = run_blocking(move || {
        let hash = hash_password(&password)?;
        Ok(db.db.reset_password(&email, &hash, &nonce, expires_at)?)
    })
    .await?;

    match outcome {
        ResetOutcome::Updated => Ok(Json(MessageBody {
            message: "Password has been reset successfully".to_string(),
        })),
        ResetOutcome::UnknownUser => Err(ApiError::NotFound("User not found".to_string())),
        ResetOutcome::AlreadyUsed => Err(ApiError::TokenInvalid(
            "Reset token has already been used".to_string(),
        )),
    }
}

/// GET /auth/me
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}

/// PUT /auth/me
pub async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    if req.name.is_none() && req.bio.is_none() && req.profile_image.is_none() {
        return Err(ApiError::Validation("No valid fields provided".to_string()));
    }
    if req.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::Validation("Name cannot be empty".to_string()));
    }

    let db = state.clone();
    let id = user.id.to_string();
    let updated = run_blocking(move || {
        let row = db
            .db
            .update_profile(
                &id,
                req.name.as_deref().map(str::trim),
                req.bio.as_deref(),
                req.profile_image.as_deref(),
            )?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        Ok(row.to_model()?)
    })
    .await?;

    Ok(Json(updated))
}
