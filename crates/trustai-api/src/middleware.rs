use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;

use trustai_types::api::TokenPurpose;
use trustai_types::models::User;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

/// Identity of the authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn credentials_error() -> ApiError {
    ApiError::Authentication("Could not validate credentials".to_string())
}

/// Turn a bearer token into the caller's identity.
///
/// The token must be a valid session token, and its subject must still
/// exist. Nothing is cached: every call goes back to the user table.
pub async fn resolve_identity(state: &AppState, token: &str) -> Result<CurrentUser, ApiError> {
    let claims = state.tokens.decode(token, TokenPurpose::Session).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        credentials_error()
    })?;

    let lookup = state.clone();
    let row = run_blocking(move || Ok(lookup.db.get_user_by_email(&claims.sub)?)).await?;
    let user = row.ok_or_else(credentials_error)?.to_model()?;

    Ok(CurrentUser(user))
}

/// Extract and validate the bearer token on every protected route.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(credentials_error)?;

    let user = resolve_identity(&state, bearer.token()).await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Client network address, used as the anonymous identity. Falls back to
/// `"unknown"` when the server was started without connect info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self(ip))
    }
}
