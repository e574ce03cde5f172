use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, MatchedPath, Path, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use trustai_auth::{PasswordError, TokenError};
use trustai_types::api::QuotaExceededBody;

/// Every failure a handler can return. Rendered as
/// `{"success": false, "error": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad credentials or an unresolvable bearer token.
    #[error("{0}")]
    Authentication(String),
    /// Bad signature, expired, wrong purpose, or already consumed.
    #[error("{0}")]
    TokenInvalid(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("{message}")]
    QuotaExceeded {
        message: String,
        reset_time: Option<DateTime<Utc>>,
    },
    /// The AI provider failed.
    #[error("AI provider error: {0}")]
    Downstream(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::TokenInvalid(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Downstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", e))
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => Self::TokenInvalid("Token has expired".to_string()),
            TokenError::Encoding(msg) => Self::Internal(msg),
            TokenError::Invalid | TokenError::PurposeMismatch { .. } => {
                Self::TokenInvalid("Invalid token".to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Hash(msg) => Self::Internal(msg),
            policy => Self::Validation(policy.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            Self::Downstream(msg) => {
                warn!("AI provider error: {}", msg);
                "AI analysis service is unavailable".to_string()
            }
            Self::Storage(msg) => {
                error!("Storage error: {}", msg);
                "A database error occurred".to_string()
            }
            Self::Internal(msg) => {
                error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            Self::QuotaExceeded {
                message,
                reset_time,
            } => {
                let body = QuotaExceededBody {
                    success: false,
                    error: message.clone(),
                    message: message.clone(),
                    remaining_credits: 0,
                    reset_time: *reset_time,
                };
                return (status, Json(body)).into_response();
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// `Json` extractor whose rejections use the error envelope.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `Path` extractor for resource ids. An id that does not parse cannot name
/// an existing resource, so it is reported as that resource's 404.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(PathRejection::FailedToDeserializePathParams(_)) => {
                let route = parts
                    .extensions
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or_default();
                Err(ApiError::NotFound(missing_resource(route).to_string()))
            }
            Err(other) => Err(ApiError::Internal(other.body_text())),
        }
    }
}

fn missing_resource(route: &str) -> &'static str {
    if route.contains("{analysis_id}") {
        "Analysis not found"
    } else {
        "Project not found"
    }
}
