use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use trustai_db::models::{MessageRow, format_timestamp};
use trustai_types::api::{CreateMessageRequest, MessageCreatedResponse};
use trustai_types::models::{Message, MessageRole};

use crate::error::{ApiError, ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::projects::require_project;
use crate::{AppState, run_blocking};

pub const SCORE_WARNING: &str = "Message saved, but the project trust score could not be updated";

/// Scores are only meaningful on AI messages and must lie in [0, 100].
pub fn validate_score(role: MessageRole, score: Option<f64>) -> Result<(), ApiError> {
    let Some(score) = score else {
        return Ok(());
    };
    if role != MessageRole::Ai {
        return Err(ApiError::Validation(
            "Only AI messages can carry a score".to_string(),
        ));
    }
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(ApiError::Validation(
            "Score must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Persist a message and, when it is a scored AI message, refresh the
/// project's trust score. An aggregation failure is returned as a warning;
/// the message itself stays stored.
pub(crate) fn record_message(
    state: &AppState,
    row: MessageRow,
) -> Result<(Message, Option<String>), ApiError> {
    state.db.insert_message(&row)?;
    let message = row.to_model()?;

    let mut warning = None;
    if message.role == MessageRole::Ai && message.score.is_some() {
        if let Err(e) = state.aggregator.on_ai_message_recorded(message.project_id) {
            warn!("Trust score aggregation failed for project {}: {:#}", message.project_id, e);
            warning = Some(SCORE_WARNING.to_string());
        }
    }

    Ok((message, warning))
}

/// POST /projects/{project_id}/messages
pub async fn create_message(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("Message content is required".to_string()));
    }
    validate_score(req.role, req.score)?;

    let citations = serde_json::to_string(&req.citations)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let row = MessageRow {
        id: Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        user_id: user.id.to_string(),
        role: req.role.as_str().to_string(),
        content: req.content,
        score: req.score,
        citations,
        created_at: format_timestamp(Utc::now()),
    };

    let db = state.clone();
    let (message, warning) = run_blocking(move || {
        require_project(&db, project_id, user.id)?;
        record_message(&db, row)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageCreatedResponse { message, warning }),
    ))
}

/// GET /projects/{project_id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let db = state.clone();
    let messages = run_blocking(move || {
        require_project(&db, project_id, user.id)?;
        let rows = db.db.list_messages(&project_id.to_string())?;
        Ok(rows
            .iter()
            .map(MessageRow::to_model)
            .collect::<anyhow::Result<Vec<_>>>()?)
    })
    .await?;

    Ok(Json(messages))
}
