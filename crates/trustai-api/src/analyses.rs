use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use trustai_db::models::{AnalysisRow, format_timestamp};
use trustai_types::api::CreateAnalysisRequest;
use trustai_types::models::AnalysisRecord;

use crate::error::{ApiError, ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::projects::require_project;
use crate::{AppState, run_blocking};

fn not_found() -> ApiError {
    ApiError::NotFound("Analysis not found".to_string())
}

fn validate(req: &CreateAnalysisRequest) -> Result<(), ApiError> {
    if !req.trust_score.is_finite() || !(0.0..=100.0).contains(&req.trust_score) {
        return Err(ApiError::Validation(
            "Trust score must be between 0 and 100".to_string(),
        ));
    }
    if req.verdict.trim().is_empty() {
        return Err(ApiError::Validation("Verdict is required".to_string()));
    }
    if req.analysis_markdown.trim().is_empty() {
        return Err(ApiError::Validation("Analysis content is required".to_string()));
    }
    Ok(())
}

/// POST /analyses
///
/// Records a finished analysis in the history of a project the caller owns.
pub async fn create_analysis(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateAnalysisRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&req)?;

    let citations = serde_json::to_string(&req.citations)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let row = AnalysisRow {
        id: Uuid::new_v4().to_string(),
        project_id: req.project_id.to_string(),
        user_id: user.id.to_string(),
        input_type: req.input_type,
        input_text: req.input_text,
        ai_model: req.ai_model,
        trust_score: req.trust_score,
        verdict: req.verdict,
        analysis_markdown: req.analysis_markdown,
        citations,
        created_at: format_timestamp(Utc::now()),
    };

    let db = state.clone();
    let record = run_blocking(move || {
        if !db.db.insert_analysis(&row)? {
            return Err(ApiError::NotFound("Project not found".to_string()));
        }
        Ok(row.to_model()?)
    })
    .await?;

    info!("Analysis {} saved to project {}", record.id, record.project_id);
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /analyses/{analysis_id}
pub async fn get_analysis(
    State(state): State<AppState>,
    ApiPath(analysis_id): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<AnalysisRecord>, ApiError> {
    let db = state.clone();
    let record = run_blocking(move || {
        let row = db
            .db
            .get_analysis(&analysis_id.to_string(), &user.id.to_string())?
            .ok_or_else(not_found)?;
        Ok(row.to_model()?)
    })
    .await?;

    Ok(Json(record))
}

/// GET /analyses/project/{project_id}
///
/// Newest first, capped at the most recent hundred.
pub async fn list_project_analyses(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<AnalysisRecord>>, ApiError> {
    let db = state.clone();
    let records = run_blocking(move || {
        require_project(&db, project_id, user.id)?;
        let rows = db
            .db
            .list_project_analyses(&project_id.to_string(), &user.id.to_string())?;
        Ok(rows
            .iter()
            .map(AnalysisRow::to_model)
            .collect::<anyhow::Result<Vec<_>>>()?)
    })
    .await?;

    Ok(Json(records))
}
