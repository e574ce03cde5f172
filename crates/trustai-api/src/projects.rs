use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use trustai_db::models::{NoteRow, ProjectChanges, ProjectRow, format_timestamp};
use trustai_types::api::{CreateNoteRequest, CreateProjectRequest, UpdateProjectRequest};
use trustai_types::models::{Note, Project, TrustStatus};

use crate::error::{ApiError, ApiJson, ApiPath};
use crate::middleware::CurrentUser;
use crate::{AppState, run_blocking};

fn not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

/// Blocking. Another owner's project is reported exactly like a missing one.
pub(crate) fn require_project(
    state: &AppState,
    project_id: Uuid,
    owner_id: Uuid,
) -> Result<ProjectRow, ApiError> {
    state
        .db
        .get_project(&project_id.to_string(), &owner_id.to_string())?
        .ok_or_else(not_found)
}

/// Blocking. The row as an API model with its notes attached.
fn project_with_notes(state: &AppState, row: &ProjectRow) -> Result<Project, ApiError> {
    let mut project = row.to_model()?;
    project.notes = state
        .db
        .list_notes(&row.id)?
        .iter()
        .map(NoteRow::to_model)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(project)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Project name is required".to_string()));
    }

    let now = format_timestamp(Utc::now());
    let row = ProjectRow {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.to_string(),
        name,
        description: non_blank(req.description),
        category: non_blank(req.category).unwrap_or_else(|| "General".to_string()),
        tags: serde_json::to_string(&req.tags).map_err(|e| ApiError::Internal(e.to_string()))?,
        priority: non_blank(req.priority).unwrap_or_else(|| "Medium".to_string()),
        status: TrustStatus::Neutral.as_str().to_string(),
        trust_score: 0.0,
        created_at: now.clone(),
        last_updated: now,
    };

    let db = state.clone();
    let project = run_blocking(move || {
        db.db.create_project(&row)?;
        Ok(row.to_model()?)
    })
    .await?;

    info!("Project {} created by {}", project.id, user.id);
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let db = state.clone();
    let projects = run_blocking(move || {
        let rows = db.db.list_projects(&user.id.to_string())?;
        rows.iter()
            .map(|row| project_with_notes(&db, row))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    Ok(Json(projects))
}

/// GET /projects/{project_id}
pub async fn get_project(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Project>, ApiError> {
    let db = state.clone();
    let project = run_blocking(move || {
        let row = require_project(&db, project_id, user.id)?;
        project_with_notes(&db, &row)
    })
    .await?;
    Ok(Json(project))
}

/// PUT /projects/{project_id}
///
/// Score and status are derived from messages and cannot be set here.
pub async fn update_project(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    if req.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::Validation("Project name cannot be empty".to_string()));
    }

    let changes = ProjectChanges {
        name: req.name.map(|name| name.trim().to_string()),
        description: req.description,
        category: non_blank(req.category),
        tags: req.tags,
        priority: non_blank(req.priority),
    };

    let db = state.clone();
    let project = run_blocking(move || {
        let row = db
            .db
            .update_project(
                &project_id.to_string(),
                &user.id.to_string(),
                &changes,
                &format_timestamp(Utc::now()),
            )?
            .ok_or_else(not_found)?;
        project_with_notes(&db, &row)
    })
    .await?;

    Ok(Json(project))
}

/// DELETE /projects/{project_id}
pub async fn delete_project(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    let db = state.clone();
    let removed = run_blocking(move || {
        Ok(db
            .db
            .delete_project(&project_id.to_string(), &user.id.to_string())?)
    })
    .await?;

    if !removed {
        return Err(not_found());
    }
    info!("Project {} deleted", project_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /projects/{project_id}/notes
pub async fn add_note(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<Uuid>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("Content required".to_string()));
    }

    let now = format_timestamp(Utc::now());
    let row = NoteRow {
        id: Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        content,
        tags: "[]".to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    let db = state.clone();
    let note: Note = run_blocking(move || {
        if !db.db.add_note(&user.id.to_string(), &row)? {
            return Err(not_found());
        }
        Ok(row.to_model()?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// DELETE /projects/{project_id}/notes/{note_id}
///
/// Removing a note that is already gone still succeeds.
pub async fn delete_note(
    State(state): State<AppState>,
    ApiPath((project_id, note_id)): ApiPath<(Uuid, String)>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    let db = state.clone();
    run_blocking(move || {
        require_project(&db, project_id, user.id)?;
        if db.db.delete_note(&project_id.to_string(), &note_id)? {
            info!("Note {} removed from project {}", note_id, project_id);
        }
        Ok(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
