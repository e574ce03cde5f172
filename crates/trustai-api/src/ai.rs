use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use trustai_db::models::{MessageRow, format_timestamp};
use trustai_types::api::{
    Analysis, AnalyzeRequest, AnalyzeResponse, GuestAnalyzeRequest, GuestAnalyzeResponse,
    GuestCreditsResponse,
};
use trustai_types::models::MessageRole;

use crate::error::{ApiError, ApiJson};
use crate::messages::record_message;
use crate::middleware::{ClientIp, CurrentUser};
use crate::projects::require_project;
use crate::{AppState, run_blocking};

pub const SAVE_WARNING: &str = "Analysis completed, but it could not be saved to the project";

fn require_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::Validation("Text is required".to_string()));
    }
    Ok(())
}

fn analysis_row(
    analysis: &Analysis,
    project_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<MessageRow> {
    Ok(MessageRow {
        id: Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        user_id: user_id.to_string(),
        role: MessageRole::Ai.as_str().to_string(),
        content: analysis.analysis_markdown.clone(),
        score: Some(analysis.score),
        citations: serde_json::to_string(&analysis.citations)?,
        created_at: format_timestamp(Utc::now()),
    })
}

/// POST /ai/analyze
///
/// With a `project_id`, the analysis is stored as an AI message on that
/// project and the project's trust score is recomputed. Neither step can
/// void the analysis: failures come back as `warning`.
pub async fn analyze(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    require_text(&req.text)?;
    let user_id = user.id;

    if let Some(project_id) = req.project_id {
        let db = state.clone();
        run_blocking(move || require_project(&db, project_id, user_id).map(|_| ())).await?;
    }

    let analysis = state.analyzer.analyze(&req.text).await?;

    let Some(project_id) = req.project_id else {
        return Ok(Json(AnalyzeResponse {
            analysis,
            warning: None,
        }));
    };

    let db = state.clone();
    let row = analysis_row(&analysis, project_id, user_id)?;
    let warning = match run_blocking(move || record_message(&db, row)).await {
        Ok((message, warning)) => {
            debug!("Analysis stored as message {} on project {}", message.id, project_id);
            warning
        }
        Err(e) => {
            warn!("Could not store analysis on project {}: {}", project_id, e);
            Some(SAVE_WARNING.to_string())
        }
    };

    Ok(Json(AnalyzeResponse { analysis, warning }))
}

/// POST /ai/analyze-guest
///
/// Nothing is stored. A slot is spent once admission succeeds, even if the
/// provider call then fails.
pub async fn analyze_guest(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(req): ApiJson<GuestAnalyzeRequest>,
) -> Result<Json<GuestAnalyzeResponse>, ApiError> {
    require_text(&req.text)?;

    let cap = state.config.guest_text_limit;
    if req.text.chars().count() > cap {
        return Err(ApiError::Validation(format!(
            "Text exceeds {} character limit. Sign up for unlimited analysis!",
            cap
        )));
    }

    let decision = state.guest_quota.check_and_consume(&ip);
    if !decision.allowed {
        debug!("Guest quota exhausted for {}", ip);
        return Err(ApiError::QuotaExceeded {
            message: "Daily limit reached. Sign up for unlimited analyses!".to_string(),
            reset_time: decision.reset_time,
        });
    }

    let analysis = state.analyzer.analyze(&req.text).await?;

    Ok(Json(GuestAnalyzeResponse {
        analysis,
        remaining_credits: decision.remaining,
    }))
}

/// GET /ai/guest-credits
pub async fn guest_credits(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
) -> Json<GuestCreditsResponse> {
    Json(GuestCreditsResponse {
        remaining_credits: state.guest_quota.peek(&ip),
        daily_limit: state.guest_quota.limit(),
    })
}
