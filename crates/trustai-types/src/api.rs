use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, MessageRole, User};

// -- Token claims --

/// What a signed token may be used for. A token without a `purpose` claim is
/// a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    #[default]
    Session,
    Reset,
}

/// Claim set carried by every token. Canonical definition shared by the
/// token service and the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email (case-normalized).
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<TokenPurpose>,
    /// Per-issuance nonce, set on reset tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn purpose(&self) -> TokenPurpose {
        self.purpose.unwrap_or_default()
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

// -- Projects --

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateNoteRequest {
    pub content: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub role: MessageRole,
    pub content: String,
    pub score: Option<f64>,
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageCreatedResponse {
    #[serde(flatten)]
    pub message: Message,
    /// Set when the message was stored but the project score could not be
    /// refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// -- AI --

/// Result of one external text analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub score: f64,
    pub verdict: String,
    #[serde(default)]
    pub citations: Vec<String>,
    pub analysis_markdown: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub analysis: Analysis,
    /// Set when the analysis succeeded but a follow-up step (message
    /// persistence or score aggregation) did not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GuestAnalyzeRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestAnalyzeResponse {
    #[serde(flatten)]
    pub analysis: Analysis,
    pub remaining_credits: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestCreditsResponse {
    pub remaining_credits: u32,
    pub daily_limit: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuotaExceededBody {
    pub success: bool,
    pub error: String,
    pub message: String,
    pub remaining_credits: u32,
    pub reset_time: Option<DateTime<Utc>>,
}

// -- Analysis history --

fn default_input_type() -> String {
    "text".to_string()
}

fn default_ai_model() -> String {
    "llama3-70b".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateAnalysisRequest {
    pub project_id: Uuid,
    #[serde(default = "default_input_type")]
    pub input_type: String,
    pub input_text: Option<String>,
    #[serde(default = "default_ai_model")]
    pub ai_model: String,
    pub trust_score: f64,
    pub verdict: String,
    pub analysis_markdown: String,
    #[serde(default)]
    pub citations: Vec<String>,
}
