//! Database row types. These map directly to SQLite rows and stay distinct
//! from the trustai-types API models to keep the DB layer independent.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use trustai_types::models::{AnalysisRecord, Message, Note, Project, User};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub last_login: Option<String>,
    pub created_at: String,
}

pub struct ProjectRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub tags: String,
    pub priority: String,
    pub status: String,
    pub trust_score: f64,
    pub created_at: String,
    pub last_updated: String,
}

pub struct MessageRow {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub score: Option<f64>,
    pub citations: String,
    pub created_at: String,
}

pub struct NoteRow {
    pub id: String,
    pub project_id: String,
    pub content: String,
    pub tags: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct AnalysisRow {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub input_type: String,
    pub input_text: Option<String>,
    pub ai_model: String,
    pub trust_score: f64,
    pub verdict: String,
    pub analysis_markdown: String,
    pub citations: String,
    pub created_at: String,
}

/// Partial project edit. `None` leaves a column untouched.
#[derive(Debug, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Updated,
    UnknownUser,
    AlreadyUsed,
}

/// Accepts RFC 3339 and SQLite's naive `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| anyhow!("Corrupt timestamp '{}': {}", raw, e))
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse().map_err(|e| anyhow!("Corrupt {} '{}': {}", what, raw, e))
}

fn parse_list(raw: &str, what: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| anyhow!("Corrupt {} '{}': {}", what, raw, e))
}

impl UserRow {
    pub fn to_model(&self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id, "user id")?,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            last_login: self.last_login.as_deref().map(parse_timestamp).transpose()?,
            bio: self.bio.clone(),
            profile_image: self.profile_image.clone(),
        })
    }
}

impl ProjectRow {
    pub fn to_model(&self) -> Result<Project> {
        Ok(Project {
            id: parse_id(&self.id, "project id")?,
            user_id: parse_id(&self.user_id, "owner id")?,
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            tags: parse_list(&self.tags, "tags")?,
            priority: self.priority.clone(),
            status: self.status.parse().map_err(|e: String| anyhow!(e))?,
            trust_score: self.trust_score,
            created_at: parse_timestamp(&self.created_at)?,
            last_updated: parse_timestamp(&self.last_updated)?,
            notes: Vec::new(),
        })
    }
}

impl MessageRow {
    pub fn to_model(&self) -> Result<Message> {
        Ok(Message {
            id: parse_id(&self.id, "message id")?,
            project_id: parse_id(&self.project_id, "project id")?,
            user_id: parse_id(&self.user_id, "author id")?,
            role: self.role.parse().map_err(|e: String| anyhow!(e))?,
            content: self.content.clone(),
            score: self.score,
            citations: parse_list(&self.citations, "citations")?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl NoteRow {
    pub fn to_model(&self) -> Result<Note> {
        Ok(Note {
            id: parse_id(&self.id, "note id")?,
            content: self.content.clone(),
            tags: parse_list(&self.tags, "note tags")?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

impl AnalysisRow {
    pub fn to_model(&self) -> Result<AnalysisRecord> {
        Ok(AnalysisRecord {
            id: parse_id(&self.id, "analysis id")?,
            project_id: parse_id(&self.project_id, "project id")?,
            user_id: parse_id(&self.user_id, "author id")?,
            input_type: self.input_type.clone(),
            input_text: self.input_text.clone(),
            ai_model: self.ai_model.clone(),
            trust_score: self.trust_score,
            verdict: self.verdict.clone(),
            analysis_markdown: self.analysis_markdown.clone(),
            citations: parse_list(&self.citations, "citations")?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
