use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account projection that is safe to hand to clients (no password digest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

/// Categorical bucket of a project's trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustStatus {
    Trustworthy,
    Neutral,
    Risky,
}

impl TrustStatus {
    pub const TRUSTWORTHY_THRESHOLD: f64 = 80.0;
    pub const RISKY_THRESHOLD: f64 = 50.0;

    /// `>= 80` is Trustworthy, `< 50` is Risky, anything between is Neutral.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::TRUSTWORTHY_THRESHOLD {
            Self::Trustworthy
        } else if score < Self::RISKY_THRESHOLD {
            Self::Risky
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trustworthy => "Trustworthy",
            Self::Neutral => "Neutral",
            Self::Risky => "Risky",
        }
    }
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Trustworthy" => Ok(Self::Trustworthy),
            "Neutral" => Ok(Self::Neutral),
            "Risky" => Ok(Self::Risky),
            other => Err(format!("unknown trust status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "ai" => Ok(Self::Ai),
            other => Err(format!("unknown message role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub priority: String,
    pub status: TrustStatus,
    pub trust_score: f64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// Free-form owner annotation attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Messages are immutable once stored. Only AI-authored messages carry a score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub score: Option<f64>,
    pub citations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A saved analysis result, kept as project history. Independent of the
/// message log: history entries never feed the project trust score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub input_type: String,
    pub input_text: Option<String>,
    pub ai_model: String,
    pub trust_score: f64,
    pub verdict: String,
    pub analysis_markdown: String,
    pub citations: Vec<String>,
    pub created_at: DateTime<Utc>,
}
