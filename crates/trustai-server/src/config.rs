use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::Duration;

use trustai_api::ApiConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key",
];

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:5174";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub groq_api_key: String,
    pub groq_model: String,
    pub cors_origins: Vec<String>,
    pub cleanup_interval_secs: u64,
    pub api: ApiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Every variable is
    /// prefixed with `TRUSTAI_`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("TRUSTAI_{}", name));
        let string_or =
            |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TRUSTAI_JWT_SECRET is unset or still a placeholder");
        }

        let access_token_minutes: i64 = parse_or(&var, "ACCESS_TOKEN_MINUTES", 30)?;

        Ok(Self {
            host: string_or("HOST", "0.0.0.0"),
            port: parse_or(&var, "PORT", 8000)?,
            db_path: string_or("DB_PATH", "trustai.db").into(),
            groq_api_key: string_or("GROQ_API_KEY", ""),
            groq_model: string_or("GROQ_MODEL", "llama-3.3-70b-versatile"),
            cors_origins: string_or("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            cleanup_interval_secs: parse_or(&var, "CLEANUP_INTERVAL_SECS", 3600)?,
            api: ApiConfig {
                jwt_secret,
                access_token_ttl: Duration::minutes(access_token_minutes),
                guest_daily_limit: parse_or(&var, "GUEST_DAILY_LIMIT", 3)?,
                guest_text_limit: parse_or(&var, "GUEST_TEXT_LIMIT", 5000)?,
                frontend_url: string_or("FRONTEND_URL", "http://localhost:5174"),
            },
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("TRUSTAI_{} has an invalid value '{}'", name, raw)),
        None => Ok(default),
    }
}
