use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::info;

/// Outbound mail collaborator. Only password-reset links are sent.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<()>;
}

/// Used when no mail transport is configured: records the attempt and
/// reports it as undelivered.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, _to: &str, _reset_link: &str) -> Result<()> {
        info!("Mail transport not configured; password reset link not delivered");
        Err(anyhow!("mail transport not configured"))
    }
}

pub fn reset_link(frontend_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", frontend_url.trim_end_matches('/'), token)
}
