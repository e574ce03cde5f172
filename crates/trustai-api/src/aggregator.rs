use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use trustai_db::Database;
use trustai_db::models::format_timestamp;
use trustai_db::queries::{scored_ai_messages, set_project_score};
use trustai_types::models::TrustStatus;

/// Project state written by one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectScore {
    pub trust_score: f64,
    pub status: TrustStatus,
    pub scored_messages: usize,
    pub last_updated: DateTime<Utc>,
}

/// Arithmetic mean rounded to one decimal place (halves go to the even
/// digit) and clamped to [0, 100]. `None` for an empty set.
pub fn mean_score(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Some(((mean * 10.0).round_ties_even() / 10.0).clamp(0.0, 100.0))
}

/// Keeps each project's trust score equal to the mean of all its scored AI
/// messages.
///
/// Every pass recomputes from the full message set rather than folding in
/// the newest score, and the read and the write share one transaction on
/// the serialized connection. Two analyses finishing together for the same
/// project therefore cannot overwrite each other with a stale mean.
pub struct ScoreAggregator {
    db: Arc<Database>,
}

impl ScoreAggregator {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Blocking. Call once per newly persisted scored AI message. Returns
    /// `None` without writing when the project has no scored messages.
    pub fn on_ai_message_recorded(&self, project_id: Uuid) -> Result<Option<ProjectScore>> {
        self.on_ai_message_recorded_at(project_id, Utc::now())
    }

    pub fn on_ai_message_recorded_at(
        &self,
        project_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ProjectScore>> {
        let project_id = project_id.to_string();

        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let scores = scored_ai_messages(&tx, &project_id)?;
            let Some(trust_score) = mean_score(&scores) else {
                debug!("Project {} has no scored messages; nothing to aggregate", project_id);
                return Ok(None);
            };
            let status = TrustStatus::from_score(trust_score);

            let updated = set_project_score(
                &tx,
                &project_id,
                trust_score,
                status.as_str(),
                &format_timestamp(now),
            )?;
            if updated == 0 {
                return Err(anyhow!("project {} no longer exists", project_id));
            }
            tx.commit()?;

            debug!(
                "Project {} trust score {} ({}) from {} messages",
                project_id,
                trust_score,
                status,
                scores.len()
            );
            Ok(Some(ProjectScore {
                trust_score,
                status,
                scored_messages: scores.len(),
                last_updated: now,
            }))
        })
    }
}
