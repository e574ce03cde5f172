use crate::Database;
use crate::models::{
    AnalysisRow, MessageRow, NoteRow, ProjectChanges, ProjectRow, ResetOutcome, UserRow,
};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

const USER_COLUMNS: &str =
    "id, email, name, password, role, bio, profile_image, last_login, created_at";

const PROJECT_COLUMNS: &str = "id, user_id, name, description, category, tags, priority, status, \
     trust_score, created_at, last_updated";

const MESSAGE_COLUMNS: &str =
    "id, project_id, user_id, role, content, score, citations, created_at";

const NOTE_COLUMNS: &str = "id, project_id, content, tags, created_at, updated_at";

const ANALYSIS_COLUMNS: &str = "id, project_id, user_id, input_type, input_text, ai_model, \
     trust_score, verdict, analysis_markdown, citations, created_at";

/// Most recent analyses returned per project.
pub const ANALYSIS_HISTORY_LIMIT: usize = 100;

impl Database {
    // -- Users --

    /// Returns `false` when the email is already registered.
    pub fn create_user(&self, user: &UserRow) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, name, password, role, last_login, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(email) DO NOTHING",
                params![
                    user.id,
                    user.email,
                    user.name,
                    user.password,
                    user.role,
                    user.last_login,
                    user.created_at
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn touch_last_login(&self, id: &str, at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET last_login = ?1 WHERE id = ?2", params![at, id])?;
            Ok(())
        })
    }

    /// Applies the non-`None` fields and returns the updated row.
    pub fn update_profile(
        &self,
        id: &str,
        name: Option<&str>,
        bio: Option<&str>,
        profile_image: Option<&str>,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    bio = COALESCE(?3, bio),
                    profile_image = COALESCE(?4, profile_image)
                 WHERE id = ?1",
                params![id, name, bio, profile_image],
            )?;
            query_user(conn, "id", id)
        })
    }

    /// Records the reset nonce and swaps the password hash in one
    /// transaction, so a nonce can only ever be spent once.
    pub fn reset_password(
        &self,
        email: &str,
        password_hash: &str,
        nonce: &str,
        nonce_expires_at: i64,
    ) -> Result<ResetOutcome> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [email],
                |r| r.get(0),
            )?;
            if !exists {
                return Ok(ResetOutcome::UnknownUser);
            }

            let recorded = tx.execute(
                "INSERT OR IGNORE INTO consumed_reset_tokens (nonce, expires_at) VALUES (?1, ?2)",
                params![nonce, nonce_expires_at],
            )?;
            if recorded == 0 {
                return Ok(ResetOutcome::AlreadyUsed);
            }

            tx.execute(
                "UPDATE users SET password = ?1 WHERE email = ?2",
                params![password_hash, email],
            )?;
            tx.commit()?;
            Ok(ResetOutcome::Updated)
        })
    }

    /// Consumed nonces are only needed until their token would have expired.
    pub fn prune_consumed_nonces(&self, now: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let removed =
                conn.execute("DELETE FROM consumed_reset_tokens WHERE expires_at < ?1", [now])?;
            Ok(removed)
        })
    }

    // -- Projects --

    pub fn create_project(&self, project: &ProjectRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, user_id, name, description, category, tags, priority,
                                       status, trust_score, created_at, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    project.id,
                    project.user_id,
                    project.name,
                    project.description,
                    project.category,
                    project.tags,
                    project.priority,
                    project.status,
                    project.trust_score,
                    project.created_at,
                    project.last_updated
                ],
            )?;
            Ok(())
        })
    }

    /// Newest first.
    pub fn list_projects(&self, owner_id: &str) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], project_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Owner-scoped lookup: another user's project reads as missing.
    pub fn get_project(&self, id: &str, owner_id: &str) -> Result<Option<ProjectRow>> {
        self.with_conn(|conn| query_owned_project(conn, id, owner_id))
    }

    pub fn update_project(
        &self,
        id: &str,
        owner_id: &str,
        changes: &ProjectChanges,
        now: &str,
    ) -> Result<Option<ProjectRow>> {
        let tags = changes.tags.as_ref().map(serde_json::to_string).transpose()?;

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE projects SET
                    name = COALESCE(?3, name),
                    description = COALESCE(?4, description),
                    category = COALESCE(?5, category),
                    tags = COALESCE(?6, tags),
                    priority = COALESCE(?7, priority),
                    last_updated = ?8
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    id,
                    owner_id,
                    changes.name,
                    changes.description,
                    changes.category,
                    tags,
                    changes.priority,
                    now
                ],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_owned_project(conn, id, owner_id)
        })
    }

    /// Messages go with the project (`ON DELETE CASCADE`).
    pub fn delete_project(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM projects WHERE id = ?1 AND user_id = ?2",
                params![id, owner_id],
            )?;
            Ok(removed == 1)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &MessageRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, project_id, user_id, role, content, score, citations,
                                       created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id,
                    message.project_id,
                    message.user_id,
                    message.role,
                    message.content,
                    message.score,
                    message.citations,
                    message.created_at
                ],
            )?;
            Ok(())
        })
    }

    /// Creation order.
    pub fn list_messages(&self, project_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE project_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([project_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

impl Database {
    // -- Notes --

    /// Inserts only when `owner_id` owns the note's project. Returns `false`
    /// otherwise.
    pub fn add_note(&self, owner_id: &str, note: &NoteRow) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO project_notes (id, project_id, content, tags, created_at, updated_at)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6
                 WHERE EXISTS (SELECT 1 FROM projects WHERE id = ?2 AND user_id = ?7)",
                params![
                    note.id,
                    note.project_id,
                    note.content,
                    note.tags,
                    note.created_at,
                    note.updated_at,
                    owner_id
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Oldest first.
    pub fn list_notes(&self, project_id: &str) -> Result<Vec<NoteRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTE_COLUMNS} FROM project_notes WHERE project_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([project_id], note_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_note(&self, project_id: &str, note_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM project_notes WHERE id = ?1 AND project_id = ?2",
                params![note_id, project_id],
            )?;
            Ok(removed == 1)
        })
    }

    // -- Analysis history --

    /// Inserts only when the author owns the target project.
    pub fn insert_analysis(&self, analysis: &AnalysisRow) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO analyses (id, project_id, user_id, input_type, input_text, ai_model,
                                       trust_score, verdict, analysis_markdown, citations,
                                       created_at)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
                 WHERE EXISTS (SELECT 1 FROM projects WHERE id = ?2 AND user_id = ?3)",
                params![
                    analysis.id,
                    analysis.project_id,
                    analysis.user_id,
                    analysis.input_type,
                    analysis.input_text,
                    analysis.ai_model,
                    analysis.trust_score,
                    analysis.verdict,
                    analysis.analysis_markdown,
                    analysis.citations,
                    analysis.created_at
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_analysis(&self, id: &str, user_id: &str) -> Result<Option<AnalysisRow>> {
        self.with_conn(|conn| {
            let sql =
                format!("SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = ?1 AND user_id = ?2");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row(params![id, user_id], analysis_from_row).optional()?;
            Ok(row)
        })
    }

    /// Newest first, at most [`ANALYSIS_HISTORY_LIMIT`] entries.
    pub fn list_project_analyses(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> Result<Vec<AnalysisRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE project_id = ?1 AND user_id = ?2
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![project_id, user_id, ANALYSIS_HISTORY_LIMIT as i64],
                    analysis_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

// -- Aggregation primitives (composed inside one transaction by the caller) --

/// Scores of every AI-authored, scored message in the project.
pub fn scored_ai_messages(conn: &Connection, project_id: &str) -> Result<Vec<f64>> {
    let mut stmt = conn.prepare(
        "SELECT score FROM messages
         WHERE project_id = ?1 AND role = 'ai' AND score IS NOT NULL",
    )?;
    let scores = stmt
        .query_map([project_id], |row| row.get::<_, f64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(scores)
}

/// Returns the number of rows touched (0 when the project is gone).
pub fn set_project_score(
    conn: &Connection,
    project_id: &str,
    trust_score: f64,
    status: &str,
    now: &str,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE projects SET trust_score = ?2, status = ?3, last_updated = ?4 WHERE id = ?1",
        params![project_id, trust_score, status, now],
    )?;
    Ok(updated)
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn query_owned_project(conn: &Connection, id: &str, owner_id: &str) -> Result<Option<ProjectRow>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1 AND user_id = ?2");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row(params![id, owner_id], project_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        bio: row.get(5)?,
        profile_image: row.get(6)?,
        last_login: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        tags: row.get(5)?,
        priority: row.get(6)?,
        status: row.get(7)?,
        trust_score: row.get(8)?,
        created_at: row.get(9)?,
        last_updated: row.get(10)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        user_id: row.get(2)?,
        role: row.get(3)?,
        content: row.get(4)?,
        score: row.get(5)?,
        citations: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        content: row.get(2)?,
        tags: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<AnalysisRow> {
    Ok(AnalysisRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        user_id: row.get(2)?,
        input_type: row.get(3)?,
        input_text: row.get(4)?,
        ai_model: row.get(5)?,
        trust_score: row.get(6)?,
        verdict: row.get(7)?,
        analysis_markdown: row.get(8)?,
        citations: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
