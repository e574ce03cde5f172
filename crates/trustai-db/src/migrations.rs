use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                name            TEXT NOT NULL,
                password        TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'user',
                bio             TEXT,
                profile_image   TEXT,
                last_login      TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE projects (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                name            TEXT NOT NULL,
                description     TEXT,
                category        TEXT NOT NULL DEFAULT 'General',
                tags            TEXT NOT NULL DEFAULT '[]',
                priority        TEXT NOT NULL DEFAULT 'Medium',
                status          TEXT NOT NULL DEFAULT 'Neutral',
                trust_score     REAL NOT NULL DEFAULT 0 CHECK (trust_score BETWEEN 0 AND 100),
                created_at      TEXT NOT NULL,
                last_updated    TEXT NOT NULL
            );

            CREATE INDEX idx_projects_owner ON projects(user_id, created_at);

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                project_id      TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL,
                role            TEXT NOT NULL CHECK (role IN ('user', 'ai')),
                content         TEXT NOT NULL,
                score           REAL
                                CHECK (score IS NULL OR (role = 'ai' AND score BETWEEN 0 AND 100)),
                citations       TEXT NOT NULL DEFAULT '[]',
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_project ON messages(project_id, created_at);

            CREATE TABLE consumed_reset_tokens (
                nonce           TEXT PRIMARY KEY,
                expires_at      INTEGER NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (project notes, analysis history)");
        conn.execute_batch(
            "
            CREATE TABLE project_notes (
                id              TEXT PRIMARY KEY,
                project_id      TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                tags            TEXT NOT NULL DEFAULT '[]',
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_project_notes_project ON project_notes(project_id, created_at);

            CREATE TABLE analyses (
                id                  TEXT PRIMARY KEY,
                project_id          TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                user_id             TEXT NOT NULL REFERENCES users(id),
                input_type          TEXT NOT NULL DEFAULT 'text',
                input_text          TEXT,
                ai_model            TEXT NOT NULL,
                trust_score         REAL NOT NULL CHECK (trust_score BETWEEN 0 AND 100),
                verdict             TEXT NOT NULL,
                analysis_markdown   TEXT NOT NULL,
                citations           TEXT NOT NULL DEFAULT '[]',
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_analyses_project ON analyses(project_id, user_id, created_at);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
