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
            CREATE TABLE accounts (
                email               TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                pin_hash            TEXT NOT NULL,
                pair_code           TEXT,
                paired_with         TEXT,
                is_paired           INTEGER NOT NULL DEFAULT 0,
                relationship_status TEXT NOT NULL DEFAULT 'active',
                breakup_reason      TEXT,
                patch_requested     INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_accounts_pair_code ON accounts(pair_code);

            CREATE TABLE conversations (
                pair_code       TEXT PRIMARY KEY,
                created_at      TEXT NOT NULL,
                last_message_at TEXT NOT NULL
            );

            -- seq preserves persisted (append) order
            CREATE TABLE conversation_messages (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                pair_code       TEXT NOT NULL REFERENCES conversations(pair_code),
                sender_email    TEXT NOT NULL,
                kind            TEXT NOT NULL,
                content         TEXT NOT NULL,
                timestamp       TEXT NOT NULL
            );

            CREATE INDEX idx_conversation_messages_pair
                ON conversation_messages(pair_code, seq);

            CREATE TABLE notes (
                id          TEXT PRIMARY KEY,
                pair_code   TEXT NOT NULL,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                color       TEXT NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                created_by  TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_notes_pair ON notes(pair_code, updated_at);

            CREATE TABLE reminders (
                id              TEXT PRIMARY KEY,
                pair_code       TEXT NOT NULL,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                date            TEXT NOT NULL,
                time            TEXT NOT NULL,
                priority        TEXT NOT NULL,
                is_completed    INTEGER NOT NULL DEFAULT 0,
                is_recurring    INTEGER NOT NULL DEFAULT 0,
                recurring_type  TEXT,
                created_by      TEXT NOT NULL,
                email           TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_reminders_pair ON reminders(pair_code);

            CREATE TABLE gallery (
                id          TEXT PRIMARY KEY,
                pair_code   TEXT NOT NULL,
                url         TEXT NOT NULL,
                caption     TEXT NOT NULL,
                uploaded_by TEXT NOT NULL,
                uploaded_at TEXT NOT NULL
            );

            CREATE INDEX idx_gallery_pair ON gallery(pair_code, uploaded_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
