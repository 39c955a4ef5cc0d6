use rusqlite::Connection;
use tracing::debug;

use crate::StoreError;

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS questions (
            id                  INTEGER PRIMARY KEY,
            title               TEXT NOT NULL,
            creation_date       INTEGER NOT NULL,
            last_activity_date  INTEGER NOT NULL,
            link                TEXT NOT NULL,
            closed_reason       TEXT,
            tags                TEXT NOT NULL DEFAULT '',
            site                TEXT NOT NULL,
            is_answered         INTEGER NOT NULL DEFAULT 0,
            score               INTEGER NOT NULL DEFAULT 0,
            view_count          INTEGER NOT NULL DEFAULT 0,
            answer_count        INTEGER NOT NULL DEFAULT 0,
            comment_count       INTEGER NOT NULL DEFAULT 0,
            up_vote_count       INTEGER NOT NULL DEFAULT 0,
            down_vote_count     INTEGER NOT NULL DEFAULT 0,
            delete_vote_count   INTEGER NOT NULL DEFAULT 0,
            favorite_count      INTEGER NOT NULL DEFAULT 0,
            reopen_vote_count   INTEGER NOT NULL DEFAULT 0,
            user_id             INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_questions_creation
            ON questions(creation_date DESC, id DESC);

        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY,
            display_name    TEXT NOT NULL,
            profile_image   TEXT NOT NULL DEFAULT '',
            link            TEXT NOT NULL DEFAULT '',
            reputation      INTEGER NOT NULL DEFAULT 0,
            accept_rate     INTEGER NOT NULL DEFAULT 0,
            badge_bronze    INTEGER NOT NULL DEFAULT 0,
            badge_silver    INTEGER NOT NULL DEFAULT 0,
            badge_gold      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS chat_links (
            question_id     INTEGER PRIMARY KEY,
            channel         TEXT NOT NULL,
            ts              TEXT NOT NULL
        );
        ",
    )?;

    debug!("Store migrations complete");
    Ok(())
}
