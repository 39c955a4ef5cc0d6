use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

use crate::models::{ChatLink, QuestionRecord, UpsertOutcome, UserRecord};
use crate::{Store, StoreError};

const QUESTION_COLUMNS: &str = "id, title, creation_date, last_activity_date, link, closed_reason, \
     tags, site, is_answered, score, view_count, answer_count, comment_count, up_vote_count, \
     down_vote_count, delete_vote_count, favorite_count, reopen_vote_count, user_id";

const USER_COLUMNS: &str = "id, display_name, profile_image, link, reputation, accept_rate, \
     badge_bronze, badge_silver, badge_gold";

impl Store {
    // -- Questions --

    pub fn find_question(&self, id: i64) -> Result<Option<QuestionRecord>, StoreError> {
        self.with_conn(|conn| query_question(conn, id))
    }

    /// Insert or fully overwrite `record`, skipping the write when the stored
    /// row is identical.
    pub fn upsert_question(&self, record: &QuestionRecord) -> Result<UpsertOutcome, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let outcome = match query_question(&tx, record.id)? {
                Some(existing) if existing == *record => UpsertOutcome::Unchanged,
                Some(_) => {
                    tx.execute(
                        "UPDATE questions SET title = ?2, creation_date = ?3,
                            last_activity_date = ?4, link = ?5, closed_reason = ?6, tags = ?7,
                            site = ?8, is_answered = ?9, score = ?10, view_count = ?11,
                            answer_count = ?12, comment_count = ?13, up_vote_count = ?14,
                            down_vote_count = ?15, delete_vote_count = ?16,
                            favorite_count = ?17, reopen_vote_count = ?18, user_id = ?19
                         WHERE id = ?1",
                        params_from_iter(question_values(record)),
                    )?;
                    UpsertOutcome::Updated
                }
                None => {
                    tx.execute(
                        &format!(
                            "INSERT INTO questions ({QUESTION_COLUMNS})
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
                        ),
                        params_from_iter(question_values(record)),
                    )?;
                    UpsertOutcome::Created
                }
            };
            tx.commit()?;
            trace!(question_id = record.id, ?outcome, "Question upserted");
            Ok(outcome)
        })
    }

    pub fn delete_question(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM questions WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Ids of the `limit` most recently created questions, newest first.
    pub fn tracked_ids(&self, limit: usize) -> Result<Vec<i64>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM questions
                 ORDER BY creation_date DESC, id DESC
                 LIMIT ?1",
            )?;
            let ids = stmt
                .query_map([sql_limit(limit)], |row| row.get(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    /// The `limit` most recently created questions, newest first.
    pub fn tracked_questions(&self, limit: usize) -> Result<Vec<QuestionRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUESTION_COLUMNS} FROM questions
                 ORDER BY creation_date DESC, id DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map([sql_limit(limit)], map_question)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Newest stored question by creation time.
    pub fn latest_question(&self) -> Result<Option<QuestionRecord>, StoreError> {
        Ok(self.tracked_questions(1)?.into_iter().next())
    }

    pub fn question_count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| count(conn, "questions"))
    }

    // -- Users --

    pub fn find_user(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn upsert_user(&self, record: &UserRecord) -> Result<UpsertOutcome, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let outcome = match query_user(&tx, record.id)? {
                Some(existing) if existing == *record => UpsertOutcome::Unchanged,
                Some(_) => {
                    tx.execute(
                        "UPDATE users SET display_name = ?2, profile_image = ?3, link = ?4,
                            reputation = ?5, accept_rate = ?6, badge_bronze = ?7,
                            badge_silver = ?8, badge_gold = ?9
                         WHERE id = ?1",
                        params_from_iter(user_values(record)),
                    )?;
                    UpsertOutcome::Updated
                }
                None => {
                    tx.execute(
                        &format!(
                            "INSERT INTO users ({USER_COLUMNS})
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                        ),
                        params_from_iter(user_values(record)),
                    )?;
                    UpsertOutcome::Created
                }
            };
            tx.commit()?;
            trace!(user_id = record.id, ?outcome, "User upserted");
            Ok(outcome)
        })
    }

    // -- Chat links --

    pub fn find_chat_link(&self, question_id: i64) -> Result<Option<ChatLink>, StoreError> {
        self.with_conn(|conn| {
            let link = conn
                .query_row(
                    "SELECT question_id, channel, ts FROM chat_links WHERE question_id = ?1",
                    [question_id],
                    map_chat_link,
                )
                .optional()?;
            Ok(link)
        })
    }

    /// Fails when the question already has a link.
    pub fn create_chat_link(&self, link: &ChatLink) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_links (question_id, channel, ts) VALUES (?1, ?2, ?3)",
                params![link.question_id, link.channel, link.ts],
            )?;
            debug!(question_id = link.question_id, ts = %link.ts, "Chat link created");
            Ok(())
        })
    }

    /// Remove the link of `question_id`. Deleting a missing link is not an error.
    pub fn delete_chat_link(&self, question_id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM chat_links WHERE question_id = ?1", [question_id])?;
            Ok(())
        })
    }

    /// All links, ordered by question id.
    pub fn all_chat_links(&self) -> Result<Vec<ChatLink>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT question_id, channel, ts FROM chat_links ORDER BY question_id")?;
            let links = stmt
                .query_map([], map_chat_link)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(links)
        })
    }

    pub fn chat_link_count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| count(conn, "chat_links"))
    }
}

// -- Helpers (operate on &Connection directly) --

fn query_question(conn: &Connection, id: i64) -> Result<Option<QuestionRecord>, StoreError> {
    let record = conn
        .query_row(
            &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"),
            [id],
            map_question,
        )
        .optional()?;
    Ok(record)
}

fn query_user(conn: &Connection, id: i64) -> Result<Option<UserRecord>, StoreError> {
    let record = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            map_user,
        )
        .optional()?;
    Ok(record)
}

fn count(conn: &Connection, table: &str) -> Result<u64, StoreError> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(n).unwrap_or_default())
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn question_values(record: &QuestionRecord) -> Vec<Value> {
    vec![
        Value::from(record.id),
        Value::from(record.title.clone()),
        Value::from(record.creation_date.timestamp()),
        Value::from(record.last_activity_date.timestamp()),
        Value::from(record.link.clone()),
        Value::from(record.closed_reason.clone()),
        Value::from(record.tags.join(";")),
        Value::from(record.site.clone()),
        Value::from(record.is_answered),
        Value::from(record.score),
        Value::from(record.view_count),
        Value::from(record.answer_count),
        Value::from(record.comment_count),
        Value::from(record.up_vote_count),
        Value::from(record.down_vote_count),
        Value::from(record.delete_vote_count),
        Value::from(record.favorite_count),
        Value::from(record.reopen_vote_count),
        Value::from(record.user_id),
    ]
}

fn user_values(record: &UserRecord) -> Vec<Value> {
    vec![
        Value::from(record.id),
        Value::from(record.display_name.clone()),
        Value::from(record.profile_image.clone()),
        Value::from(record.link.clone()),
        Value::from(record.reputation),
        Value::from(record.accept_rate),
        Value::from(record.badge_bronze),
        Value::from(record.badge_silver),
        Value::from(record.badge_gold),
    ]
}

fn map_question(row: &Row<'_>) -> rusqlite::Result<QuestionRecord> {
    let tags: String = row.get(6)?;
    Ok(QuestionRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        creation_date: stackexchange::epoch(row.get(2)?),
        last_activity_date: stackexchange::epoch(row.get(3)?),
        link: row.get(4)?,
        closed_reason: row.get(5)?,
        tags: if tags.is_empty() {
            Vec::new()
        } else {
            tags.split(';').map(ToString::to_string).collect()
        },
        site: row.get(7)?,
        is_answered: row.get(8)?,
        score: row.get(9)?,
        view_count: row.get(10)?,
        answer_count: row.get(11)?,
        comment_count: row.get(12)?,
        up_vote_count: row.get(13)?,
        down_vote_count: row.get(14)?,
        delete_vote_count: row.get(15)?,
        favorite_count: row.get(16)?,
        reopen_vote_count: row.get(17)?,
        user_id: row.get(18)?,
    })
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        display_name: row.get(1)?,
        profile_image: row.get(2)?,
        link: row.get(3)?,
        reputation: row.get(4)?,
        accept_rate: row.get(5)?,
        badge_bronze: row.get(6)?,
        badge_silver: row.get(7)?,
        badge_gold: row.get(8)?,
    })
}

fn map_chat_link(row: &Row<'_>) -> rusqlite::Result<ChatLink> {
    Ok(ChatLink {
        question_id: row.get(0)?,
        channel: row.get(1)?,
        ts: row.get(2)?,
    })
}
