//! SQLite-backed conversation history.

use std::path::Path;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use time::OffsetDateTime;

use super::retry::{RetryError, RetryPolicy, Retrier};
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::observability::STORE_OPERATIONS;
use crate::types::{MessageParam, MessageRole};
use crate::utils::time::parse_sqlite_timestamp;

/// How many conversations `--list-chats` shows.
pub const RECENT_CONVERSATIONS: usize = 10;

/// A stored turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Surrogate id; increases with insertion order.
    pub id: i64,
    /// The conversation this turn belongs to.
    pub chat_id: String,
    /// Who produced the text.
    pub role: MessageRole,
    /// The text.
    pub text: String,
    /// When the row was written, UTC.
    pub created_at: OffsetDateTime,
}

impl Turn {
    /// The turn as a request message.
    pub fn to_message(&self) -> MessageParam {
        MessageParam::new(self.text.clone(), self.role)
    }
}

/// A turn to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTurn {
    /// The conversation this turn belongs to.
    pub chat_id: String,
    /// Who produced the text.
    pub role: MessageRole,
    /// The text.
    pub text: String,
}

impl NewTurn {
    /// Creates a new turn.
    pub fn new(chat_id: impl Into<String>, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            role,
            text: text.into(),
        }
    }
}

/// A conversation as listed in the recent-conversations view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    /// The conversation key.
    pub chat_id: String,
    /// How many turns it holds.
    pub turn_count: usize,
    /// Its most recent turn.
    pub latest: Turn,
}

/// Conversation history in a SQLite database.
///
/// The store owns its connection outright.  SQLite's own busy handler is
/// disabled so that contention reaches the [`Retrier`], which backs off and
/// tries again.
pub struct HistoryStore {
    conn: Connection,
    retrier: Retrier,
}

impl HistoryStore {
    /// Open or create the database at `path` and bring its schema up to date.
    pub async fn open<P: AsRef<Path>>(path: P, policy: RetryPolicy) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, policy).await
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory(policy: RetryPolicy) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, policy).await
    }

    async fn from_connection(conn: Connection, policy: RetryPolicy) -> Result<Self> {
        conn.busy_timeout(Duration::ZERO)?;
        let store = Self {
            conn,
            retrier: Retrier::new(policy),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        let conn = &self.conn;
        self.retrier
            .run("migrate", is_transient_storage_error, || {
                conn.execute_batch(SCHEMA)
            })
            .await
            .map_err(|err| storage_error("migrate", err))
    }

    /// Stores one turn and returns its surrogate id.
    pub async fn append(&mut self, turn: &NewTurn) -> Result<i64> {
        STORE_OPERATIONS.click();
        let conn = &self.conn;
        self.retrier
            .run("append", is_transient_storage_error, || {
                conn.execute(
                    "INSERT INTO chats (chat_id, persona, message) VALUES (?1, ?2, ?3)",
                    params![turn.chat_id, turn.role.persona(), turn.text],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|err| storage_error("append", err))
    }

    /// Stores a user turn and its reply together.
    ///
    /// Both rows are written in one transaction, so either the whole
    /// exchange is stored or none of it is.  Returns the two surrogate ids.
    pub async fn append_exchange(
        &mut self,
        chat_id: &str,
        user_text: &str,
        reply: &str,
    ) -> Result<(i64, i64)> {
        STORE_OPERATIONS.click();
        let conn = &self.conn;
        self.retrier
            .run("append_exchange", is_transient_storage_error, || {
                let tx = conn.unchecked_transaction()?;
                let mut ids = [0i64; 2];
                for (slot, (role, text)) in ids
                    .iter_mut()
                    .zip([(MessageRole::User, user_text), (MessageRole::Assistant, reply)])
                {
                    tx.execute(
                        "INSERT INTO chats (chat_id, persona, message) VALUES (?1, ?2, ?3)",
                        params![chat_id, role.persona(), text],
                    )?;
                    *slot = tx.last_insert_rowid();
                }
                tx.commit()?;
                Ok((ids[0], ids[1]))
            })
            .await
            .map_err(|err| storage_error("append_exchange", err))
    }

    /// The `limit` most recently active conversations, newest first.
    pub async fn list(&mut self, limit: usize) -> Result<Vec<ConversationSummary>> {
        STORE_OPERATIONS.click();
        let conn = &self.conn;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.retrier
            .run("list", is_transient_storage_error, || {
                let mut stmt = conn.prepare(
                    "SELECT c.id, c.chat_id, c.persona, c.message, c.created_at, g.turns
                     FROM chats c
                     JOIN (SELECT chat_id, MAX(id) AS latest_id, COUNT(*) AS turns
                           FROM chats GROUP BY chat_id) g
                       ON c.id = g.latest_id
                     ORDER BY c.id DESC
                     LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], |row| {
                    let turns: i64 = row.get(5)?;
                    Ok(ConversationSummary {
                        chat_id: row.get(1)?,
                        turn_count: usize::try_from(turns).unwrap_or(0),
                        latest: turn_from_row(row)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(|err| storage_error("list", err))
    }

    /// Every turn of one conversation, oldest first.
    pub async fn get_turns(&mut self, chat_id: &str) -> Result<Vec<Turn>> {
        STORE_OPERATIONS.click();
        let conn = &self.conn;
        self.retrier
            .run("get_turns", is_transient_storage_error, || {
                let mut stmt = conn.prepare(
                    "SELECT id, chat_id, persona, message, created_at
                     FROM chats WHERE chat_id = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt.query_map(params![chat_id], turn_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(|err| storage_error("get_turns", err))
    }
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<Turn> {
    let persona: String = row.get(2)?;
    let role = MessageRole::from_persona(&persona).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown persona {persona:?}").into(),
        )
    })?;
    let created_at: String = row.get(4)?;
    let created_at = parse_sqlite_timestamp(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(Turn {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        role,
        text: row.get(3)?,
        created_at,
    })
}

fn storage_error(operation: &str, err: RetryError<rusqlite::Error>) -> Error {
    match err {
        RetryError::Permanent(err) => Error::from(err),
        RetryError::Exhausted { attempts, last } => {
            Error::retries_exhausted(operation, attempts, Error::from(last))
        }
    }
}

const TRANSIENT_SIGNATURES: &[&str] = &["locked", "busy", "timeout", "timed out"];

/// True for failures that may succeed if tried again: lock contention and
/// timeouts.
pub fn is_transient_storage_error(err: &rusqlite::Error) -> bool {
    if let rusqlite::Error::SqliteFailure(failure, _) = err {
        if matches!(
            failure.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return true;
        }
    }
    let message = err.to_string().to_lowercase();
    TRANSIENT_SIGNATURES.iter().any(|sig| message.contains(sig))
}
