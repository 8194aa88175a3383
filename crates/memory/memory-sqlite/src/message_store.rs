//! # SQLite Message Store
//!
//! One row per conversation; the window is stored as a JSON array.
//!
//! Compare-and-swap: version `1` is an `INSERT OR IGNORE` (the primary key and the
//! `UNIQUE (user_id, coach_id)` constraint both refuse a second creator), later versions
//! are an `UPDATE ... WHERE version = expected`. Zero affected rows is a
//! [`StorageError::VersionConflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coach_memory::{expected_stored_version, ChatMessage, ConversationMemory, MessageStore, StorageError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT conversation_id, user_id, coach_id, window_json, total_message_count, \
     rolling_summary, version, epoch, created_at, updated_at FROM conversation_memories";

/// [`MessageStore`] backed by the `conversation_memories` table.
#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_memory(row: &SqliteRow) -> Result<ConversationMemory, StorageError> {
        let window_json: String = row.try_get("window_json").map_err(StorageError::database)?;
        let window: Vec<ChatMessage> = serde_json::from_str(&window_json)?;
        let total: i64 = row.try_get("total_message_count").map_err(StorageError::database)?;
        let version: i64 = row.try_get("version").map_err(StorageError::database)?;
        let epoch: i64 = row.try_get("epoch").map_err(StorageError::database)?;
        let created_at: String = row.try_get("created_at").map_err(StorageError::database)?;
        let updated_at: String = row.try_get("updated_at").map_err(StorageError::database)?;

        let memory = ConversationMemory {
            conversation_id: row.try_get("conversation_id").map_err(StorageError::database)?,
            user_id: row.try_get("user_id").map_err(StorageError::database)?,
            coach_id: row.try_get("coach_id").map_err(StorageError::database)?,
            window,
            total_message_count: u64::try_from(total).map_err(StorageError::database)?,
            rolling_summary: row.try_get("rolling_summary").map_err(StorageError::database)?,
            version: u64::try_from(version).map_err(StorageError::database)?,
            epoch: u64::try_from(epoch).map_err(StorageError::database)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        };

        if !memory.is_consistent() {
            return Err(StorageError::InvariantViolation(format!(
                "conversation {} stores {} window messages but a total of {}",
                memory.conversation_id,
                memory.window.len(),
                memory.total_message_count
            )));
        }
        Ok(memory)
    }

    async fn fetch_one<'a>(
        &self,
        query: sqlx::query::Query<'a, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'a>>,
    ) -> Result<Option<ConversationMemory>, StorageError> {
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::database)?;
        row.as_ref().map(Self::row_to_memory).transpose()
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(StorageError::database)
}

pub(crate) fn to_i64(value: u64) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(StorageError::database)
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationMemory>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE conversation_id = ?");
        self.fetch_one(sqlx::query(&sql).bind(conversation_id)).await
    }

    async fn find_by_participants(
        &self,
        user_id: &str,
        coach_id: &str,
    ) -> Result<Option<ConversationMemory>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ? AND coach_id = ?");
        self.fetch_one(sqlx::query(&sql).bind(user_id).bind(coach_id))
            .await
    }

    async fn save(&self, memory: &ConversationMemory) -> Result<(), StorageError> {
        let expected = expected_stored_version(memory)?;
        let window_json = serde_json::to_string(&memory.window)?;
        let total = to_i64(memory.total_message_count)?;
        let version = to_i64(memory.version)?;
        let epoch = to_i64(memory.epoch)?;

        let executed = if expected == 0 {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO conversation_memories
                    (conversation_id, user_id, coach_id, window_json, total_message_count,
                     rolling_summary, version, epoch, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&memory.conversation_id)
            .bind(&memory.user_id)
            .bind(&memory.coach_id)
            .bind(&window_json)
            .bind(total)
            .bind(&memory.rolling_summary)
            .bind(version)
            .bind(epoch)
            .bind(memory.created_at.to_rfc3339())
            .bind(memory.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE conversation_memories
                SET window_json = ?, total_message_count = ?, rolling_summary = ?,
                    version = ?, epoch = ?, updated_at = ?
                WHERE conversation_id = ? AND version = ?
                "#,
            )
            .bind(&window_json)
            .bind(total)
            .bind(&memory.rolling_summary)
            .bind(version)
            .bind(epoch)
            .bind(memory.updated_at.to_rfc3339())
            .bind(&memory.conversation_id)
            .bind(to_i64(expected)?)
            .execute(&self.pool)
            .await
        };
        let result = executed.map_err(StorageError::database)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::VersionConflict {
                conversation_id: memory.conversation_id.clone(),
                expected,
            });
        }

        debug!(
            conversation_id = %memory.conversation_id,
            version = memory.version,
            window_len = memory.window.len(),
            "Saved conversation memory"
        );
        Ok(())
    }
}
