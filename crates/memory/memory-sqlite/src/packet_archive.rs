//! # SQLite Packet Archive
//!
//! Packets live in `memory_packets`, keyed by `(conversation_id, epoch, from_message_index)`.
//! `append` is one `INSERT ... SELECT ... WHERE NOT EXISTS` statement, so the overlap
//! check and the write cannot interleave with another writer. Ranges of different
//! epochs never overlap.

use async_trait::async_trait;
use coach_memory::{MemoryPacket, PacketArchive, StorageError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::message_store::{parse_timestamp, to_i64};

/// [`PacketArchive`] backed by the `memory_packets` table.
#[derive(Clone)]
pub struct SqlitePacketArchive {
    pool: SqlitePool,
}

impl SqlitePacketArchive {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_packet(row: &SqliteRow) -> Result<MemoryPacket, StorageError> {
        let from: i64 = row.try_get("from_message_index").map_err(StorageError::database)?;
        let to: i64 = row.try_get("to_message_index").map_err(StorageError::database)?;
        let count: i64 = row.try_get("message_count").map_err(StorageError::database)?;
        let epoch: i64 = row.try_get("epoch").map_err(StorageError::database)?;
        let created_at: String = row.try_get("created_at").map_err(StorageError::database)?;

        Ok(MemoryPacket {
            conversation_id: row.try_get("conversation_id").map_err(StorageError::database)?,
            from_message_index: u64::try_from(from).map_err(StorageError::database)?,
            to_message_index: u64::try_from(to).map_err(StorageError::database)?,
            message_count: u64::try_from(count).map_err(StorageError::database)?,
            summary_text: row.try_get("summary_text").map_err(StorageError::database)?,
            epoch: u64::try_from(epoch).map_err(StorageError::database)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

#[async_trait]
impl PacketArchive for SqlitePacketArchive {
    async fn append(&self, packet: &MemoryPacket) -> Result<(), StorageError> {
        let from = to_i64(packet.from_message_index)?;
        let to = to_i64(packet.to_message_index)?;
        let epoch = to_i64(packet.epoch)?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO memory_packets
                (conversation_id, from_message_index, to_message_index, message_count,
                 summary_text, epoch, created_at)
            SELECT ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM memory_packets
                WHERE conversation_id = ? AND epoch = ?
                  AND from_message_index <= ? AND to_message_index >= ?
            )
            "#,
        )
        .bind(&packet.conversation_id)
        .bind(from)
        .bind(to)
        .bind(to_i64(packet.message_count)?)
        .bind(&packet.summary_text)
        .bind(epoch)
        .bind(packet.created_at.to_rfc3339())
        .bind(&packet.conversation_id)
        .bind(epoch)
        .bind(to)
        .bind(from)
        .execute(&self.pool)
        .await
        .map_err(StorageError::database)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::PacketOverlap {
                conversation_id: packet.conversation_id.clone(),
                from: packet.from_message_index,
                to: packet.to_message_index,
            });
        }

        debug!(
            conversation_id = %packet.conversation_id,
            from = packet.from_message_index,
            to = packet.to_message_index,
            "Appended memory packet"
        );
        Ok(())
    }

    async fn list_recent(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MemoryPacket>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT conversation_id, from_message_index, to_message_index, message_count,
                   summary_text, epoch, created_at
            FROM memory_packets
            WHERE conversation_id = ?
            ORDER BY epoch DESC, from_message_index DESC
            LIMIT ?
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::database)?;

        rows.iter().map(Self::row_to_packet).collect()
    }

    async fn delete_all(&self, conversation_id: &str) -> Result<usize, StorageError> {
        let result = sqlx::query("DELETE FROM memory_packets WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::database)?;
        Ok(result.rows_affected() as usize)
    }

    async fn delete_before_epoch(
        &self,
        conversation_id: &str,
        epoch: u64,
    ) -> Result<usize, StorageError> {
        let result = sqlx::query("DELETE FROM memory_packets WHERE conversation_id = ? AND epoch < ?")
            .bind(conversation_id)
            .bind(to_i64(epoch)?)
            .execute(&self.pool)
            .await
            .map_err(StorageError::database)?;
        Ok(result.rows_affected() as usize)
    }
}
