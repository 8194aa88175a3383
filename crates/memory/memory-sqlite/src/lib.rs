//! # SQLite Memory Backend
//!
//! Persistent [`coach_memory::MessageStore`] and [`coach_memory::PacketArchive`]
//! implementations on a shared SQLite pool.
//!
//! **Advantages**:
//! - Persistent storage (data survives restarts)
//! - Several processes can share one database file; saves are compare-and-swap
//! - No external database required
//!
//! ## Example
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), coach_memory::StorageError> {
//!     let (store, archive) = memory_sqlite::connect("memory.db").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE conversation_memories (
//!     conversation_id TEXT PRIMARY KEY,
//!     user_id TEXT NOT NULL,
//!     coach_id TEXT NOT NULL,
//!     window_json TEXT NOT NULL,
//!     total_message_count INTEGER NOT NULL,
//!     rolling_summary TEXT NOT NULL,
//!     version INTEGER NOT NULL,
//!     epoch INTEGER NOT NULL DEFAULT 0,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     UNIQUE (user_id, coach_id)
//! );
//!
//! CREATE TABLE memory_packets (
//!     conversation_id TEXT NOT NULL,
//!     from_message_index INTEGER NOT NULL,
//!     to_message_index INTEGER NOT NULL,
//!     message_count INTEGER NOT NULL,
//!     summary_text TEXT NOT NULL,
//!     epoch INTEGER NOT NULL DEFAULT 0,
//!     created_at TEXT NOT NULL,
//!     PRIMARY KEY (conversation_id, epoch, from_message_index)
//! );
//! ```

mod message_store;
mod packet_archive;
mod pool;
mod schema;

pub use message_store::SqliteMessageStore;
pub use packet_archive::SqlitePacketArchive;
pub use pool::SqlitePoolManager;
pub use schema::init_schema;

use coach_memory::StorageError;

/// Opens (creating if needed) the database and returns both stores on one pool.
pub async fn connect(
    database_url: &str,
) -> Result<(SqliteMessageStore, SqlitePacketArchive), StorageError> {
    let manager = SqlitePoolManager::new(database_url)
        .await
        .map_err(StorageError::database)?;
    init_schema(manager.pool())
        .await
        .map_err(StorageError::database)?;
    let pool = manager.pool().clone();
    Ok((SqliteMessageStore::new(pool.clone()), SqlitePacketArchive::new(pool)))
}
