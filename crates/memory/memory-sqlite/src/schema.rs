//! Table definitions.

use sqlx::SqlitePool;

const CREATE_MEMORIES: &str = r#"
    CREATE TABLE IF NOT EXISTS conversation_memories (
        conversation_id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        coach_id TEXT NOT NULL,
        window_json TEXT NOT NULL,
        total_message_count INTEGER NOT NULL,
        rolling_summary TEXT NOT NULL,
        version INTEGER NOT NULL,
        epoch INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (user_id, coach_id)
    )
"#;

const CREATE_PACKETS: &str = r#"
    CREATE TABLE IF NOT EXISTS memory_packets (
        conversation_id TEXT NOT NULL,
        from_message_index INTEGER NOT NULL,
        to_message_index INTEGER NOT NULL,
        message_count INTEGER NOT NULL,
        summary_text TEXT NOT NULL,
        epoch INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        PRIMARY KEY (conversation_id, epoch, from_message_index)
    )
"#;

/// Creates both tables if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_MEMORIES).execute(pool).await?;
    sqlx::query(CREATE_PACKETS).execute(pool).await?;
    Ok(())
}
