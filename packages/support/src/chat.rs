// ABOUTME: Best-effort chat transcript persistence
// ABOUTME: Gated on the chat_transcripts capability detected when the pool was opened

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

use backstage_core::generate_id;
use backstage_storage::{StorageCapabilities, StorageError, StorageResult};

use crate::error::SupportResult;
use crate::types::{ChatMessage, ChatMessageInput};

pub struct ChatStorage {
    pool: SqlitePool,
    enabled: bool,
}

impl ChatStorage {
    pub fn new(pool: SqlitePool, capabilities: StorageCapabilities) -> Self {
        Self {
            pool,
            enabled: capabilities.chat_transcripts,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Store one message. Returns `None` when transcripts are not provisioned.
    pub async fn insert_message(&self, input: &ChatMessageInput) -> SupportResult<Option<String>> {
        input.validate()?;
        if !self.enabled {
            debug!(session_id = %input.session_id, "Chat transcripts not provisioned, message dropped");
            return Ok(None);
        }

        let id = generate_id("msg");
        let ticket_id = input
            .ticket_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, ticket_id, role, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(input.session_id.trim())
        .bind(ticket_id)
        .bind(input.role.as_str())
        .bind(&input.content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(Some(id))
    }

    /// Oldest first; empty when transcripts are not provisioned
    pub async fn list_messages(&self, session_id: &str) -> StorageResult<Vec<ChatMessage>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, session_id, ticket_id, role, content, created_at \
             FROM chat_messages WHERE session_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_message).collect()
    }
}

fn row_to_message(row: &SqliteRow) -> StorageResult<ChatMessage> {
    let role: String = row.try_get("role")?;

    Ok(ChatMessage {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        ticket_id: row.try_get("ticket_id")?,
        role: role
            .parse()
            .map_err(|e| StorageError::Database(format!("{}", e)))?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatRole;
    use backstage_storage::memory_pool;

    fn message(role: ChatRole, content: &str) -> ChatMessageInput {
        ChatMessageInput {
            session_id: "sess-1".to_string(),
            ticket_id: None,
            role,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_messages_round_trip_when_enabled() {
        let pool = memory_pool().await.unwrap();
        let storage = ChatStorage::new(pool, StorageCapabilities::all());

        let id = storage
            .insert_message(&message(ChatRole::User, "Hola"))
            .await
            .unwrap();
        assert!(id.is_some());
        storage
            .insert_message(&message(ChatRole::Assistant, "¿En qué te ayudo?"))
            .await
            .unwrap();

        let messages = storage.list_messages("sess-1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_disabled_capability_degrades_quietly() {
        let pool = memory_pool().await.unwrap();
        sqlx::query("DROP TABLE chat_messages")
            .execute(&pool)
            .await
            .unwrap();
        let caps = StorageCapabilities::probe(&pool).await.unwrap();
        let storage = ChatStorage::new(pool, caps);

        assert!(!storage.is_enabled());
        assert_eq!(
            storage
                .insert_message(&message(ChatRole::User, "Hola"))
                .await
                .unwrap(),
            None
        );
        assert!(storage.list_messages("sess-1").await.unwrap().is_empty());
    }
}
