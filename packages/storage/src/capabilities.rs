// ABOUTME: Startup probe for optional storage features
// ABOUTME: Replaces error-text matching with an explicit flag per optional table

use serde::Serialize;
use sqlx::SqlitePool;

use crate::StorageResult;

/// Optional tables that may not be provisioned on every deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageCapabilities {
    pub chat_transcripts: bool,
}

impl StorageCapabilities {
    /// Inspect the schema once; the result is stored on the shared handle
    pub async fn probe(pool: &SqlitePool) -> StorageResult<Self> {
        Ok(Self {
            chat_transcripts: table_exists(pool, "chat_messages").await?,
        })
    }

    /// Every optional feature enabled, for wiring tests
    pub fn all() -> Self {
        Self {
            chat_transcripts: true,
        }
    }
}

async fn table_exists(pool: &SqlitePool, table: &str) -> StorageResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_detects_chat_table() {
        let pool = crate::memory_pool().await.unwrap();
        let caps = StorageCapabilities::probe(&pool).await.unwrap();
        assert!(caps.chat_transcripts);

        sqlx::query("DROP TABLE chat_messages")
            .execute(&pool)
            .await
            .unwrap();
        let caps = StorageCapabilities::probe(&pool).await.unwrap();
        assert!(!caps.chat_transcripts);
    }
}
