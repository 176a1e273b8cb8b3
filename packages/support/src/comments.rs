// ABOUTME: SQLite persistence for ticket comments
// ABOUTME: Comments are tagged as coming from an admin or from the requester

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

use backstage_core::generate_id;
use backstage_storage::{StorageError, StorageResult};

use crate::error::SupportResult;
use crate::types::{CommentCreateInput, TicketComment};

pub struct CommentStorage {
    pool: SqlitePool,
}

impl CommentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a comment. Fails with `NotFound` when the ticket does not exist.
    pub async fn add_comment(
        &self,
        ticket_id: &str,
        input: &CommentCreateInput,
    ) -> SupportResult<TicketComment> {
        let input = input.validated()?;
        ensure_ticket(&self.pool, ticket_id).await?;

        let comment = TicketComment {
            id: generate_id("cmt"),
            ticket_id: ticket_id.to_string(),
            mensaje: input.mensaje,
            autor_nombre: input.autor_nombre,
            es_admin: input.es_admin,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO ticket_comments (id, ticket_id, mensaje, autor_nombre, es_admin, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.ticket_id)
        .bind(&comment.mensaje)
        .bind(&comment.autor_nombre)
        .bind(comment.es_admin)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        debug!(ticket_id, es_admin = comment.es_admin, "Comment added");
        Ok(comment)
    }

    /// Oldest first. Fails with `NotFound` when the ticket does not exist.
    pub async fn list_comments(&self, ticket_id: &str) -> StorageResult<Vec<TicketComment>> {
        ensure_ticket(&self.pool, ticket_id).await?;

        let rows = sqlx::query(
            "SELECT id, ticket_id, mensaje, autor_nombre, es_admin, created_at \
             FROM ticket_comments WHERE ticket_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_comment).collect()
    }
}

async fn ensure_ticket(pool: &SqlitePool, ticket_id: &str) -> StorageResult<()> {
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE id = ?")
        .bind(ticket_id)
        .fetch_one(pool)
        .await
        .map_err(StorageError::Sqlx)?;

    if exists == 0 {
        return Err(StorageError::NotFound(format!("Ticket {}", ticket_id)));
    }
    Ok(())
}

fn row_to_comment(row: &SqliteRow) -> StorageResult<TicketComment> {
    Ok(TicketComment {
        id: row.try_get("id")?,
        ticket_id: row.try_get("ticket_id")?,
        mensaje: row.try_get("mensaje")?,
        autor_nombre: row.try_get("autor_nombre")?,
        es_admin: row.try_get("es_admin")?,
        created_at: row.try_get("created_at")?,
    })
}
