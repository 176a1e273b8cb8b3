// ABOUTME: SQLite persistence for support tickets
// ABOUTME: Sequential display numbers, filtered listing, and policy-checked state transitions

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, info};

use backstage_core::{generate_id, ValidationError};
use backstage_storage::{StorageError, StorageResult};

use crate::error::{SupportError, SupportResult};
use crate::types::{Ticket, TicketCreateInput, TicketFilter, TicketPriority, TicketState, TransitionPolicy};

const SELECT_COLUMNS: &str = "id, numero, titulo, descripcion, estado, prioridad, \
     creado_por_nombre, creado_por_email, proyecto_id, screenshot_url, created_at, updated_at";

pub struct TicketStorage {
    pool: SqlitePool,
}

impl TicketStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Validate and insert a ticket in state `created` with the next `numero`
    pub async fn create_ticket(&self, input: &TicketCreateInput) -> SupportResult<Ticket> {
        let input = input.validated()?;
        if let Some(proyecto_id) = &input.proyecto_id {
            self.ensure_project_exists(proyecto_id).await?;
        }
        let id = generate_id("tkt");
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, numero, titulo, descripcion, estado, prioridad,
                creado_por_nombre, creado_por_email, proyecto_id, screenshot_url,
                created_at, updated_at
            )
            SELECT ?, COALESCE(MAX(numero), 0) + 1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            FROM tickets
            "#,
        )
        .bind(&id)
        .bind(&input.titulo)
        .bind(&input.descripcion)
        .bind(TicketState::Created.as_str())
        .bind(input.prioridad.unwrap_or_default().as_str())
        .bind(&input.creado_por_nombre)
        .bind(&input.creado_por_email)
        .bind(&input.proyecto_id)
        .bind(&input.screenshot_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let ticket = self.get_ticket(&id).await?;
        info!(numero = ticket.numero, "Ticket created");
        Ok(ticket)
    }

    async fn ensure_project_exists(&self, proyecto_id: &str) -> SupportResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?)")
            .bind(proyecto_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(ValidationError::Invalid {
                field: "proyecto_id".to_string(),
                message: format!("project {} does not exist", proyecto_id),
            }
            .into());
        }
        Ok(())
    }

    pub async fn get_ticket(&self, id: &str) -> StorageResult<Ticket> {
        debug!("Fetching ticket: {}", id);

        let sql = format!("SELECT {} FROM tickets WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or_else(|| StorageError::NotFound(format!("Ticket {}", id)))?;

        row_to_ticket(&row)
    }

    /// Most urgent first, then newest
    pub async fn list_tickets(&self, filter: &TicketFilter) -> StorageResult<Vec<Ticket>> {
        debug!(?filter, "Listing tickets");

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM tickets WHERE 1 = 1", SELECT_COLUMNS));

        if let Some(email) = filter.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            query.push(" AND creado_por_email = ");
            query.push_bind(email.to_lowercase());
        }
        if let Some(estado) = filter.estado {
            query.push(" AND estado = ");
            query.push_bind(estado.as_str());
        }

        query.push(
            " ORDER BY CASE prioridad \
             WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END, \
             created_at DESC, numero DESC",
        );

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_ticket).collect()
    }

    /// Move a ticket to `to` if `policy` allows it from the current state
    pub async fn transition(
        &self,
        id: &str,
        to: TicketState,
        policy: TransitionPolicy,
    ) -> SupportResult<Ticket> {
        let current = self.get_ticket(id).await?;
        if !policy.allows(current.estado, to) {
            return Err(SupportError::InvalidTransition {
                from: current.estado,
                to,
            });
        }
        if current.estado == to {
            return Ok(current);
        }

        sqlx::query("UPDATE tickets SET estado = ?, updated_at = ? WHERE id = ?")
            .bind(to.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(numero = current.numero, from = %current.estado, to = %to, "Ticket state changed");
        Ok(self.get_ticket(id).await?)
    }

    pub async fn set_priority(&self, id: &str, prioridad: TicketPriority) -> StorageResult<Ticket> {
        let result = sqlx::query("UPDATE tickets SET prioridad = ?, updated_at = ? WHERE id = ?")
            .bind(prioridad.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Ticket {}", id)));
        }
        self.get_ticket(id).await
    }
}

fn row_to_ticket(row: &SqliteRow) -> StorageResult<Ticket> {
    let estado: String = row.try_get("estado")?;
    let prioridad: String = row.try_get("prioridad")?;

    Ok(Ticket {
        id: row.try_get("id")?,
        numero: row.try_get("numero")?,
        titulo: row.try_get("titulo")?,
        descripcion: row.try_get("descripcion")?,
        estado: estado
            .parse()
            .map_err(|e| StorageError::Database(format!("{}", e)))?,
        prioridad: prioridad
            .parse()
            .map_err(|e| StorageError::Database(format!("{}", e)))?,
        creado_por_nombre: row.try_get("creado_por_nombre")?,
        creado_por_email: row.try_get("creado_por_email")?,
        proyecto_id: row.try_get("proyecto_id")?,
        screenshot_url: row.try_get("screenshot_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
