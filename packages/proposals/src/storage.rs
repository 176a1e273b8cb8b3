// ABOUTME: SQLite persistence for proposals (cotizaciones)
// ABOUTME: Sequence and number are assigned in the same statement that inserts the row

use chrono::{DateTime, Datelike, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use backstage_core::generate_id;
use backstage_storage::{StorageError, StorageResult};

use crate::error::ProposalResult;
use crate::render::RenderError;
use crate::types::{ClientInfo, Proposal, ProposalPayload, ProposalState};

const SELECT_COLUMNS: &str = "id, secuencia, numero, cliente_nombre, cliente_empresa, \
     cliente_email, cliente_telefono, payload, total, estado, created_at, updated_at";

pub struct ProposalStorage {
    pool: SqlitePool,
}

impl ProposalStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a proposal with the next sequence number
    pub async fn create_proposal(
        &self,
        payload: &ProposalPayload,
        now: DateTime<Utc>,
    ) -> StorageResult<Proposal> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        insert_proposal(&mut conn, payload, now).await
    }

    /// Insert a proposal and render its document inside one transaction.
    ///
    /// When `render` fails the transaction is rolled back, so no number is
    /// consumed by a proposal that never produced a PDF.
    pub async fn create_rendered<F>(
        &self,
        payload: &ProposalPayload,
        now: DateTime<Utc>,
        render: F,
    ) -> ProposalResult<(Proposal, Vec<u8>)>
    where
        F: FnOnce(&Proposal) -> Result<Vec<u8>, RenderError>,
    {
        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;
        let proposal = insert_proposal(&mut tx, payload, now).await?;
        let pdf = render(&proposal)?;
        tx.commit().await.map_err(StorageError::Sqlx)?;

        info!(numero = %proposal.numero, total = proposal.total, "Proposal created");
        Ok((proposal, pdf))
    }

    pub async fn get_proposal(&self, id: &str) -> StorageResult<Proposal> {
        debug!("Fetching proposal: {}", id);

        let sql = format!("SELECT {} FROM cotizaciones WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or_else(|| StorageError::NotFound(format!("Proposal {}", id)))?;

        row_to_proposal(&row)
    }

    /// Newest first
    pub async fn list_proposals(
        &self,
        estado: Option<ProposalState>,
        limit: i64,
        offset: i64,
    ) -> StorageResult<Vec<Proposal>> {
        debug!(?estado, limit, offset, "Listing proposals");

        let sql = format!(
            "SELECT {} FROM cotizaciones WHERE (?1 IS NULL OR estado = ?1) \
             ORDER BY secuencia DESC LIMIT ?2 OFFSET ?3",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(estado.map(|s| s.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_proposal).collect()
    }

    pub async fn update_state(
        &self,
        id: &str,
        estado: ProposalState,
        now: DateTime<Utc>,
    ) -> StorageResult<Proposal> {
        debug!("Updating proposal {} to {}", id, estado);

        let result = sqlx::query("UPDATE cotizaciones SET estado = ?, updated_at = ? WHERE id = ?")
            .bind(estado.as_str())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Proposal {}", id)));
        }

        self.get_proposal(id).await
    }
}

async fn insert_proposal(
    conn: &mut SqliteConnection,
    payload: &ProposalPayload,
    now: DateTime<Utc>,
) -> StorageResult<Proposal> {
    let id = generate_id("cot");
    let payload_json = serde_json::to_string(payload)?;
    let cliente = &payload.cliente;

    sqlx::query(
        r#"
        INSERT INTO cotizaciones (
            id, secuencia, numero, cliente_nombre, cliente_empresa, cliente_email,
            cliente_telefono, payload, total, estado, created_at, updated_at
        )
        SELECT ?1, next.seq, 'COT-' || ?2 || '-' || printf('%04d', next.seq),
               ?3, ?4, ?5, ?6, ?7, ?8, 'sent', ?9, ?9
        FROM (SELECT COALESCE(MAX(secuencia), 0) + 1 AS seq FROM cotizaciones) AS next
        "#,
    )
    .bind(&id)
    .bind(now.year().to_string())
    .bind(&cliente.nombre)
    .bind(&cliente.empresa)
    .bind(&cliente.email)
    .bind(&cliente.telefono)
    .bind(&payload_json)
    .bind(payload.totals.total)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(StorageError::Sqlx)?;

    let sql = format!("SELECT {} FROM cotizaciones WHERE id = ?", SELECT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(&id)
        .fetch_one(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?;

    row_to_proposal(&row)
}

fn row_to_proposal(row: &SqliteRow) -> StorageResult<Proposal> {
    let payload: String = row.try_get("payload")?;
    let estado: String = row.try_get("estado")?;
    let estado = estado
        .parse::<ProposalState>()
        .map_err(|e| StorageError::Database(e.to_string()))?;

    Ok(Proposal {
        id: row.try_get("id")?,
        secuencia: row.try_get("secuencia")?,
        numero: row.try_get("numero")?,
        cliente: ClientInfo {
            nombre: row.try_get("cliente_nombre")?,
            empresa: row.try_get("cliente_empresa")?,
            email: row.try_get("cliente_email")?,
            telefono: row.try_get("cliente_telefono")?,
        },
        total: row.try_get("total")?,
        estado,
        payload: serde_json::from_str(&payload)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
