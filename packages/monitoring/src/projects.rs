// ABOUTME: Tenant project records and their SQLite storage
// ABOUTME: Projects carry client API credentials and a generated telemetry key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, SqliteConnection, SqlitePool};
use tracing::debug;

use backstage_core::{generate_id, generate_secret, require_non_empty, ValidationError};
use backstage_storage::{StorageError, StorageResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub client_api_url: Option<String>,
    /// Shared secret for the client deployment; never leaves the backend
    #[serde(skip_serializing, default)]
    pub client_api_key: Option<String>,
    pub telemetry_api_key: String,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub main_store_id: Option<String>,
    pub logo_url: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn has_client_api_key(&self) -> bool {
        self.client_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectCreateInput {
    pub name: String,
    #[serde(default)]
    pub client_api_url: Option<String>,
    #[serde(default)]
    pub client_api_key: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl ProjectCreateInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name, 200)?;
        if let Some(url) = self.client_api_url.as_deref().filter(|u| !u.trim().is_empty()) {
            validate_http_url("client_api_url", url)?;
        }
        Ok(())
    }
}

/// Reject anything that is not an absolute http(s) URL
pub fn validate_http_url(field: &str, value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::Invalid {
            field: field.to_string(),
            message: "must be an absolute http(s) URL".to_string(),
        }),
    }
}

/// Project fields derived from a successful client sync
#[derive(Debug, Clone, Default)]
pub(crate) struct SyncMetadata {
    pub owner: Option<(String, String)>,
    pub main_store_id: Option<String>,
    pub logo_url: Option<String>,
    pub client_api_url: Option<String>,
    pub client_api_key: Option<String>,
}

pub struct ProjectStorage {
    pool: SqlitePool,
}

impl ProjectStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_project(&self, input: ProjectCreateInput) -> StorageResult<Project> {
        let id = generate_id("proj");
        let now = Utc::now();
        debug!("Creating project: {} ({})", input.name, id);

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, name, client_api_url, client_api_key, telemetry_api_key,
                logo_url, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(input.name.trim())
        .bind(non_blank(input.client_api_url))
        .bind(non_blank(input.client_api_key))
        .bind(generate_secret())
        .bind(non_blank(input.logo_url))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        self.get_project(&id).await
    }

    pub async fn get_project(&self, id: &str) -> StorageResult<Project> {
        debug!("Fetching project: {}", id);

        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?
            .ok_or_else(|| StorageError::NotFound(format!("Project {}", id)))?;

        row_to_project(&row)
    }

    pub async fn list_projects(&self) -> StorageResult<Vec<Project>> {
        let rows = sqlx::query("SELECT * FROM projects ORDER BY name COLLATE NOCASE, id")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_project).collect()
    }

    /// Resolve the project that owns a telemetry key
    pub async fn find_by_telemetry_key(&self, key: &str) -> StorageResult<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE telemetry_api_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        row.as_ref().map(row_to_project).transpose()
    }

    /// Replace the client API URL and/or key; `None` leaves a field untouched
    pub async fn update_sync_config(
        &self,
        id: &str,
        client_api_url: Option<String>,
        client_api_key: Option<String>,
    ) -> StorageResult<Project> {
        debug!("Updating sync configuration for project: {}", id);

        let metadata = SyncMetadata {
            client_api_url,
            client_api_key,
            ..SyncMetadata::default()
        };
        let mut conn = self.pool.acquire().await.map_err(StorageError::Sqlx)?;
        write_project_metadata(&mut conn, id, &metadata, None).await?;
        drop(conn);

        self.get_project(id).await
    }
}

/// Apply sync-derived fields in one UPDATE; errors with NotFound when the project is gone
pub(crate) async fn write_project_metadata(
    conn: &mut SqliteConnection,
    id: &str,
    metadata: &SyncMetadata,
    synced_at: Option<DateTime<Utc>>,
) -> StorageResult<()> {
    let mut query_builder = QueryBuilder::new("UPDATE projects SET updated_at = ");
    query_builder.push_bind(Utc::now());

    if let Some((name, email)) = &metadata.owner {
        query_builder.push(", owner_name = ");
        query_builder.push_bind(name);
        query_builder.push(", owner_email = ");
        query_builder.push_bind(email);
    }
    if let Some(store_id) = &metadata.main_store_id {
        query_builder.push(", main_store_id = ");
        query_builder.push_bind(store_id);
    }
    if let Some(logo) = &metadata.logo_url {
        query_builder.push(", logo_url = ");
        query_builder.push_bind(logo);
    }
    if let Some(url) = metadata.client_api_url.as_deref().filter(|v| !v.trim().is_empty()) {
        query_builder.push(", client_api_url = ");
        query_builder.push_bind(url.trim());
    }
    if let Some(key) = metadata.client_api_key.as_deref().filter(|v| !v.trim().is_empty()) {
        query_builder.push(", client_api_key = ");
        query_builder.push_bind(key.trim());
    }
    if let Some(at) = synced_at {
        query_builder.push(", last_synced_at = ");
        query_builder.push_bind(at);
    }

    query_builder.push(" WHERE id = ");
    query_builder.push_bind(id);

    let result = query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(StorageError::Sqlx)?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound(format!("Project {}", id)));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn row_to_project(row: &SqliteRow) -> StorageResult<Project> {
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        client_api_url: row.try_get("client_api_url")?,
        client_api_key: row.try_get("client_api_key")?,
        telemetry_api_key: row.try_get("telemetry_api_key")?,
        owner_name: row.try_get("owner_name")?,
        owner_email: row.try_get("owner_email")?,
        main_store_id: row.try_get("main_store_id")?,
        logo_url: row.try_get("logo_url")?,
        last_synced_at: row.try_get("last_synced_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
