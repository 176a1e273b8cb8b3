// ABOUTME: Project activity feed: live proxy to the client deployment and ingested telemetry
// ABOUTME: Telemetry events are stored per project; the proxy returns the remote JSON array

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use backstage_core::{generate_id, require_non_empty, ValidationError};
use backstage_storage::{StorageError, StorageResult};

use crate::client::{ClientApi, ClientApiError, ClientEndpoint};
use crate::projects::Project;

pub const ACTIVITIES_PATH: &str = "/api/backstage/activities";

/// Live read of the project's own activity log
pub struct ActivitiesProxy {
    api: ClientApi,
    timeout: Duration,
}

impl ActivitiesProxy {
    pub fn new(api: ClientApi, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    /// Returns the remote array as-is once it is confirmed to be a list of objects.
    /// Also accepts `{"activities": [...]}`.
    pub async fn fetch_activities(
        &self,
        project: &Project,
        cancel: &CancellationToken,
    ) -> Result<Vec<serde_json::Value>, ClientApiError> {
        let endpoint = ClientEndpoint::resolve(
            project.client_api_url.as_deref(),
            project.client_api_key.as_deref(),
        )?;
        let body = self
            .api
            .get(&endpoint, ACTIVITIES_PATH, self.timeout, cancel)
            .await?;

        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| ClientApiError::InvalidPayload(e.to_string()))?;
        let items = match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => match map.remove("activities") {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    return Err(ClientApiError::InvalidPayload(
                        "expected an array of activities".to_string(),
                    ))
                }
            },
            _ => {
                return Err(ClientApiError::InvalidPayload(
                    "expected an array of activities".to_string(),
                ))
            }
        };

        if let Some(index) = items.iter().position(|item| !item.is_object()) {
            return Err(ClientApiError::InvalidPayload(format!(
                "activity {} is not an object",
                index
            )));
        }

        debug!(project_id = %project.id, count = items.len(), "Fetched remote activities");
        Ok(items)
    }
}

/// Body of a telemetry push
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl TelemetryEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("event_type", &self.event_type, 100)?;
        if let Some(description) = &self.description {
            if description.chars().count() > 2000 {
                return Err(ValidationError::TooLong {
                    field: "description".to_string(),
                    max: 2000,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub project_id: String,
    pub event_type: String,
    pub description: Option<String>,
    pub user_email: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub struct ActivityStorage {
    pool: SqlitePool,
}

impl ActivityStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, project_id: &str, event: TelemetryEvent) -> StorageResult<Activity> {
        let now = Utc::now();
        let activity = Activity {
            id: generate_id("act"),
            project_id: project_id.to_string(),
            event_type: event.event_type.trim().to_string(),
            description: event.description,
            user_email: event.user_email.map(|e| e.trim().to_lowercase()),
            metadata: event.metadata,
            occurred_at: event.occurred_at.unwrap_or(now),
            created_at: now,
        };
        debug!(
            "Recording {} activity for project: {}",
            activity.event_type, project_id
        );

        let metadata = activity
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO project_activities (
                id, project_id, event_type, description, user_email, metadata,
                occurred_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&activity.id)
        .bind(&activity.project_id)
        .bind(&activity.event_type)
        .bind(&activity.description)
        .bind(&activity.user_email)
        .bind(metadata)
        .bind(activity.occurred_at)
        .bind(activity.created_at)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(activity)
    }

    /// Newest events first
    pub async fn list_for_project(&self, project_id: &str, limit: i64) -> StorageResult<Vec<Activity>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM project_activities
            WHERE project_id = ?
            ORDER BY occurred_at DESC, created_at DESC
            LIMIT ?
            "#,
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_activity).collect()
    }
}

fn row_to_activity(row: &SqliteRow) -> StorageResult<Activity> {
    let metadata: Option<String> = row.try_get("metadata")?;
    Ok(Activity {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        event_type: row.try_get("event_type")?,
        description: row.try_get("description")?,
        user_email: row.try_get("user_email")?,
        metadata: metadata.as_deref().map(serde_json::from_str::<serde_json::Value>).transpose()?,
        occurred_at: row.try_get("occurred_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::{ProjectCreateInput, ProjectStorage};
    use backstage_storage::memory_pool;
    use chrono::TimeZone;

    #[test]
    fn test_event_type_is_required() {
        let event = TelemetryEvent::default();
        assert_eq!(
            event.validate(),
            Err(ValidationError::Required("event_type".to_string()))
        );
    }

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let pool = memory_pool().await.unwrap();
        let project = ProjectStorage::new(pool.clone())
            .create_project(ProjectCreateInput {
                name: "Demo".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let storage = ActivityStorage::new(pool);

        storage
            .record(
                &project.id,
                TelemetryEvent {
                    event_type: "sale.created".to_string(),
                    metadata: Some(serde_json::json!({"total": 15990})),
                    occurred_at: Some(Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        storage
            .record(
                &project.id,
                TelemetryEvent {
                    event_type: "user.login".to_string(),
                    user_email: Some(" Ana@Tienda.CL ".to_string()),
                    occurred_at: Some(Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let events = storage.list_for_project(&project.id, 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "user.login");
        assert_eq!(events[0].user_email.as_deref(), Some("ana@tienda.cl"));
        assert_eq!(events[1].metadata, Some(serde_json::json!({"total": 15990})));
    }
}
