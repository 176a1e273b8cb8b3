// ABOUTME: Liveness checks for client deployments and their append-only sample log
// ABOUTME: A check never errors; every outcome is classified into status and reason

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use backstage_storage::{StorageError, StorageResult};

use crate::projects::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Active,
    Inactive,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Active => "active",
            HealthStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthReason {
    NoUrl,
    Timeout,
    ConnectionFailed,
    BadResponse,
}

impl HealthReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthReason::NoUrl => "no_url",
            HealthReason::Timeout => "timeout",
            HealthReason::ConnectionFailed => "connection_failed",
            HealthReason::BadResponse => "bad_response",
        }
    }
}

impl fmt::Display for HealthReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(HealthStatus::Active),
            "inactive" => Ok(HealthStatus::Inactive),
            other => Err(StorageError::Database(format!("unknown health status '{}'", other))),
        }
    }
}

impl FromStr for HealthReason {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_url" => Ok(HealthReason::NoUrl),
            "timeout" => Ok(HealthReason::Timeout),
            "connection_failed" => Ok(HealthReason::ConnectionFailed),
            "bad_response" => Ok(HealthReason::BadResponse),
            other => Err(StorageError::Database(format!("unknown health reason '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<HealthReason>,
    /// Set whenever a response arrived, even an unhealthy one
    pub latency_ms: Option<u64>,
}

impl HealthCheckResult {
    pub fn active(latency_ms: u64) -> Self {
        Self {
            status: HealthStatus::Active,
            reason: None,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn inactive(reason: HealthReason, latency_ms: Option<u64>) -> Self {
        Self {
            status: HealthStatus::Inactive,
            reason: Some(reason),
            latency_ms,
        }
    }
}

/// Issues one bounded GET per check
#[derive(Debug, Clone)]
pub struct HealthChecker {
    client: reqwest::Client,
    timeout: Duration,
}

impl HealthChecker {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `url`. Cancellation through `cancel` is reported like a timeout.
    pub async fn check(&self, url: Option<&str>, cancel: &CancellationToken) -> HealthCheckResult {
        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            return HealthCheckResult::inactive(HealthReason::NoUrl, None);
        };

        let started = Instant::now();
        let request = self.client.get(url).send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Health check for {} cancelled", url);
                return HealthCheckResult::inactive(HealthReason::Timeout, None);
            }
            outcome = tokio::time::timeout(self.timeout, request) => outcome,
        };

        match response {
            Err(_elapsed) => HealthCheckResult::inactive(HealthReason::Timeout, None),
            Ok(Err(e)) if e.is_timeout() => HealthCheckResult::inactive(HealthReason::Timeout, None),
            Ok(Err(e)) => {
                debug!("Health check for {} failed: {}", url, e);
                HealthCheckResult::inactive(HealthReason::ConnectionFailed, None)
            }
            Ok(Ok(resp)) => {
                let latency = started.elapsed().as_millis() as u64;
                let code = resp.status().as_u16();
                if (200..400).contains(&code) {
                    HealthCheckResult::active(latency)
                } else {
                    HealthCheckResult::inactive(HealthReason::BadResponse, Some(latency))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSample {
    pub id: i64,
    pub project_id: String,
    pub checked_at: DateTime<Utc>,
    pub status: HealthStatus,
    pub reason: Option<HealthReason>,
    pub latency_ms: Option<i64>,
}

pub struct HealthStorage {
    pool: SqlitePool,
}

impl HealthStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        project_id: &str,
        result: &HealthCheckResult,
        checked_at: DateTime<Utc>,
    ) -> StorageResult<HealthSample> {
        debug!("Recording health sample for project: {}", project_id);

        let id = sqlx::query(
            r#"
            INSERT INTO project_health_checks (project_id, checked_at, status, latency_ms, reason)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(project_id)
        .bind(checked_at)
        .bind(result.status.as_str())
        .bind(result.latency_ms.map(|ms| ms as i64))
        .bind(result.reason.map(|r| r.as_str()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?
        .last_insert_rowid();

        Ok(HealthSample {
            id,
            project_id: project_id.to_string(),
            checked_at,
            status: result.status,
            reason: result.reason,
            latency_ms: result.latency_ms.map(|ms| ms as i64),
        })
    }

    /// Most recent samples first
    pub async fn history(&self, project_id: &str, limit: i64) -> StorageResult<Vec<HealthSample>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM project_health_checks
            WHERE project_id = ?
            ORDER BY checked_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_sample).collect()
    }

    /// Latest sample per project, for the fleet overview
    pub async fn latest_for_all(&self) -> StorageResult<Vec<HealthSample>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM project_health_checks
            WHERE id IN (SELECT MAX(id) FROM project_health_checks GROUP BY project_id)
            ORDER BY project_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        rows.iter().map(row_to_sample).collect()
    }
}

fn row_to_sample(row: &SqliteRow) -> StorageResult<HealthSample> {
    let status: String = row.try_get("status")?;
    let reason: Option<String> = row.try_get("reason")?;

    Ok(HealthSample {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        checked_at: row.try_get("checked_at")?,
        status: status.parse()?,
        reason: reason.as_deref().map(str::parse::<HealthReason>).transpose()?,
        latency_ms: row.try_get("latency_ms")?,
    })
}

/// Runs a check and always appends its sample
pub struct HealthMonitor {
    checker: HealthChecker,
    storage: HealthStorage,
}

impl HealthMonitor {
    pub fn new(checker: HealthChecker, storage: HealthStorage) -> Self {
        Self { checker, storage }
    }

    pub fn storage(&self) -> &HealthStorage {
        &self.storage
    }

    /// Persistence is best effort: a failed insert is logged and the result still returned
    pub async fn check_and_record(
        &self,
        project: &Project,
        cancel: &CancellationToken,
    ) -> HealthCheckResult {
        let result = self
            .checker
            .check(project.client_api_url.as_deref(), cancel)
            .await;

        if let Err(e) = self.storage.record(&project.id, &result, Utc::now()).await {
            warn!(
                project_id = %project.id,
                error = %e,
                "Failed to persist health sample"
            );
        }

        debug!(
            project_id = %project.id,
            status = result.status.as_str(),
            reason = result.reason.map(|r| r.as_str()),
            latency_ms = result.latency_ms,
            "Health check completed"
        );
        result
    }
}
