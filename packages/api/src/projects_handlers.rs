// ABOUTME: HTTP request handlers for tenant projects
// ABOUTME: Fleet overview, sync config, live health checks, history, activities proxy, and telemetry feed

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use backstage_core::constants::SERVICE_KEY_HEADER;
use backstage_monitoring::{validate_http_url, HealthSample, Project, ProjectCreateInput};

use crate::cancel::request_cancellation;
use crate::error::{ApiResult, AppError};
use crate::extract::ApiJson;
use crate::response::{created, ok};
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const DEFAULT_TELEMETRY_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// A project as returned to the dashboard; the client key itself is never serialized
#[derive(Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub has_client_api_key: bool,
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        Self {
            has_client_api_key: project.has_client_api_key(),
            project,
        }
    }
}

#[derive(Serialize)]
pub struct ProjectOverview {
    #[serde(flatten)]
    pub project: ProjectView,
    pub latest_health: Option<HealthSample>,
}

/// Every project with its most recent health sample
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let projects = state.projects.list_projects().await?;
    let mut latest: HashMap<String, HealthSample> = state
        .health
        .storage()
        .latest_for_all()
        .await?
        .into_iter()
        .map(|sample| (sample.project_id.clone(), sample))
        .collect();

    let overview: Vec<ProjectOverview> = projects
        .into_iter()
        .map(|project| ProjectOverview {
            latest_health: latest.remove(&project.id),
            project: project.into(),
        })
        .collect();
    Ok(ok(overview))
}

pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ProjectCreateInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;
    info!("Creating project '{}'", input.name.trim());

    let project = state.projects.create_project(input).await?;
    Ok(created(ProjectView::from(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project = state.projects.get_project(&id).await?;
    Ok(ok(ProjectView::from(project)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSyncConfigRequest {
    #[serde(default)]
    pub client_api_url: Option<String>,
    #[serde(default)]
    pub client_api_key: Option<String>,
}

/// Replace the stored client API URL and/or key; omitted fields are kept
pub async fn update_sync_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<UpdateSyncConfigRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(service_key) = &state.settings.service_key {
        let presented = headers
            .get(SERVICE_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !service_key.matches(presented) {
            return Err(AppError::Unauthorized);
        }
    }

    let client_api_url = request
        .client_api_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());
    let client_api_key = request
        .client_api_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());

    if client_api_url.is_none() && client_api_key.is_none() {
        return Err(AppError::validation("client_api_url or client_api_key is required"));
    }
    if let Some(url) = client_api_url.as_deref() {
        validate_http_url("client_api_url", url)?;
    }
    info!(project_id = %id, "Updating client API configuration");

    let project = state
        .projects
        .update_sync_config(&id, client_api_url, client_api_key)
        .await?;
    Ok(ok(ProjectView::from(project)))
}

/// Live check; the sample is persisted before responding
pub async fn check_project_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project = state.projects.get_project(&id).await?;
    let (cancel, _guard) = request_cancellation();

    let result = state.health.check_and_record(&project, &cancel).await;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub async fn health_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    state.projects.get_project(&id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_LIMIT);

    let history = state.health.storage().history(&id, limit).await?;
    Ok(ok(history))
}

/// Proxy the project's own activity log
pub async fn project_activities(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project = state.projects.get_project(&id).await?;
    let (cancel, _guard) = request_cancellation();

    let activities = state
        .activities_proxy
        .fetch_activities(&project, &cancel)
        .await?;
    Ok(ok(activities))
}

/// Events pushed through the telemetry endpoint
pub async fn project_telemetry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    state.projects.get_project(&id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_TELEMETRY_LIMIT).clamp(1, MAX_LIMIT);

    let events = state.activities.list_for_project(&id, limit).await?;
    Ok(ok(events))
}
