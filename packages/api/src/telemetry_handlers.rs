// ABOUTME: External telemetry ingestion endpoint
// ABOUTME: Authenticated by the per-project key in the x-api-key header

use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{debug, info};

use backstage_core::constants::TELEMETRY_API_KEY_HEADER;
use backstage_monitoring::TelemetryEvent;

use crate::error::{ApiResult, AppError};
use crate::extract::ApiJson;
use crate::response::created;
use crate::state::AppState;

#[derive(Serialize)]
struct IngestedEvent {
    id: String,
}

pub async fn ingest_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(event): ApiJson<TelemetryEvent>,
) -> ApiResult<impl IntoResponse> {
    let key = headers
        .get(TELEMETRY_API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let Some(project) = state.projects.find_by_telemetry_key(key).await? else {
        debug!("Telemetry rejected: unknown key");
        return Err(AppError::Unauthorized);
    };

    event.validate()?;
    let activity = state.activities.record(&project.id, event).await?;

    info!(project_id = %project.id, event_type = %activity.event_type, "Telemetry event ingested");
    Ok(created(IngestedEvent { id: activity.id }))
}
