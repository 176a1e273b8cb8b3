// ABOUTME: HTTP request handler for client-data synchronization
// ABOUTME: Credentials in the body override the project's stored configuration

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::info;

use backstage_core::require_non_empty;
use backstage_monitoring::SyncCredentials;

use crate::cancel::request_cancellation;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::response::ok;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncClientDataRequest {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub client_api_url: Option<String>,
    #[serde(default)]
    pub client_api_key: Option<String>,
}

pub async fn sync_client_data(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SyncClientDataRequest>,
) -> ApiResult<impl IntoResponse> {
    let project_id = require_non_empty("project_id", &request.project_id, 100)?;
    if let Some(url) = request.client_api_url.as_deref().filter(|u| !u.trim().is_empty()) {
        backstage_monitoring::validate_http_url("client_api_url", url)?;
    }
    info!(project_id = %project_id, "Syncing client data");

    let (cancel, _guard) = request_cancellation();
    let credentials = SyncCredentials {
        client_api_url: request.client_api_url,
        client_api_key: request.client_api_key,
    };

    let outcome = state.sync.sync(&project_id, credentials, &cancel).await?;
    Ok(ok(outcome))
}
