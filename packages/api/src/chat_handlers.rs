// ABOUTME: HTTP request handlers for chat transcripts
// ABOUTME: Persistence is best effort: failures are logged and the widget still gets a success

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::warn;

use backstage_support::{ChatMessageInput, SupportError};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::response::{created, ok};
use crate::state::AppState;

#[derive(Serialize)]
struct StoredMessage {
    id: Option<String>,
}

pub async fn post_message(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ChatMessageInput>,
) -> ApiResult<impl IntoResponse> {
    let id = match state.chat.insert_message(&input).await {
        Ok(id) => id,
        Err(SupportError::Validation(e)) => return Err(e.into()),
        Err(e) => {
            warn!(session_id = %input.session_id, error = %e, "Failed to persist chat message");
            None
        }
    };

    Ok(created(StoredMessage { id }))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let messages = state.chat.list_messages(&session_id).await?;
    Ok(ok(messages))
}
