// ABOUTME: Service liveness and browser-safe configuration endpoints
// ABOUTME: The config endpoint exposes only the restricted key and storage capabilities

use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;

use crate::response::ok;
use crate::state::AppState;

#[derive(Serialize)]
struct ServiceHealth {
    status: &'static str,
    timestamp: i64,
    version: &'static str,
    service: &'static str,
}

pub async fn health_check() -> impl IntoResponse {
    ok(ServiceHealth {
        status: "healthy",
        timestamp: Utc::now().timestamp(),
        version: env!("CARGO_PKG_VERSION"),
        service: "backstage",
    })
}

#[derive(Serialize)]
struct PublicConfig {
    public_key: Option<String>,
    chat_transcripts: bool,
    strict_ticket_transitions: bool,
}

pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    ok(PublicConfig {
        public_key: state.settings.public_key.clone(),
        chat_transcripts: state.capabilities.chat_transcripts,
        strict_ticket_transitions: state.settings.transition_policy
            == backstage_support::TransitionPolicy::Forward,
    })
}
