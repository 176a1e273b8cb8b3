// ABOUTME: HTTP API layer for Backstage providing REST endpoints and routing
// ABOUTME: Integration layer that depends on all domain packages

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};

use backstage_core::constants::MAX_UPLOAD_BYTES;

pub mod cancel;
pub mod chat_handlers;
pub mod cotizaciones_handlers;
pub mod error;
pub mod extract;
pub mod health_handlers;
pub mod projects_handlers;
pub mod response;
pub mod state;
pub mod sync_handlers;
pub mod telemetry_handlers;
pub mod tickets_handlers;
pub mod uploads_handlers;

pub use error::{ApiResult, AppError};
pub use response::ApiResponse;
pub use state::{ApiSettings, AppState};

/// Room for multipart framing around a maximum-size file
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Creates the tickets API router (nested under /api/tickets)
pub fn create_tickets_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(tickets_handlers::list_tickets).post(tickets_handlers::create_ticket),
        )
        .route(
            "/{id}",
            get(tickets_handlers::get_ticket).patch(tickets_handlers::update_ticket),
        )
        .route(
            "/{id}/comments",
            get(tickets_handlers::list_comments).post(tickets_handlers::add_comment),
        )
}

/// Creates the chat API router (nested under /api/chat)
pub fn create_chat_router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(chat_handlers::post_message))
        .route("/{session_id}/messages", get(chat_handlers::list_messages))
}

/// Creates the quotes API router (nested under /api/cotizaciones)
pub fn create_cotizaciones_router() -> Router<AppState> {
    Router::new()
        .route("/", get(cotizaciones_handlers::list_quotes))
        .route("/catalog", get(cotizaciones_handlers::get_catalog))
        .route("/preview", post(cotizaciones_handlers::preview_quote))
        .route("/generar", post(cotizaciones_handlers::generate_quote))
        .route(
            "/{id}",
            get(cotizaciones_handlers::get_quote).patch(cotizaciones_handlers::update_quote),
        )
        .route("/{id}/pdf", get(cotizaciones_handlers::get_quote_pdf))
}

/// Creates the monitoring API router (nested under /api/backstage/projects)
pub fn create_projects_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(projects_handlers::list_projects).post(projects_handlers::create_project),
        )
        .route(
            "/{id}",
            get(projects_handlers::get_project).patch(projects_handlers::update_sync_config),
        )
        .route("/{id}/health", get(projects_handlers::check_project_health))
        .route("/{id}/health/history", get(projects_handlers::health_history))
        .route("/{id}/activities", get(projects_handlers::project_activities))
        .route("/{id}/telemetry", get(projects_handlers::project_telemetry))
}

/// Creates the uploads API router (nested under /api/uploads)
pub fn create_uploads_router() -> Router<AppState> {
    Router::new()
        .route("/{namespace}", post(uploads_handlers::upload_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES))
}

/// Full application router with state applied
pub fn create_router(state: AppState) -> Router {
    // Stored files are only ever rendered as images, never as documents
    let uploads = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; sandbox"),
        ))
        .service(ServeDir::new(&state.settings.upload_dir));

    let api = Router::new()
        .route("/health", get(health_handlers::health_check))
        .route("/config", get(health_handlers::get_config))
        .route("/store/sync-client-data", post(sync_handlers::sync_client_data))
        .nest("/tickets", create_tickets_router())
        .nest("/chat", create_chat_router())
        .nest("/cotizaciones", create_cotizaciones_router())
        .nest("/backstage/projects", create_projects_router())
        .nest("/uploads", create_uploads_router());

    Router::new()
        .nest("/api", api)
        .route("/v1/telemetry", post(telemetry_handlers::ingest_event))
        .nest_service("/uploads", uploads)
        .with_state(state)
}
