// ABOUTME: HTTP request handlers for support tickets and their comments
// ABOUTME: State changes go through the configured transition policy

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use backstage_support::{
    CommentCreateInput, Ticket, TicketCreateInput, TicketFilter, TicketPriority, TicketState,
    TransitionPolicy,
};

use crate::error::{ApiResult, AppError};
use crate::extract::ApiJson;
use crate::response::{created, ok};
use crate::state::AppState;

/// Create a ticket in state `created`
pub async fn create_ticket(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TicketCreateInput>,
) -> ApiResult<impl IntoResponse> {
    info!("Creating ticket '{}'", input.titulo.trim());

    let ticket = state.tickets.create_ticket(&input).await?;
    Ok(created(ticket))
}

#[derive(Debug, Deserialize)]
pub struct TicketListQuery {
    pub email: Option<String>,
    pub estado: Option<String>,
}

/// List tickets, optionally by requester email and state
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<TicketListQuery>,
) -> ApiResult<impl IntoResponse> {
    let estado = query
        .estado
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::parse::<TicketState>)
        .transpose()?;

    let filter = TicketFilter {
        email: query.email,
        estado,
    };
    let tickets = state.tickets.list_tickets(&filter).await?;
    Ok(ok(tickets))
}

/// A ticket plus the states the configured policy lets it move to next
#[derive(Debug, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub transiciones_permitidas: Vec<TicketState>,
}

impl TicketDetail {
    fn new(ticket: Ticket, policy: TransitionPolicy) -> Self {
        let transiciones_permitidas = policy.allowed_from(ticket.estado);
        Self {
            ticket,
            transiciones_permitidas,
        }
    }
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let ticket = state.tickets.get_ticket(&id).await?;
    Ok(ok(TicketDetail::new(ticket, state.settings.transition_policy)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub estado: Option<String>,
    pub prioridad: Option<String>,
}

/// Change state and/or priority
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateTicketRequest>,
) -> ApiResult<impl IntoResponse> {
    let estado = request.estado.as_deref().map(str::parse::<TicketState>).transpose()?;
    let prioridad = request
        .prioridad
        .as_deref()
        .map(str::parse::<TicketPriority>)
        .transpose()?;

    if estado.is_none() && prioridad.is_none() {
        return Err(AppError::validation("estado or prioridad is required"));
    }
    info!(ticket_id = %id, ?estado, ?prioridad, "Updating ticket");

    let mut ticket = state.tickets.get_ticket(&id).await?;
    if let Some(estado) = estado {
        ticket = state
            .tickets
            .transition(&id, estado, state.settings.transition_policy)
            .await?;
    }
    if let Some(prioridad) = prioridad {
        ticket = state.tickets.set_priority(&id, prioridad).await?;
    }

    Ok(ok(TicketDetail::new(ticket, state.settings.transition_policy)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let comments = state.comments.list_comments(&id).await?;
    Ok(ok(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CommentCreateInput>,
) -> ApiResult<impl IntoResponse> {
    info!(ticket_id = %id, es_admin = input.es_admin, "Adding ticket comment");

    let comment = state.comments.add_comment(&id, &input).await?;
    Ok(created(comment))
}
