// ABOUTME: HTTP request handlers for quotes (cotizaciones)
// ABOUTME: Catalog, live preview, PDF generation, listing, regeneration, and state updates

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use backstage_core::constants::QUOTE_NUMBER_HEADER;
use backstage_pricing::{compute_quote, QuoteRequest};
use backstage_proposals::{ClientInfo, GeneratedProposal, ProposalState};

use crate::error::{ApiResult, AppError};
use crate::extract::ApiJson;
use crate::response::ok;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

pub async fn get_catalog(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.catalog.as_ref().clone())
}

/// Price a request without storing anything
pub async fn preview_quote(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<QuoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let totals = compute_quote(&state.catalog, &request)?;
    Ok(ok(totals))
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuoteRequest {
    #[serde(flatten)]
    pub request: QuoteRequest,
    pub cliente: ClientInfo,
    #[serde(default)]
    pub notas: Option<String>,
}

/// Store a numbered proposal and return its PDF
pub async fn generate_quote(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<GenerateQuoteRequest>,
) -> ApiResult<Response> {
    info!(
        sistema_base = %body.request.sistema_base_id,
        modulos = body.request.modulos_ids.len(),
        "Generating quote"
    );

    let generated = state
        .proposals
        .generate(body.request, body.cliente, body.notas, Utc::now())
        .await?;
    Ok(pdf_response(generated))
}

#[derive(Debug, Deserialize)]
pub struct ProposalListQuery {
    pub estado: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Query(query): Query<ProposalListQuery>,
) -> ApiResult<impl IntoResponse> {
    let estado = query
        .estado
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::parse::<ProposalState>)
        .transpose()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let proposals = state
        .proposals
        .storage()
        .list_proposals(estado, limit, offset)
        .await?;
    Ok(ok(proposals))
}

pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let proposal = state.proposals.storage().get_proposal(&id).await?;
    Ok(ok(proposal))
}

/// Re-render the PDF from the stored payload
pub async fn get_quote_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let generated = state.proposals.regenerate(&id).await?;
    Ok(pdf_response(generated))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuoteRequest {
    pub estado: String,
}

pub async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateQuoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let estado: ProposalState = request
        .estado
        .parse()
        .map_err(|e: backstage_proposals::InvalidProposalState| AppError::validation(e.to_string()))?;
    info!(proposal_id = %id, estado = %estado, "Updating quote state");

    let proposal = state
        .proposals
        .storage()
        .update_state(&id, estado, Utc::now())
        .await?;
    Ok(ok(proposal))
}

fn pdf_response(generated: GeneratedProposal) -> Response {
    let numero = generated.proposal.numero;
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.pdf\"", numero),
            ),
            (header::HeaderName::from_static(QUOTE_NUMBER_HEADER), numero),
        ],
        generated.pdf,
    )
        .into_response()
}
