// ABOUTME: Proposal (cotización) generation for Backstage
// ABOUTME: Prices a quote, stores the frozen snapshot, and renders the branded PDF

pub mod error;
pub mod render;
pub mod storage;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use backstage_core::constants::PROPOSAL_VALIDITY_DAYS;
use backstage_pricing::{compute_quote, Catalog, QuoteRequest};

pub use error::{ProposalError, ProposalResult};
pub use render::{render_proposal, Brand, ProposalDocument, RenderError};
pub use storage::ProposalStorage;
pub use types::{ClientInfo, InvalidProposalState, Proposal, ProposalPayload, ProposalState};

/// A stored proposal together with its rendered document
#[derive(Debug)]
pub struct GeneratedProposal {
    pub proposal: Proposal,
    pub pdf: Vec<u8>,
}

/// Ties pricing, persistence, and rendering together
pub struct ProposalService {
    catalog: Arc<Catalog>,
    brand: Brand,
    storage: ProposalStorage,
}

impl ProposalService {
    pub fn new(catalog: Arc<Catalog>, brand: Brand, storage: ProposalStorage) -> Self {
        Self {
            catalog,
            brand,
            storage,
        }
    }

    pub fn storage(&self) -> &ProposalStorage {
        &self.storage
    }

    pub fn brand(&self) -> &Brand {
        &self.brand
    }

    /// Price `request`, assign the next number, and render the PDF.
    /// Nothing is stored when pricing or rendering fails.
    pub async fn generate(
        &self,
        request: QuoteRequest,
        cliente: ClientInfo,
        notas: Option<String>,
        now: DateTime<Utc>,
    ) -> ProposalResult<GeneratedProposal> {
        if cliente.nombre.trim().is_empty() {
            return Err(ProposalError::MissingClientName);
        }

        let totals = compute_quote(&self.catalog, &request)?;
        let payload = ProposalPayload {
            request,
            totals,
            cliente,
            notas,
        };

        let brand = &self.brand;
        let (proposal, pdf) = self
            .storage
            .create_rendered(&payload, now, |proposal| {
                render_payload(proposal, &payload, brand)
            })
            .await?;

        info!(
            numero = %proposal.numero,
            bytes = pdf.len(),
            "Generated proposal document"
        );
        Ok(GeneratedProposal { proposal, pdf })
    }

    /// Re-render a stored proposal from its frozen payload; prices are not recomputed
    pub async fn regenerate(&self, id: &str) -> ProposalResult<GeneratedProposal> {
        let proposal = self.storage.get_proposal(id).await?;
        let payload = proposal
            .decode_payload()
            .map_err(|source| ProposalError::CorruptPayload {
                id: proposal.id.clone(),
                source,
            })?;

        let pdf = render_payload(&proposal, &payload, &self.brand)?;
        Ok(GeneratedProposal { proposal, pdf })
    }
}

fn render_payload(
    proposal: &Proposal,
    payload: &ProposalPayload,
    brand: &Brand,
) -> Result<Vec<u8>, RenderError> {
    let document = ProposalDocument {
        numero: &proposal.numero,
        fecha: proposal.created_at.date_naive(),
        validez_dias: PROPOSAL_VALIDITY_DAYS,
        cliente: &payload.cliente,
        totals: &payload.totals,
        notas: payload.notas.as_deref(),
    };
    render_proposal(&document, brand)
}
