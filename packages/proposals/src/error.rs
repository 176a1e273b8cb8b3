use thiserror::Error;

use backstage_pricing::PricingError;
use backstage_storage::StorageError;

use crate::render::RenderError;
use crate::types::InvalidProposalState;

#[derive(Error, Debug)]
pub enum ProposalError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    InvalidState(#[from] InvalidProposalState),

    #[error("Stored payload for proposal {id} is unreadable: {source}")]
    CorruptPayload {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Client name is required")]
    MissingClientName,
}

pub type ProposalResult<T> = Result<T, ProposalError>;
