// ABOUTME: Error type for ticket, comment, and chat operations
// ABOUTME: Separates caller mistakes (validation, disallowed transitions) from storage failures

use thiserror::Error;

use backstage_core::ValidationError;
use backstage_storage::StorageError;

use crate::types::TicketState;

#[derive(Error, Debug)]
pub enum SupportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Cannot move ticket from {from} to {to}")]
    InvalidTransition { from: TicketState, to: TicketState },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for SupportError {
    fn from(err: sqlx::Error) -> Self {
        SupportError::Storage(StorageError::Sqlx(err))
    }
}

pub type SupportResult<T> = Result<T, SupportError>;
