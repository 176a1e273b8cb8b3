// ABOUTME: Proposal type definitions
// ABOUTME: Lifecycle state, client contact block, and the frozen pricing payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use backstage_pricing::{QuoteRequest, QuoteTotals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProposalState {
    Sent,
    Viewed,
    Accepted,
    Rejected,
    Expired,
}

impl ProposalState {
    pub const ALL: [ProposalState; 5] = [
        ProposalState::Sent,
        ProposalState::Viewed,
        ProposalState::Accepted,
        ProposalState::Rejected,
        ProposalState::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalState::Sent => "sent",
            ProposalState::Viewed => "viewed",
            ProposalState::Accepted => "accepted",
            ProposalState::Rejected => "rejected",
            ProposalState::Expired => "expired",
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("estado must be one of sent, viewed, accepted, rejected, expired (got '{0}')")]
pub struct InvalidProposalState(pub String);

impl FromStr for ProposalState {
    type Err = InvalidProposalState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| InvalidProposalState(s.to_string()))
    }
}

/// Contact details printed on the proposal
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientInfo {
    pub nombre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empresa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
}

/// Snapshot stored with each proposal so its PDF can be regenerated verbatim
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPayload {
    pub request: QuoteRequest,
    pub totals: QuoteTotals,
    pub cliente: ClientInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notas: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub secuencia: i64,
    pub numero: String,
    pub cliente: ClientInfo,
    pub total: i64,
    pub estado: ProposalState,
    /// Opaque frozen payload; decode with [`Proposal::decode_payload`]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn decode_payload(&self) -> Result<ProposalPayload, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_text() {
        for state in ProposalState::ALL {
            assert_eq!(state.as_str().parse::<ProposalState>().unwrap(), state);
        }
        assert_eq!(" Accepted ".parse::<ProposalState>().unwrap(), ProposalState::Accepted);
    }

    #[test]
    fn test_state_rejects_unknown_value() {
        let err = "archived".parse::<ProposalState>().unwrap_err();
        assert_eq!(err, InvalidProposalState("archived".to_string()));
        assert!(err.to_string().contains("estado must be one of"));
    }
}
