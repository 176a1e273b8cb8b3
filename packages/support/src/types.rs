// ABOUTME: Ticket, comment, and chat message types
// ABOUTME: Includes the ticket workflow states and the transition policy that governs them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use backstage_core::{require_non_empty, validate_email, ValidationError};

/// Workflow states in their natural order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketState {
    Created,
    Replicating,
    Adjusting,
    Testing,
    Deploying,
    Resolved,
}

impl TicketState {
    pub const ALL: [TicketState; 6] = [
        TicketState::Created,
        TicketState::Replicating,
        TicketState::Adjusting,
        TicketState::Testing,
        TicketState::Deploying,
        TicketState::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Created => "created",
            TicketState::Replicating => "replicating",
            TicketState::Adjusting => "adjusting",
            TicketState::Testing => "testing",
            TicketState::Deploying => "deploying",
            TicketState::Resolved => "resolved",
        }
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| ValidationError::Invalid {
                field: "estado".to_string(),
                message: format!("unknown state '{}'", s),
            })
    }
}

/// Which state changes a ticket update may make
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any state may move to any other
    #[default]
    Free,
    /// Only later states, plus reopening a resolved ticket back to `created`
    Forward,
}

impl TransitionPolicy {
    pub fn allows(&self, from: TicketState, to: TicketState) -> bool {
        if from == to {
            return true;
        }
        match self {
            TransitionPolicy::Free => true,
            TransitionPolicy::Forward => {
                to > from || (from == TicketState::Resolved && to == TicketState::Created)
            }
        }
    }

    /// Every state reachable from `from` in one update
    pub fn allowed_from(&self, from: TicketState) -> Vec<TicketState> {
        TicketState::ALL
            .into_iter()
            .filter(|to| *to != from && self.allows(from, *to))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
        TicketPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ValidationError::Invalid {
                field: "prioridad".to_string(),
                message: format!("unknown priority '{}'", s),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub numero: i64,
    pub titulo: String,
    pub descripcion: String,
    pub estado: TicketState,
    pub prioridad: TicketPriority,
    pub creado_por_nombre: String,
    pub creado_por_email: Option<String>,
    pub proyecto_id: Option<String>,
    pub screenshot_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketCreateInput {
    #[serde(default)]
    pub titulo: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub creado_por_nombre: String,
    #[serde(default)]
    pub creado_por_email: Option<String>,
    #[serde(default)]
    pub proyecto_id: Option<String>,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub prioridad: Option<TicketPriority>,
}

impl TicketCreateInput {
    /// Trimmed copy with required fields checked and the email normalized
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let creado_por_email = match self.creado_por_email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => Some(validate_email("creado_por_email", email)?),
            _ => None,
        };

        Ok(Self {
            titulo: require_non_empty("titulo", &self.titulo, 200)?,
            descripcion: require_non_empty("descripcion", &self.descripcion, 10_000)?,
            creado_por_nombre: require_non_empty("creado_por_nombre", &self.creado_por_nombre, 200)?,
            creado_por_email,
            proyecto_id: non_blank(&self.proyecto_id),
            screenshot_url: non_blank(&self.screenshot_url),
            prioridad: self.prioridad,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketFilter {
    pub email: Option<String>,
    pub estado: Option<TicketState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketComment {
    pub id: String,
    pub ticket_id: String,
    pub mensaje: String,
    pub autor_nombre: String,
    pub es_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentCreateInput {
    #[serde(default)]
    pub mensaje: String,
    #[serde(default)]
    pub autor_nombre: String,
    #[serde(default)]
    pub es_admin: bool,
}

impl CommentCreateInput {
    pub fn validated(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            mensaje: require_non_empty("mensaje", &self.mensaje, 10_000)?,
            autor_nombre: require_non_empty("autor_nombre", &self.autor_nombre, 200)?,
            es_admin: self.es_admin,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    Agent,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Agent => "agent",
        }
    }
}

impl FromStr for ChatRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            "agent" => Ok(ChatRole::Agent),
            other => Err(ValidationError::Invalid {
                field: "role".to_string(),
                message: format!("unknown role '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub ticket_id: Option<String>,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageInput {
    pub session_id: String,
    #[serde(default)]
    pub ticket_id: Option<String>,
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessageInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("session_id", &self.session_id, 200)?;
        require_non_empty("content", &self.content, 20_000)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TicketState::Created, TicketState::Testing, true)]
    #[case(TicketState::Testing, TicketState::Replicating, false)]
    #[case(TicketState::Resolved, TicketState::Created, true)]
    #[case(TicketState::Resolved, TicketState::Deploying, false)]
    #[case(TicketState::Deploying, TicketState::Deploying, true)]
    fn test_forward_policy(#[case] from: TicketState, #[case] to: TicketState, #[case] allowed: bool) {
        assert_eq!(TransitionPolicy::Forward.allows(from, to), allowed);
        assert!(TransitionPolicy::Free.allows(from, to));
    }

    #[test]
    fn test_allowed_from_lists_targets() {
        assert_eq!(
            TransitionPolicy::Forward.allowed_from(TicketState::Deploying),
            vec![TicketState::Resolved]
        );
        assert_eq!(
            TransitionPolicy::Forward.allowed_from(TicketState::Resolved),
            vec![TicketState::Created]
        );
        assert_eq!(TransitionPolicy::Free.allowed_from(TicketState::Created).len(), 5);
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!("Testing".parse::<TicketState>().unwrap(), TicketState::Testing);
        assert!("closed".parse::<TicketState>().is_err());
        assert_eq!("urgent".parse::<TicketPriority>().unwrap(), TicketPriority::Urgent);
    }

    #[test]
    fn test_ticket_input_validation() {
        let input = TicketCreateInput {
            titulo: " No imprime boletas ".to_string(),
            descripcion: "La impresora no responde".to_string(),
            creado_por_nombre: "Luis".to_string(),
            creado_por_email: Some(" Luis@Tienda.CL ".to_string()),
            proyecto_id: Some("  ".to_string()),
            ..Default::default()
        };
        let valid = input.validated().unwrap();
        assert_eq!(valid.titulo, "No imprime boletas");
        assert_eq!(valid.creado_por_email.as_deref(), Some("luis@tienda.cl"));
        assert_eq!(valid.proyecto_id, None);

        let missing = TicketCreateInput {
            descripcion: "x".to_string(),
            creado_por_nombre: "Luis".to_string(),
            ..Default::default()
        };
        assert_eq!(
            missing.validated().unwrap_err(),
            ValidationError::Required("titulo".to_string())
        );
    }
}
