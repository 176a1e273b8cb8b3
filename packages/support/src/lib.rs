// ABOUTME: Support desk for Backstage
// ABOUTME: Tickets with a fixed workflow, requester/admin comments, and chat transcripts

pub mod chat;
pub mod comments;
pub mod error;
pub mod tickets;
pub mod types;

pub use chat::ChatStorage;
pub use comments::CommentStorage;
pub use error::{SupportError, SupportResult};
pub use tickets::TicketStorage;
pub use types::{
    ChatMessage, ChatMessageInput, ChatRole, CommentCreateInput, Ticket, TicketComment,
    TicketCreateInput, TicketFilter, TicketPriority, TicketState, TransitionPolicy,
};
