use crate::content::AssembledReply;
use crate::errors::ReplyFailure;

/// Events emitted by a `ReplyStream`.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyEvent {
    /// First event for every reply.
    Started {
        request_id: uuid::Uuid,
        session_id: Option<String>,
    },
    /// Text appended to the reply.
    TextDelta {
        request_id: uuid::Uuid,
        seq: u64,
        delta: String,
        /// Whole reply text after this delta.
        text: String,
    },
    /// The backend assigned or changed the session identifier.
    SessionUpdated {
        request_id: uuid::Uuid,
        session_id: String,
    },
    /// Terminal success event, sent for both explicit completion and
    /// end-of-stream.
    Completed {
        request_id: uuid::Uuid,
        reply: AssembledReply,
    },
    /// Terminal failure event.
    Failed {
        request_id: uuid::Uuid,
        error: ReplyFailure,
    },
}

impl ReplyEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    pub fn request_id(&self) -> uuid::Uuid {
        match self {
            Self::Started { request_id, .. }
            | Self::TextDelta { request_id, .. }
            | Self::SessionUpdated { request_id, .. }
            | Self::Completed { request_id, .. }
            | Self::Failed { request_id, .. } => *request_id,
        }
    }
}
