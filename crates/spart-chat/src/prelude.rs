//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, Answer, AskRequest, AssembledReply, AssistantClient, Attachment, ClientConfig,
    ClientError, Completion, Conversation, Narrator, ReplyEvent, ReplyFailure, ReplyStream,
    SpeechSynthesizer, Turn, Typewriter, Utterance,
};
