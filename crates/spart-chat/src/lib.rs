//! Streaming client for the Spart assistant backend.
//!
//! A question is posted to the backend, which answers with a server-sent-event
//! stream. The stream is assembled incrementally into text plus side payloads
//! (session id, image attachments, completion flag) and surfaced as
//! [`ReplyEvent`]s.
//!
//! # Streaming a reply
//!
//! ```no_run
//! use spart_chat::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = AssistantClient::http(ClientConfig::new("http://localhost:8000"))?;
//! let mut conversation = Conversation::new(client);
//!
//! let mut turn = conversation.ask("Como faço backup?").await?;
//! while let Some(event) = turn.next_event().await {
//!     if let ReplyEvent::TextDelta { delta, .. } = event {
//!         print!("{delta}");
//!     }
//! }
//! let reply = turn.finish().await?;
//! for image in &reply.attachments {
//!     println!("[{}] {}", image.alt_text, image.url);
//! }
//! # Ok(())
//! # }
//! ```

/// Incremental reply assembly state machine.
pub mod assembler;
/// Backend contract and its HTTP implementation.
pub mod backend;
/// Client entry point.
pub mod client;
/// Backend endpoint configuration.
pub mod config;
/// Reply, answer and status types.
pub mod content;
mod decoder;
/// Public error types.
pub mod errors;
/// Common imports for typical usage.
pub mod prelude;
/// Reply stream handle and cancellation handle.
pub mod run;
/// Conversation sessions spanning several turns.
pub mod session;
/// Text-to-speech coordination.
pub mod speech;
/// Reply stream events.
pub mod stream;
/// Character-by-character reveal of answers.
pub mod typewriter;

pub use assembler::{AssemblerState, ReplyAssembler, ReplyUpdate};
pub use backend::{AskRequest, AssistantBackend, ByteStream, HttpBackend};
pub use client::AssistantClient;
pub use config::ClientConfig;
pub use content::{Answer, AssembledReply, Attachment, Completion, ServiceStatus};
pub use errors::{ClientError, ReplyFailure, SpeechError};
pub use run::{AbortHandle, ReplyStream};
pub use session::{Conversation, Turn};
pub use speech::{Narrator, SpeechSynthesizer, Utterance};
pub use stream::ReplyEvent;
pub use typewriter::Typewriter;
