//! Incremental assembly of one streamed assistant reply.
//!
//! The assembler is fed raw transport chunks in order and turns them into
//! [`ReplyUpdate`]s plus a final [`AssembledReply`]:
//!
//! ```text
//! Idle ──push_chunk──▶ Streaming ──done:true──▶ Completed
//!                          │
//!                          └──end_stream──▶ Ended
//! ```
//!
//! Both terminal states produce the same reply shape; only
//! [`AssembledReply::completion`] tells them apart.

use tracing::debug;

use crate::content::{AssembledReply, Attachment, Completion};
use crate::decoder::{LineDecoder, data_payload, is_done_token};

/// JSON payload carried on a `data:` line.
#[derive(Debug, Default, serde::Deserialize)]
struct EventPayload {
    content: Option<String>,
    session_id: Option<String>,
    done: Option<bool>,
    imagens: Option<Vec<Attachment>>,
    similaridade: Option<f64>,
}

/// Lifecycle of a [`ReplyAssembler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblerState {
    /// No chunk has been pushed yet.
    Idle,
    /// At least one chunk was pushed and no terminal signal was seen.
    Streaming,
    /// The backend flagged the reply as done.
    Completed,
    /// The transport closed without a completion flag.
    Ended,
}

impl AssemblerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Ended)
    }
}

/// Changes produced while applying one chunk.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyUpdate {
    /// Text fragment appended to the reply.
    Text { delta: String },
    /// The backend reported a session identifier.
    SessionId(String),
    /// The backend flagged the reply as complete.
    Completed,
}

/// Stateful decoder for a single reply stream.
#[derive(Debug)]
pub struct ReplyAssembler {
    decoder: LineDecoder,
    state: AssemblerState,
    text: String,
    session_id: Option<String>,
    attachments: Vec<Attachment>,
    similarity: Option<f64>,
    skipped_events: usize,
}

impl Default for ReplyAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyAssembler {
    pub fn new() -> Self {
        Self {
            decoder: LineDecoder::default(),
            state: AssemblerState::Idle,
            text: String::new(),
            session_id: None,
            attachments: Vec::new(),
            similarity: None,
            skipped_events: 0,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Number of `data:` lines dropped because their JSON did not parse.
    pub fn skipped_events(&self) -> usize {
        self.skipped_events
    }

    /// Applies one transport chunk.
    ///
    /// Once the reply is terminal further chunks are accepted and discarded so
    /// the caller can keep draining the transport.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<ReplyUpdate> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        self.state = AssemblerState::Streaming;
        let lines = self.decoder.push_chunk(chunk);
        self.apply_lines(lines)
    }

    /// Signals transport end-of-stream.
    ///
    /// Flushes any buffered bytes, applies a final unterminated line and moves
    /// to `Ended` unless the reply was already completed.
    pub fn end_stream(&mut self) -> Vec<ReplyUpdate> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        let lines = self.decoder.finish();
        let updates = self.apply_lines(lines);
        if self.state != AssemblerState::Completed {
            self.state = AssemblerState::Ended;
        }
        updates
    }

    /// Consumes the assembler and returns the final reply.
    ///
    /// An assembler that never saw end-of-stream is ended first.
    pub fn into_reply(mut self) -> AssembledReply {
        let _ = self.end_stream();
        let completion = match self.state {
            AssemblerState::Completed => Completion::Flagged,
            _ => Completion::EndOfStream,
        };
        AssembledReply {
            text: self.text,
            session_id: self.session_id,
            attachments: self.attachments,
            similarity: self.similarity,
            completion,
        }
    }

    fn apply_lines(&mut self, lines: Vec<String>) -> Vec<ReplyUpdate> {
        let mut updates = Vec::new();
        for line in lines {
            if self.state == AssemblerState::Completed {
                break;
            }
            let Some(payload) = data_payload(&line) else {
                continue;
            };
            // [DONE] only ends the current batch; later chunks are still read.
            if is_done_token(payload) {
                debug!("reply stream sent done token");
                break;
            }
            match serde_json::from_str::<EventPayload>(payload) {
                Ok(event) => self.apply_event(event, &mut updates),
                Err(e) => {
                    self.skipped_events += 1;
                    debug!(error = %e, "skipping malformed reply event");
                }
            }
        }
        updates
    }

    fn apply_event(&mut self, event: EventPayload, updates: &mut Vec<ReplyUpdate>) {
        if let Some(delta) = event.content.filter(|c| !c.is_empty()) {
            self.text.push_str(&delta);
            updates.push(ReplyUpdate::Text { delta });
        }
        if let Some(session_id) = event.session_id.filter(|s| !s.trim().is_empty()) {
            self.session_id = Some(session_id.clone());
            updates.push(ReplyUpdate::SessionId(session_id));
        }
        if event.done == Some(true) {
            self.attachments = event.imagens.unwrap_or_default();
            self.similarity = event.similaridade;
            self.state = AssemblerState::Completed;
            updates.push(ReplyUpdate::Completed);
        }
    }
}
