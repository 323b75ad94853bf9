use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::assembler::{ReplyAssembler, ReplyUpdate};
use crate::backend::ByteStream;
use crate::content::AssembledReply;
use crate::errors::{ClientError, ReplyFailure};
use crate::stream::ReplyEvent;

/// Handle used to request cancellation of a streaming reply.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The transport read is dropped, partial text is discarded and the
    /// stream ends with `ReplyEvent::Failed` carrying `ReplyFailure::Cancelled`.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Streaming handle returned by `AssistantClient::ask_stream`.
///
/// Use `next_event()` to render text as it arrives and `finish()` to obtain
/// the final reply after the terminal event.
pub struct ReplyStream {
    request_id: uuid::Uuid,
    rx: mpsc::Receiver<ReplyEvent>,
    final_rx: oneshot::Receiver<Result<AssembledReply, ClientError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl ReplyStream {
    /// Spawns the read loop over an already opened transport stream.
    pub(crate) fn spawn(
        request_id: uuid::Uuid,
        session_id: Option<String>,
        bytes: ByteStream,
        buffer_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);
        tokio::spawn(run_task(
            request_id, session_id, bytes, tx, final_tx, abort_rx,
        ));
        Self {
            request_id,
            rx,
            final_rx,
            abort_handle: AbortHandle { tx: abort_tx },
            saw_terminal: false,
        }
    }

    pub fn request_id(&self) -> uuid::Uuid {
        self.request_id
    }

    /// Returns a handle that can cancel the reply.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next event.
    ///
    /// Returns `None` after the channel is closed.
    pub async fn next_event(&mut self) -> Option<ReplyEvent> {
        let event = self.rx.recv().await;
        if event.as_ref().is_some_and(ReplyEvent::is_terminal) {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the final reply.
    ///
    /// Safe to call after consuming events manually with `next_event()`.
    pub async fn finish(mut self) -> Result<AssembledReply, ClientError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(event) if event.is_terminal() => self.saw_terminal = true,
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::protocol_msg(format!(
                "reply task ended without final result (request={})",
                self.request_id
            ))),
        }
    }
}

enum Outcome {
    Finished,
    Failed(ReplyFailure),
    ReceiverDropped,
}

async fn run_task(
    request_id: uuid::Uuid,
    session_id: Option<String>,
    mut bytes: ByteStream,
    tx: mpsc::Sender<ReplyEvent>,
    final_tx: oneshot::Sender<Result<AssembledReply, ClientError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    if !send_event(
        &tx,
        ReplyEvent::Started {
            request_id,
            session_id,
        },
    )
    .await
    {
        let _ = final_tx.send(Err(ClientError::protocol_msg(
            "reply stream receiver dropped before Started",
        )));
        return;
    }

    let mut assembler = ReplyAssembler::new();
    let mut forwarder = Forwarder {
        request_id,
        tx: &tx,
        seq: 0,
        text: String::new(),
    };
    let mut abort_open = true;
    let outcome = loop {
        tokio::select! {
            changed = abort_rx.changed(), if abort_open => {
                match changed {
                    Ok(()) if *abort_rx.borrow() => break Outcome::Failed(ReplyFailure::Cancelled),
                    Ok(()) => {}
                    Err(_) => abort_open = false,
                }
            }
            next = bytes.next() => {
                match next {
                    Some(Ok(chunk)) => {
                        let updates = assembler.push_chunk(&chunk);
                        if !forwarder.forward(updates).await {
                            break Outcome::ReceiverDropped;
                        }
                        if assembler.state().is_terminal() {
                            break Outcome::Finished;
                        }
                    }
                    Some(Err(err)) => {
                        break Outcome::Failed(ReplyFailure::Transport { message: err.to_string() });
                    }
                    None => {
                        let updates = assembler.end_stream();
                        if !forwarder.forward(updates).await {
                            break Outcome::ReceiverDropped;
                        }
                        break Outcome::Finished;
                    }
                }
            }
        }
    };

    match outcome {
        Outcome::Finished => {
            let reply = assembler.into_reply();
            debug!(
                request_id = %request_id,
                chars = reply.text.chars().count(),
                attachments = reply.attachments.len(),
                completion = ?reply.completion,
                "reply finished"
            );
            let sent = send_event(
                &tx,
                ReplyEvent::Completed {
                    request_id,
                    reply: reply.clone(),
                },
            )
            .await;
            let _ = final_tx.send(if sent {
                Ok(reply)
            } else {
                Err(ClientError::protocol_msg(
                    "reply stream receiver dropped before completion",
                ))
            });
        }
        Outcome::Failed(failure) => {
            debug!(request_id = %request_id, error = %failure, "reply failed");
            let _ = send_event(
                &tx,
                ReplyEvent::Failed {
                    request_id,
                    error: failure.clone(),
                },
            )
            .await;
            let _ = final_tx.send(Err(ClientError::RunFailed(failure)));
        }
        Outcome::ReceiverDropped => {
            let _ = final_tx.send(Err(ClientError::protocol_msg(
                "reply stream receiver dropped during output",
            )));
        }
    }
}

struct Forwarder<'a> {
    request_id: uuid::Uuid,
    tx: &'a mpsc::Sender<ReplyEvent>,
    seq: u64,
    text: String,
}

impl Forwarder<'_> {
    async fn forward(&mut self, updates: Vec<ReplyUpdate>) -> bool {
        for update in updates {
            let event = match update {
                ReplyUpdate::Text { delta } => {
                    self.text.push_str(&delta);
                    debug!(request_id = %self.request_id, seq = self.seq, "reply text delta");
                    let event = ReplyEvent::TextDelta {
                        request_id: self.request_id,
                        seq: self.seq,
                        delta,
                        text: self.text.clone(),
                    };
                    self.seq = self.seq.saturating_add(1);
                    event
                }
                ReplyUpdate::SessionId(session_id) => ReplyEvent::SessionUpdated {
                    request_id: self.request_id,
                    session_id,
                },
                ReplyUpdate::Completed => continue,
            };
            if !send_event(self.tx, event).await {
                return false;
            }
        }
        true
    }
}

async fn send_event(tx: &mpsc::Sender<ReplyEvent>, event: ReplyEvent) -> bool {
    tx.send(event).await.is_ok()
}
