use tracing::debug;

use crate::backend::AskRequest;
use crate::client::AssistantClient;
use crate::content::{Answer, AssembledReply};
use crate::errors::ClientError;
use crate::run::{AbortHandle, ReplyStream};
use crate::stream::ReplyEvent;

/// One conversation with the assistant.
///
/// Owns the backend session identifier so follow-up questions share context.
/// The identifier is kept across turns until [`Conversation::reset`].
pub struct Conversation {
    client: AssistantClient,
    session_id: Option<String>,
}

impl Conversation {
    pub fn new(client: AssistantClient) -> Self {
        Self {
            client,
            session_id: None,
        }
    }

    /// Resumes a conversation with a known session identifier.
    pub fn with_session(client: AssistantClient, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            client,
            session_id: (!session_id.trim().is_empty()).then_some(session_id),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Forgets the session identifier ("clear conversation").
    pub fn reset(&mut self) {
        if let Some(previous) = self.session_id.take() {
            debug!(session_id = %previous, "conversation reset");
        }
    }

    /// Starts a streaming turn.
    ///
    /// The returned [`Turn`] borrows the conversation, so a second question
    /// cannot be submitted while this one is in flight.
    pub async fn ask(&mut self, question: &str) -> Result<Turn<'_>, ClientError> {
        let req = AskRequest::new(question)?.session_id(self.session_id.clone());
        let stream = self.client.ask_stream(req).await?;
        Ok(Turn {
            conversation: self,
            stream,
        })
    }

    /// Asks through the non-streaming endpoint.
    pub async fn ask_blocking(&mut self, question: &str) -> Result<Answer, ClientError> {
        let req = AskRequest::new(question)?.session_id(self.session_id.clone());
        let answer = self.client.ask(req).await?;
        if let Some(session_id) = answer.session_id.clone() {
            self.record_session(session_id);
        }
        Ok(answer)
    }

    fn record_session(&mut self, session_id: String) {
        if session_id.trim().is_empty() {
            return;
        }
        if self.session_id.as_deref() != Some(session_id.as_str()) {
            debug!(session_id = %session_id, "conversation session updated");
            self.session_id = Some(session_id);
        }
    }
}

/// A single in-flight question/answer exchange.
pub struct Turn<'a> {
    conversation: &'a mut Conversation,
    stream: ReplyStream,
}

impl Turn<'_> {
    pub fn abort_handle(&self) -> AbortHandle {
        self.stream.abort_handle()
    }

    /// Returns the next reply event, recording session changes on the
    /// conversation as they arrive.
    pub async fn next_event(&mut self) -> Option<ReplyEvent> {
        let event = self.stream.next_event().await?;
        match &event {
            ReplyEvent::SessionUpdated { session_id, .. } => {
                self.conversation.record_session(session_id.clone());
            }
            ReplyEvent::Completed { reply, .. } => {
                if let Some(session_id) = reply.session_id.clone() {
                    self.conversation.record_session(session_id);
                }
            }
            _ => {}
        }
        Some(event)
    }

    /// Drains the turn and returns the final reply.
    pub async fn finish(self) -> Result<AssembledReply, ClientError> {
        let reply = self.stream.finish().await?;
        if let Some(session_id) = reply.session_id.clone() {
            self.conversation.record_session(session_id);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::testing::ScriptedBackend;

    fn conversation(backend: Arc<ScriptedBackend>) -> Conversation {
        Conversation::new(AssistantClient::new(backend))
    }

    #[tokio::test]
    async fn session_id_is_retained_and_sent_on_next_turn() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            "data: {\"session_id\":\"abc\",\"content\":\"oi\"}\n",
            "data: {\"done\":true}\n",
        ]));
        let mut conversation = conversation(backend.clone());

        let reply = conversation
            .ask("primeira")
            .await
            .expect("turn")
            .finish()
            .await
            .expect("reply");
        assert_eq!(reply.text, "oi");
        assert_eq!(conversation.session_id(), Some("abc"));

        let _ = conversation
            .ask("segunda")
            .await
            .expect("turn")
            .finish()
            .await
            .expect("reply");
        let requests = backend.recorded();
        assert_eq!(requests[0].session_id, None);
        assert_eq!(requests[1].session_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn next_event_records_session_before_completion() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            "data: {\"session_id\":\"s9\"}\n",
        ]));
        let mut conversation = conversation(backend);
        {
            let mut turn = conversation.ask("oi").await.expect("turn");
            while let Some(event) = turn.next_event().await {
                if let ReplyEvent::SessionUpdated { .. } = event {
                    break;
                }
            }
        }
        assert_eq!(conversation.session_id(), Some("s9"));
    }

    #[tokio::test]
    async fn reset_clears_session() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![]));
        let mut conversation =
            Conversation::with_session(AssistantClient::new(backend.clone()), "old");
        assert_eq!(conversation.session_id(), Some("old"));
        conversation.reset();
        assert_eq!(conversation.session_id(), None);

        let _ = conversation
            .ask("oi")
            .await
            .expect("turn")
            .finish()
            .await
            .expect("reply");
        assert_eq!(backend.recorded()[0].session_id, None);
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_backend_call() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![]));
        let mut conversation = conversation(backend.clone());
        let result = conversation.ask("   ").await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(backend.recorded().is_empty());
    }

    #[tokio::test]
    async fn blocking_answer_records_session() {
        let mut backend = ScriptedBackend::streaming(vec![]);
        backend.answer = Answer {
            text: "Resposta".into(),
            session_id: Some("xyz".into()),
            ..Answer::default()
        };
        let mut conversation = conversation(Arc::new(backend));
        let answer = conversation.ask_blocking("oi").await.expect("answer");
        assert_eq!(answer.text, "Resposta");
        assert_eq!(conversation.session_id(), Some("xyz"));
    }

    #[tokio::test]
    async fn empty_session_from_backend_does_not_clear_existing() {
        let backend = Arc::new(ScriptedBackend::streaming(vec![
            "data: {\"session_id\":\"\",\"done\":true}\n",
        ]));
        let mut conversation =
            Conversation::with_session(AssistantClient::new(backend), "keep");
        let _ = conversation
            .ask("oi")
            .await
            .expect("turn")
            .finish()
            .await
            .expect("reply");
        assert_eq!(conversation.session_id(), Some("keep"));
    }
}
