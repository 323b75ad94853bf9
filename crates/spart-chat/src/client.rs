use std::sync::Arc;

use tracing::debug;

use crate::backend::{AskRequest, AssistantBackend, HttpBackend};
use crate::config::ClientConfig;
use crate::content::{Answer, AssembledReply, ServiceStatus};
use crate::errors::ClientError;
use crate::run::ReplyStream;

const DEFAULT_STREAM_BUFFER_CAPACITY: usize = 128;

/// Entry point for asking the assistant questions.
#[derive(Clone)]
pub struct AssistantClient {
    backend: Arc<dyn AssistantBackend>,
    stream_buffer_capacity: usize,
}

impl AssistantClient {
    /// Creates a client over any backend implementation.
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self {
            backend,
            stream_buffer_capacity: DEFAULT_STREAM_BUFFER_CAPACITY,
        }
    }

    /// Creates a client talking HTTP to the configured backend.
    pub fn http(config: ClientConfig) -> Result<Self, ClientError> {
        let capacity = config.stream_buffer_capacity;
        let backend = HttpBackend::new(config)?;
        Ok(Self::new(Arc::new(backend)).stream_buffer_capacity(capacity))
    }

    /// Creates an HTTP client from `SPART_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::http(ClientConfig::from_env()?)
    }

    /// Sets the bounded event buffer size for new reply streams.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    /// Opens a streaming reply.
    ///
    /// Transport failures (network error, non-success status) are returned
    /// here, before any reply exists.
    pub async fn ask_stream(&self, req: AskRequest) -> Result<ReplyStream, ClientError> {
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        let request_id = uuid::Uuid::new_v4();
        let session_id = req.session_id.clone();
        debug!(request_id = %request_id, has_session = session_id.is_some(), "starting reply stream");
        let bytes = self.backend.open_reply_stream(req).await?;
        Ok(ReplyStream::spawn(
            request_id,
            session_id,
            bytes,
            self.stream_buffer_capacity,
        ))
    }

    /// Streams a reply to completion and returns it.
    pub async fn collect_reply(&self, req: AskRequest) -> Result<AssembledReply, ClientError> {
        self.ask_stream(req).await?.finish().await
    }

    /// Asks through the non-streaming endpoint.
    pub async fn ask(&self, req: AskRequest) -> Result<Answer, ClientError> {
        self.backend.ask(req).await
    }

    pub async fn status(&self) -> Result<ServiceStatus, ClientError> {
        self.backend.status().await
    }
}
