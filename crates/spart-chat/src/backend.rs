use std::pin::Pin;

use futures::TryStreamExt as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::content::{Answer, ServiceStatus};
use crate::errors::ClientError;

/// Raw reply bytes as delivered by the transport.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ClientError>> + Send + 'static>>;

/// Question sent to the assistant backend.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct AskRequest {
    #[serde(rename = "pergunta")]
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl AskRequest {
    /// Builds a request from user input, rejecting blank questions.
    pub fn new(question: impl Into<String>) -> Result<Self, ClientError> {
        let question = question.into();
        let question = question.trim();
        if question.is_empty() {
            return Err(ClientError::Validation("question must not be empty".into()));
        }
        Ok(Self {
            question: question.to_string(),
            session_id: None,
        })
    }

    /// Attaches a session identifier from an earlier turn.
    pub fn session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id.filter(|s| !s.trim().is_empty());
        self
    }
}

/// Backend contract used by the client.
///
/// Failures returned from these methods happen before any reply exists.
#[async_trait::async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Opens the SSE reply stream for a question.
    async fn open_reply_stream(&self, req: AskRequest) -> Result<ByteStream, ClientError>;

    /// Asks a question and waits for the complete answer.
    async fn ask(&self, req: AskRequest) -> Result<Answer, ClientError>;

    /// Queries service health.
    async fn status(&self) -> Result<ServiceStatus, ClientError>;
}

/// HTTP implementation of [`AssistantBackend`].
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post(&self, url: String, req: &AskRequest) -> Result<reqwest::Response, ClientError> {
        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("request to {url} failed: {e}")))?;
        check_status(response).await
    }
}

#[async_trait::async_trait]
impl AssistantBackend for HttpBackend {
    async fn open_reply_stream(&self, req: AskRequest) -> Result<ByteStream, ClientError> {
        let url = self.config.stream_url();
        debug!(url = %url, has_session = req.session_id.is_some(), "opening reply stream");
        let response = self.post(url, &req).await?;
        let stream = response
            .bytes_stream()
            .map_err(|e| ClientError::Transport(format!("reply stream read failed: {e}")));
        Ok(Box::pin(stream))
    }

    async fn ask(&self, req: AskRequest) -> Result<Answer, ClientError> {
        let url = self.config.ask_url();
        debug!(url = %url, has_session = req.session_id.is_some(), "asking without streaming");
        let response = self.post(url, &req).await?;
        response
            .json::<Answer>()
            .await
            .map_err(|e| ClientError::Decode(format!("invalid answer body: {e}")))
    }

    async fn status(&self) -> Result<ServiceStatus, ClientError> {
        let url = self.config.status_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("request to {url} failed: {e}")))?;
        check_status(response)
            .await?
            .json::<ServiceStatus>()
            .await
            .map_err(|e| ClientError::Decode(format!("invalid status body: {e}")))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_backend_field_names() {
        let req = AskRequest::new("  Como faço backup?  ")
            .expect("request")
            .session_id(Some("abc".into()));
        let body = serde_json::to_value(&req).expect("json");
        assert_eq!(
            body,
            serde_json::json!({"pergunta": "Como faço backup?", "session_id": "abc"})
        );
    }

    #[test]
    fn session_id_is_omitted_when_absent_or_blank() {
        let req = AskRequest::new("oi")
            .expect("request")
            .session_id(Some("  ".into()));
        let body = serde_json::to_value(&req).expect("json");
        assert_eq!(body, serde_json::json!({"pergunta": "oi"}));
    }

    #[test]
    fn blank_question_is_rejected() {
        let err = AskRequest::new("   ").expect_err("blank");
        assert!(matches!(err, ClientError::Validation(msg) if msg.contains("question")));
    }

    #[test]
    fn http_backend_rejects_empty_base_url() {
        let result = HttpBackend::new(ClientConfig::new(" "));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
