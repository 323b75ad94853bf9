use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_STREAM_PATH: &str = "api/perguntar/stream/";
const DEFAULT_ASK_PATH: &str = "api/perguntar/";
const DEFAULT_STATUS_PATH: &str = "api/agente/status/";

/// Configuration for the assistant backend client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the assistant backend (for example `http://localhost:8000`).
    pub base_url: String,
    /// Path of the streaming (SSE) question endpoint.
    pub stream_path: String,
    /// Path of the non-streaming question endpoint.
    pub ask_path: String,
    /// Path of the service status endpoint.
    pub status_path: String,
    /// Optional HTTP timeout applied by the transport.
    ///
    /// The reply runtime itself never times out.
    pub timeout: Option<Duration>,
    /// Bounded event buffer size used by the reply channel.
    pub stream_buffer_capacity: usize,
}

impl ClientConfig {
    /// Creates a config for the given backend with default endpoint paths.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            ask_path: DEFAULT_ASK_PATH.to_string(),
            status_path: DEFAULT_STATUS_PATH.to_string(),
            timeout: None,
            stream_buffer_capacity: 128,
        }
    }

    /// Builds a config from `SPART_BASE_URL` and the optional
    /// `SPART_STREAM_PATH`, `SPART_ASK_PATH`, `SPART_STATUS_PATH` and
    /// `SPART_TIMEOUT_SECS` variables.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var("SPART_BASE_URL").unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(ClientError::Config(
                "missing SPART_BASE_URL for assistant backend".into(),
            ));
        }
        Self::new(base_url.trim()).with_env_overrides()
    }

    /// Applies the optional `SPART_*` path and timeout variables on top of
    /// this config.
    pub fn with_env_overrides(mut self) -> Result<Self, ClientError> {
        if let Some(path) = non_empty_env("SPART_STREAM_PATH") {
            self.stream_path = path;
        }
        if let Some(path) = non_empty_env("SPART_ASK_PATH") {
            self.ask_path = path;
        }
        if let Some(path) = non_empty_env("SPART_STATUS_PATH") {
            self.status_path = path;
        }
        if let Some(raw) = non_empty_env("SPART_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                ClientError::Config(format!("SPART_TIMEOUT_SECS must be an integer, got {raw:?}"))
            })?;
            self.timeout = Some(Duration::from_secs(secs));
        }
        Ok(self)
    }

    /// Overrides the streaming endpoint path.
    pub fn stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    /// Overrides the non-streaming endpoint path.
    pub fn ask_path(mut self, path: impl Into<String>) -> Self {
        self.ask_path = path.into();
        self
    }

    /// Overrides the status endpoint path.
    pub fn status_path(mut self, path: impl Into<String>) -> Self {
        self.status_path = path.into();
        self
    }

    /// Sets an HTTP timeout for every request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the bounded buffer size between the reply task and the consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn stream_url(&self) -> String {
        self.join(&self.stream_path)
    }

    pub(crate) fn ask_url(&self) -> String {
        self.join(&self.ask_path)
    }

    pub(crate) fn status_url(&self) -> String {
        self.join(&self.status_path)
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
