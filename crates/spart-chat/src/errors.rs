/// Terminal reply failure sent through `ReplyEvent::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum ReplyFailure {
    /// Network/stream transport failed after the reply stream was opened.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// The runtime detected a protocol or invariant error.
    #[error("protocol failure: {message}")]
    Protocol { message: String },
    /// The reply was cancelled by the caller.
    #[error("reply cancelled")]
    Cancelled,
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input to the request API.
    #[error("validation error: {0}")]
    Validation(String),
    /// Network failure before a reply stream exists.
    #[error("transport error: {0}")]
    Transport(String),
    /// Backend answered with a non-success HTTP status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// Backend response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// Terminal failure returned from a started reply.
    #[error(transparent)]
    RunFailed(ReplyFailure),
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns true when the error happened at the transport layer, either
    /// before streaming started or while reading the stream.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Status { .. }
                | Self::RunFailed(ReplyFailure::Transport { .. })
        )
    }
}

impl From<ReplyFailure> for ClientError {
    fn from(value: ReplyFailure) -> Self {
        ClientError::RunFailed(value)
    }
}

/// Errors reported by a speech synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    /// No speech engine is available on this host.
    #[error("speech synthesis unavailable: {0}")]
    Unavailable(String),
    /// The speech engine could not be started.
    #[error("failed to start speech engine: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification_covers_pre_and_mid_stream_failures() {
        assert!(ClientError::Transport("refused".into()).is_transport());
        assert!(
            ClientError::Status {
                status: 502,
                body: "bad gateway".into()
            }
            .is_transport()
        );
        assert!(
            ClientError::from(ReplyFailure::Transport {
                message: "reset".into()
            })
            .is_transport()
        );
        assert!(!ClientError::from(ReplyFailure::Cancelled).is_transport());
        assert!(!ClientError::Validation("empty".into()).is_transport());
    }

    #[test]
    fn status_error_message_includes_code_and_body() {
        let err = ClientError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "backend returned status 500: boom");
    }
}
