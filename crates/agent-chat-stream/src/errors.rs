/// Terminal failure of a streaming session.
///
/// Every variant ends the session; `user_message` is what the consumer shows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum StreamFailure {
    /// The request could not be sent (connection refused, DNS, TLS, ...).
    #[error("stream request failed: {message}")]
    Transport { message: String },
    /// The server answered the stream request with a non-success status.
    #[error("stream request failed with HTTP status {status}")]
    Status { status: u16 },
    /// Reading the response body failed after the stream was opened.
    #[error("failed to read stream body: {message}")]
    Read { message: String },
    /// The server sent an `error` frame.
    #[error("{message}")]
    Server { message: String },
    /// The body ended without a `complete` or `error` frame.
    #[error("stream closed before completion")]
    Incomplete,
}

impl StreamFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Text carried by the `Failed` event for this failure.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the failure was reported by the server rather than the transport.
    pub fn is_server_reported(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}

/// A single malformed frame. Never terminal: the frame is dropped and the
/// stream continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is not valid JSON: {message}")]
    Json { message: String },
    #[error("frame payload has no string `type` discriminator")]
    MissingType,
    #[error("invalid `{kind}` frame: {message}")]
    InvalidPayload { kind: String, message: String },
}

/// Errors returned by the client API outside a running stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// Server answered with a non-success status.
    #[error("request failed with HTTP status {status}: {message}")]
    Status { status: u16, message: String },
    /// Response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_failure_surfaces_server_message_verbatim() {
        let failure = StreamFailure::server("model overloaded");
        assert_eq!(failure.user_message(), "model overloaded");
        assert!(failure.is_server_reported());
    }

    #[test]
    fn transport_failures_have_generic_messages() {
        assert_eq!(
            StreamFailure::Status { status: 502 }.user_message(),
            "stream request failed with HTTP status 502"
        );
        assert_eq!(
            StreamFailure::Incomplete.user_message(),
            "stream closed before completion"
        );
        assert!(!StreamFailure::read("reset").is_server_reported());
    }
}
