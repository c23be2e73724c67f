use std::pin::Pin;

use futures::StreamExt as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{ClientError, StreamFailure};
use crate::model::ChatRequest;

/// Body of an opened stream: raw byte chunks in arrival order.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, StreamFailure>> + Send + 'static>>;

/// Capability to issue a streaming chat request.
///
/// Implementations resolve once the response head is in; the body is read
/// lazily through the returned [`ByteStream`].
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(&self, request: ChatRequest) -> Result<ByteStream, StreamFailure>;
}

/// HTTP transport posting to the backend's `stream-chat` endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        // Connect timeout only; a stream body stays open until the server closes it.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, request: ChatRequest) -> Result<ByteStream, StreamFailure> {
        let url = self.config.stream_url();
        debug!(%url, agent = %request.agent_type, conversation_id = ?request.conversation_id, "opening chat stream");

        let mut http_req = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request);
        if let Some(cookie) = self.config.session_cookie.as_deref() {
            http_req = http_req.header(reqwest::header::COOKIE, cookie);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| StreamFailure::transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            debug!(%status, %body, "chat stream rejected");
            return Err(StreamFailure::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamFailure::read(e.to_string())));
        Ok(Box::pin(body))
    }
}
