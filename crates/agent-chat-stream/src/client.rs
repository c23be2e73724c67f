use std::sync::Arc;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::model::ChatRequest;
use crate::session::ChatStream;
use crate::transport::{HttpTransport, StreamTransport};

/// Entry point for starting chat streams.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn StreamTransport>,
}

impl ChatClient {
    /// Starts a builder for configuring a `ChatClient`.
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::default()
    }

    /// Creates an HTTP client configured from the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::builder().config(ClientConfig::from_env()?).build()
    }

    /// Validates the request and returns an active session.
    ///
    /// The request is sent on the first `next_event()` call, so the session
    /// can be cancelled before it even connects.
    pub fn start_stream(&self, request: ChatRequest) -> Result<ChatStream, ClientError> {
        validate_request(&request)?;
        let transport = self.transport.clone();
        Ok(ChatStream::new(Box::pin(async move {
            transport.open(request).await
        })))
    }
}

fn validate_request(request: &ChatRequest) -> Result<(), ClientError> {
    if request.message.trim().is_empty() {
        return Err(ClientError::Validation("message must not be empty".into()));
    }
    if request.agent_type.as_str().trim().is_empty() {
        return Err(ClientError::Validation(
            "agent type must not be empty".into(),
        ));
    }
    Ok(())
}

/// Builder used to pick the transport of a `ChatClient`.
#[derive(Default)]
pub struct ChatClientBuilder {
    config: Option<ClientConfig>,
    transport: Option<Arc<dyn StreamTransport>>,
}

impl ChatClientBuilder {
    /// Uses an HTTP transport with this configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses a custom transport. Takes precedence over `config`.
    pub fn transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<ChatClient, ClientError> {
        let transport = match (self.transport, self.config) {
            (Some(transport), _) => transport,
            (None, Some(config)) => Arc::new(HttpTransport::new(config)?),
            (None, None) => Arc::new(HttpTransport::new(ClientConfig::default())?),
        };
        Ok(ChatClient { transport })
    }
}
