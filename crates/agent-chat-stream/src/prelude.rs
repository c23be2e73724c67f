//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, AgentApi, AgentType, ChatClient, ChatRequest, ChatStream, ClientConfig,
    ClientError, CompletedContent, ConversationId, Outcome, RenderState, SessionState,
    StreamController, StreamEvent, StreamFailure, StreamObserver,
};
