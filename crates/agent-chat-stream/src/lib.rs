//! Streaming client for agent chat backends.
//!
//! A reply is streamed as newline-delimited `data: {"type": .., "data": ..}`
//! frames. [`ChatStream`] decodes them into [`StreamEvent`]s as the body
//! arrives, [`RenderState`] folds those events into what a UI draws, and
//! [`StreamController`] wraps both behind `start_stream` / `stop_stream`.
//!
//! # Streaming a reply
//!
//! ```no_run
//! use agent_chat_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = ChatClient::builder()
//!     .config(ClientConfig::new("http://localhost:8000"))
//!     .build()?;
//!
//! let mut stream = client.start_stream(ChatRequest::new("Hello", "general_qa"))?;
//! let mut view = RenderState::started();
//! while let Some(event) = stream.next_event().await {
//!     view = view.apply(&event);
//!     if let StreamEvent::ContentDelta { text } = &event {
//!         print!("{text}");
//!     }
//! }
//!
//! match stream.finish().await {
//!     Outcome::Completed(content) => println!("\n{}", content.formatted_content),
//!     Outcome::Failed(failure) => eprintln!("\nfailed: {failure}"),
//!     Outcome::Cancelled => {}
//! }
//! # Ok(())
//! # }
//! ```

/// Non-streaming REST endpoints (chat, conversations, agents).
pub mod api;
/// Client entry point and builder.
pub mod client;
/// Client configuration.
pub mod config;
/// Final content of a completed stream.
pub mod content;
/// UI-facing controller and observer callbacks.
pub mod controller;
/// Chunk to line decoding with explicit carry-over.
pub mod decoder;
/// Public error types.
pub mod errors;
/// Agent, conversation and request types.
pub mod model;
/// Logging setup.
pub mod observability;
/// Line to event parsing.
pub mod parser;
/// Common imports for typical usage.
pub mod prelude;
/// Render state fold.
pub mod render;
/// Stream session state machine and cancellation.
pub mod session;
/// Typed stream events.
pub mod stream;
/// Request-issuing capability.
pub mod transport;

pub use api::{AgentApi, AgentInfo, ChatResponse, Conversation, Message};
pub use client::{ChatClient, ChatClientBuilder};
pub use config::ClientConfig;
pub use content::CompletedContent;
pub use controller::{NoopObserver, StreamController, StreamObserver};
pub use decoder::{DecodedChunk, LineBuffer, decode_chunk};
pub use errors::{ClientError, FrameError, StreamFailure};
pub use model::{AgentType, ChatRequest, ConversationId};
pub use observability::init_observability;
pub use parser::parse_line;
pub use render::{RenderState, fold_events};
pub use session::{AbortHandle, ChatStream, Outcome, SessionState};
pub use stream::StreamEvent;
pub use transport::{ByteStream, HttpTransport, StreamTransport};
