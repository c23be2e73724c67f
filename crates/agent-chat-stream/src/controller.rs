//! UI-facing surface: `start_stream` / `stop_stream` over observable render state.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;

use crate::client::ChatClient;
use crate::content::CompletedContent;
use crate::errors::ClientError;
use crate::model::{AgentType, ChatRequest, ConversationId};
use crate::render::RenderState;
use crate::session::{AbortHandle, Outcome};
use crate::stream::StreamEvent;

/// Callbacks fired by [`StreamController`] for noteworthy events.
///
/// Each fires at most once per session and never after the session was
/// cancelled or superseded. Callbacks run while the controller's session lock
/// is held and must not call back into the controller.
pub trait StreamObserver: Send + Sync {
    fn on_conversation_id(&self, _conversation_id: ConversationId) {}
    fn on_complete(&self, _content: &CompletedContent) {}
    fn on_error(&self, _message: &str) {}
}

/// Observer that ignores every callback.
pub struct NoopObserver;

impl StreamObserver for NoopObserver {}

#[derive(Default)]
struct ActiveSession {
    generation: u64,
    abort: Option<AbortHandle>,
}

/// Runs one session at a time and publishes its [`RenderState`].
pub struct StreamController {
    client: ChatClient,
    observer: Arc<dyn StreamObserver>,
    state_tx: watch::Sender<RenderState>,
    active: Mutex<ActiveSession>,
}

impl StreamController {
    pub fn new(client: ChatClient) -> Self {
        Self::with_observer(client, Arc::new(NoopObserver))
    }

    pub fn with_observer(client: ChatClient, observer: Arc<dyn StreamObserver>) -> Self {
        let (state_tx, _) = watch::channel(RenderState::default());
        Self {
            client,
            observer,
            state_tx,
            active: Mutex::new(ActiveSession::default()),
        }
    }

    /// Starts a session and drives it to its outcome.
    ///
    /// A session that is still running is cancelled first. Render state is
    /// reset before the request is issued and updated after every event.
    /// Dropping the returned future cancels the session.
    pub async fn start_stream(
        &self,
        message: impl Into<String>,
        agent_type: impl Into<AgentType>,
        conversation_id: Option<ConversationId>,
    ) -> Result<Outcome, ClientError> {
        let request = ChatRequest::new(message, agent_type).conversation(conversation_id);
        let mut stream = self.client.start_stream(request)?;

        let slot = {
            let mut active = self.lock();
            if let Some(previous) = active.abort.take() {
                debug!("cancelling previous chat stream");
                previous.abort();
            }
            active.generation += 1;
            active.abort = Some(stream.abort_handle());
            self.state_tx.send_replace(RenderState::started());
            SessionSlot {
                controller: self,
                generation: active.generation,
            }
        };

        while let Some(event) = stream.next_event().await {
            if !self.publish(slot.generation, &event) {
                stream.abort_handle().abort();
                break;
            }
        }
        Ok(stream.finish().await)
    }

    /// Cancels the running session, if any. Its partial content stays visible.
    pub fn stop_stream(&self) {
        let mut active = self.lock();
        // Bumping the generation fences off events already in flight.
        active.generation += 1;
        if let Some(abort) = active.abort.take() {
            abort.abort();
            self.state_tx.send_modify(|state| {
                *state = std::mem::take(state).cancelled();
            });
        }
    }

    /// Subscribes to render state updates.
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current render state.
    pub fn state(&self) -> RenderState {
        self.state_tx.borrow().clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.state_tx.borrow().is_streaming()
    }

    pub fn stream_content(&self) -> String {
        self.state_tx.borrow().stream_content().to_string()
    }

    pub fn error(&self) -> Option<String> {
        self.state_tx.borrow().error().map(ToOwned::to_owned)
    }

    // Returns false once `generation` is no longer the current session.
    fn publish(&self, generation: u64, event: &StreamEvent) -> bool {
        let active = self.lock();
        if active.generation != generation {
            return false;
        }
        self.state_tx.send_modify(|state| {
            *state = std::mem::take(state).apply(event);
        });
        match event {
            StreamEvent::ConversationStarted { conversation_id } => {
                self.observer.on_conversation_id(*conversation_id)
            }
            StreamEvent::Completed(content) => self.observer.on_complete(content),
            StreamEvent::Failed { message } => self.observer.on_error(message),
            StreamEvent::ContentDelta { .. } => {}
        }
        true
    }

    // Frees the session slot if `generation` still owns it. A session that
    // did not reach Completed or Failed is shown as cancelled.
    fn release(&self, generation: u64) {
        let mut active = self.lock();
        if active.generation != generation {
            return;
        }
        if let Some(abort) = active.abort.take() {
            abort.abort();
        }
        self.state_tx.send_if_modified(|state| {
            if state.state.is_terminal() {
                return false;
            }
            *state = std::mem::take(state).cancelled();
            true
        });
    }

    fn lock(&self) -> MutexGuard<'_, ActiveSession> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held by a running `start_stream` call. Dropping it, on return or when the
/// call's future is dropped mid-session, releases the controller's slot.
struct SessionSlot<'a> {
    controller: &'a StreamController,
    generation: u64,
}

impl Drop for SessionSlot<'_> {
    fn drop(&mut self) {
        self.controller.release(self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StreamFailure;
    use crate::session::SessionState;
    use crate::transport::{ByteStream, StreamTransport};
    use futures::StreamExt as _;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Body {
        Frames(&'static str),
        FramesThenHang(&'static str),
        Refused,
    }

    struct FakeTransport {
        body: Body,
    }

    #[async_trait::async_trait]
    impl StreamTransport for FakeTransport {
        async fn open(&self, _request: ChatRequest) -> Result<ByteStream, StreamFailure> {
            let chunk = |s: &'static str| -> Result<bytes::Bytes, StreamFailure> {
                Ok(bytes::Bytes::from_static(s.as_bytes()))
            };
            match self.body {
                Body::Frames(frames) => Ok(Box::pin(stream::iter(vec![chunk(frames)]))),
                Body::FramesThenHang(frames) => Ok(Box::pin(
                    stream::iter(vec![chunk(frames)]).chain(stream::pending()),
                )),
                Body::Refused => Err(StreamFailure::transport("connection refused")),
            }
        }
    }

    #[derive(Default)]
    struct Counter {
        ids: AtomicUsize,
        completions: AtomicUsize,
        errors: AtomicUsize,
    }

    impl StreamObserver for Counter {
        fn on_conversation_id(&self, _conversation_id: ConversationId) {
            self.ids.fetch_add(1, Ordering::SeqCst);
        }
        fn on_complete(&self, _content: &CompletedContent) {
            self.completions.fetch_add(1, Ordering::SeqCst);
        }
        fn on_error(&self, _message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn controller(body: Body, observer: Arc<Counter>) -> Arc<StreamController> {
        let client = ChatClient::builder()
            .transport(Arc::new(FakeTransport { body }))
            .build()
            .expect("client");
        Arc::new(StreamController::with_observer(client, observer))
    }

    const HELLO: &str = concat!(
        "data: {\"type\":\"conversation_id\",\"data\":42}\n\n",
        "data: {\"type\":\"content\",\"data\":\"Hel\"}\n\n",
        "data: {\"type\":\"content\",\"data\":\"lo\"}\n\n",
        "data: {\"type\":\"complete\",\"data\":{\"raw_content\":\"Hello\",\"formatted_content\":\"Hello\"}}\n\n",
        "data: {\"type\":\"complete\",\"data\":{\"raw_content\":\"again\",\"formatted_content\":\"again\"}}\n\n",
    );

    #[tokio::test]
    async fn completed_session_fires_each_callback_once() {
        let counter = Arc::new(Counter::default());
        let controller = controller(Body::Frames(HELLO), counter.clone());

        let outcome = controller
            .start_stream("hi", "general_qa", None)
            .await
            .expect("start");
        assert_eq!(
            outcome,
            Outcome::Completed(CompletedContent::new("Hello", "Hello"))
        );
        assert_eq!(counter.ids.load(Ordering::SeqCst), 1);
        assert_eq!(counter.completions.load(Ordering::SeqCst), 1);
        assert_eq!(counter.errors.load(Ordering::SeqCst), 0);

        let state = controller.state();
        assert_eq!(state.state, SessionState::Completed);
        assert_eq!(state.conversation_id, Some(ConversationId(42)));
        assert_eq!(controller.stream_content(), "Hello");
        assert!(!controller.is_streaming());
        assert_eq!(controller.error(), None);
    }

    #[tokio::test]
    async fn transport_failure_is_reported_once() {
        let counter = Arc::new(Counter::default());
        let controller = controller(Body::Refused, counter.clone());
        let outcome = controller
            .start_stream("hi", "general_qa", Some(ConversationId(3)))
            .await
            .expect("start");
        assert!(matches!(
            outcome,
            Outcome::Failed(StreamFailure::Transport { .. })
        ));
        assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
        assert_eq!(counter.completions.load(Ordering::SeqCst), 0);
        assert!(
            controller
                .error()
                .is_some_and(|e| e.contains("connection refused"))
        );
    }

    #[tokio::test]
    async fn stop_mid_stream_fires_neither_terminal_callback() {
        let counter = Arc::new(Counter::default());
        let controller = controller(
            Body::FramesThenHang("data: {\"type\":\"content\",\"data\":\"partial\"}\n"),
            counter.clone(),
        );
        let mut updates = controller.subscribe();

        let running = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start_stream("hi", "general_qa", None).await })
        };
        updates
            .wait_for(|state| state.content == "partial")
            .await
            .expect("partial content");
        assert!(controller.is_streaming());

        controller.stop_stream();
        let outcome = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("session ends promptly")
            .expect("join")
            .expect("start");

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(counter.completions.load(Ordering::SeqCst), 0);
        assert_eq!(counter.errors.load(Ordering::SeqCst), 0);
        let state = controller.state();
        assert_eq!(state.state, SessionState::Cancelled);
        assert_eq!(state.stream_content(), "partial");
        assert_eq!(state.error(), None);
    }

    #[tokio::test]
    async fn starting_a_new_session_cancels_the_old_one() {
        let counter = Arc::new(Counter::default());
        let controller = controller(
            Body::FramesThenHang("data: {\"type\":\"content\",\"data\":\"first\"}\n"),
            counter.clone(),
        );
        let mut updates = controller.subscribe();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start_stream("one", "general_qa", None).await })
        };
        updates
            .wait_for(|state| state.content == "first")
            .await
            .expect("first content");

        let second = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start_stream("two", "general_qa", None).await })
        };
        let first_outcome = tokio::time::timeout(Duration::from_secs(5), first)
            .await
            .expect("first ends")
            .expect("join")
            .expect("start");
        assert_eq!(first_outcome, Outcome::Cancelled);

        updates
            .wait_for(|state| state.content == "first" && state.is_streaming())
            .await
            .expect("second session streaming");
        controller.stop_stream();
        let second_outcome = second.await.expect("join").expect("start");
        assert_eq!(second_outcome, Outcome::Cancelled);
        assert_eq!(counter.errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dropping_the_session_future_marks_it_cancelled() {
        let counter = Arc::new(Counter::default());
        let controller = controller(
            Body::FramesThenHang("data: {\"type\":\"content\",\"data\":\"partial\"}\n"),
            counter.clone(),
        );

        let timed_out = tokio::time::timeout(
            Duration::from_millis(100),
            controller.start_stream("hi", "general_qa", None),
        )
        .await;
        assert!(timed_out.is_err());

        let state = controller.state();
        assert_eq!(state.state, SessionState::Cancelled);
        assert!(!controller.is_streaming());
        assert_eq!(state.stream_content(), "partial");
        assert_eq!(state.error(), None);
        assert_eq!(counter.completions.load(Ordering::SeqCst), 0);
        assert_eq!(counter.errors.load(Ordering::SeqCst), 0);

        // The slot is free again, so stopping afterwards changes nothing.
        controller.stop_stream();
        assert_eq!(controller.state(), state);
    }

    #[tokio::test]
    async fn finished_session_keeps_its_terminal_state() {
        let controller = controller(Body::Frames(HELLO), Arc::new(Counter::default()));
        controller
            .start_stream("hi", "general_qa", None)
            .await
            .expect("start");
        controller.stop_stream();
        assert_eq!(controller.state().state, SessionState::Completed);
    }

    #[tokio::test]
    async fn invalid_request_leaves_state_untouched() {
        let counter = Arc::new(Counter::default());
        let controller = controller(Body::Frames(HELLO), counter);
        let result = controller.start_stream("", "general_qa", None).await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert_eq!(controller.state(), RenderState::default());
    }
}
