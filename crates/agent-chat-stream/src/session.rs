//! A single streaming request, from issuance to its terminal outcome.
//!
//! [`ChatStream`] is a finite, non-restartable sequence of [`StreamEvent`]s
//! produced lazily as the consumer polls it. Each poll runs
//! read → decode → parse → deliver for at most one chunk, so events come out
//! in exactly the order their lines appeared in the body.

use std::collections::VecDeque;

use futures::StreamExt as _;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::content::CompletedContent;
use crate::decoder::{LineBuffer, decode_chunk};
use crate::errors::StreamFailure;
use crate::model::ConversationId;
use crate::parser::parse_line;
use crate::stream::StreamEvent;
use crate::transport::ByteStream;

/// Lifecycle of a session. `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Active,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// How a session ended. Exactly one per session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed(CompletedContent),
    Failed(StreamFailure),
    /// Stopped by the consumer. Not an error.
    Cancelled,
}

impl Outcome {
    pub fn state(&self) -> SessionState {
        match self {
            Self::Completed(_) => SessionState::Completed,
            Self::Failed(_) => SessionState::Failed,
            Self::Cancelled => SessionState::Cancelled,
        }
    }
}

/// Handle used to cancel a running stream from anywhere.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The stream stops at its next suspension point or before delivering its
    /// next event, whichever comes first, and ends with [`Outcome::Cancelled`].
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

enum Phase {
    Connecting(BoxFuture<'static, Result<ByteStream, StreamFailure>>),
    Reading(ByteStream),
    Drained,
    Closed,
}

enum Step {
    Aborted,
    Opened(Result<ByteStream, StreamFailure>),
    Chunk(Option<Result<bytes::Bytes, StreamFailure>>),
    Drained,
    Closed,
}

/// One in-flight streaming session.
pub struct ChatStream {
    session_id: uuid::Uuid,
    phase: Phase,
    lines: LineBuffer,
    queue: VecDeque<StreamEvent>,
    abort_rx: watch::Receiver<bool>,
    abort_handle: AbortHandle,
    state: SessionState,
    content: String,
    conversation_id: Option<ConversationId>,
    outcome: Option<Outcome>,
    seq: u64,
    dropped_frames: usize,
}

impl ChatStream {
    /// Creates an active session that opens its body with `connect` on first poll.
    pub(crate) fn new(connect: BoxFuture<'static, Result<ByteStream, StreamFailure>>) -> Self {
        let (abort_tx, abort_rx) = watch::channel(false);
        Self {
            session_id: uuid::Uuid::new_v4(),
            phase: Phase::Connecting(connect),
            lines: LineBuffer::default(),
            queue: VecDeque::new(),
            abort_rx,
            abort_handle: AbortHandle { tx: abort_tx },
            state: SessionState::Active,
            content: String::new(),
            conversation_id: None,
            outcome: None,
            seq: 0,
            dropped_frames: 0,
        }
    }

    /// Creates a session over an already opened body.
    pub fn from_body(body: ByteStream) -> Self {
        Self::new(Box::pin(futures::future::ready(Ok(body))))
    }

    /// Id used to correlate this session in logs.
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Returns a handle that can cancel this session.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Text accumulated from the deltas delivered so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    /// Terminal outcome, once reached.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Number of malformed or out-of-order frames dropped so far.
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    /// Waits for and returns the next event.
    ///
    /// The last event is always `Completed` or `Failed`, unless the session
    /// was cancelled, in which case the sequence just ends. Returns `None`
    /// from then on.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if self.state.is_terminal() {
                return None;
            }
            if *self.abort_rx.borrow() {
                self.cancel();
                return None;
            }
            if let Some(event) = self.queue.pop_front() {
                if let Some(event) = self.accept(event) {
                    return Some(event);
                }
                continue;
            }

            let step = match &mut self.phase {
                Phase::Connecting(connect) => {
                    tokio::select! {
                        biased;
                        _ = abort_requested(&mut self.abort_rx) => Step::Aborted,
                        opened = connect => Step::Opened(opened),
                    }
                }
                Phase::Reading(body) => {
                    tokio::select! {
                        biased;
                        _ = abort_requested(&mut self.abort_rx) => Step::Aborted,
                        chunk = body.next() => Step::Chunk(chunk),
                    }
                }
                Phase::Drained => Step::Drained,
                Phase::Closed => Step::Closed,
            };

            match step {
                Step::Aborted => {
                    self.cancel();
                    return None;
                }
                Step::Opened(Ok(body)) => {
                    info!(session_id = %self.session_id, "chat stream opened");
                    self.phase = Phase::Reading(body);
                }
                Step::Opened(Err(failure)) => return Some(self.fail(failure)),
                Step::Chunk(Some(Ok(chunk))) => {
                    let decoded = decode_chunk(std::mem::take(&mut self.lines), &chunk);
                    self.lines = decoded.pending;
                    for line in decoded.lines {
                        self.ingest_line(&line);
                    }
                }
                Step::Chunk(Some(Err(failure))) => return Some(self.fail(failure)),
                Step::Chunk(None) => {
                    self.phase = Phase::Drained;
                    if let Some(tail) = std::mem::take(&mut self.lines).finish() {
                        self.ingest_tail(&tail);
                    }
                }
                Step::Drained => return Some(self.fail(StreamFailure::Incomplete)),
                Step::Closed => return None,
            }
        }
    }

    /// Drains the session and returns its outcome.
    ///
    /// Safe to call after consuming events with `next_event()`.
    pub async fn finish(mut self) -> Outcome {
        while self.next_event().await.is_some() {}
        self.outcome
            .take()
            .unwrap_or(Outcome::Failed(StreamFailure::Incomplete))
    }

    /// Converts the session into a `futures::Stream` of its events.
    pub fn into_events(self) -> impl futures::Stream<Item = StreamEvent> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next_event().await.map(|event| (event, stream))
        })
    }

    fn ingest_line(&mut self, line: &str) {
        match parse_line(line) {
            Ok(Some(event)) => self.queue.push_back(event),
            Ok(None) => {}
            Err(err) => {
                self.dropped_frames += 1;
                warn!(session_id = %self.session_id, error = %err, "dropping malformed stream frame");
            }
        }
    }

    // An unterminated last line is delivered only if it parses as a whole frame.
    fn ingest_tail(&mut self, tail: &str) {
        match parse_line(tail) {
            Ok(Some(event)) => self.queue.push_back(event),
            Ok(None) => {}
            Err(err) => {
                self.dropped_frames += 1;
                warn!(
                    session_id = %self.session_id,
                    error = %err,
                    bytes = tail.len(),
                    "dropping incomplete frame at end of stream"
                );
            }
        }
    }

    fn accept(&mut self, event: StreamEvent) -> Option<StreamEvent> {
        match event {
            StreamEvent::ConversationStarted { conversation_id } => {
                if self.conversation_id.is_some() || self.seq > 0 {
                    self.dropped_frames += 1;
                    warn!(
                        session_id = %self.session_id,
                        %conversation_id,
                        "dropping conversation id received out of order"
                    );
                    return None;
                }
                debug!(session_id = %self.session_id, %conversation_id, "conversation assigned");
                self.conversation_id = Some(conversation_id);
                Some(StreamEvent::ConversationStarted { conversation_id })
            }
            StreamEvent::ContentDelta { text } => {
                if text.is_empty() {
                    return None;
                }
                debug!(session_id = %self.session_id, seq = self.seq, len = text.len(), "content delta");
                self.content.push_str(&text);
                self.seq = self.seq.saturating_add(1);
                Some(StreamEvent::ContentDelta { text })
            }
            StreamEvent::Completed(content) => {
                info!(session_id = %self.session_id, deltas = self.seq, "chat stream completed");
                self.terminate(Outcome::Completed(content.clone()));
                Some(StreamEvent::Completed(content))
            }
            StreamEvent::Failed { message } => {
                let failure = StreamFailure::server(message);
                info!(session_id = %self.session_id, error = %failure, "chat stream failed");
                let message = failure.user_message();
                self.terminate(Outcome::Failed(failure));
                Some(StreamEvent::Failed { message })
            }
        }
    }

    fn fail(&mut self, failure: StreamFailure) -> StreamEvent {
        info!(session_id = %self.session_id, error = %failure, "chat stream failed");
        let message = failure.user_message();
        self.terminate(Outcome::Failed(failure));
        StreamEvent::Failed { message }
    }

    fn cancel(&mut self) {
        info!(session_id = %self.session_id, deltas = self.seq, "chat stream cancelled");
        self.terminate(Outcome::Cancelled);
    }

    fn terminate(&mut self, outcome: Outcome) {
        self.state = outcome.state();
        self.outcome = Some(outcome);
        self.queue.clear();
        // Drops the body, which closes the connection.
        self.phase = Phase::Closed;
    }
}

async fn abort_requested(rx: &mut watch::Receiver<bool>) {
    let closed = rx.wait_for(|aborted| *aborted).await.is_err();
    if closed {
        // Sender is owned by the stream itself, so this only happens on teardown.
        std::future::pending::<()>().await;
    }
}
