//! Render state folded from stream events.

use crate::content::CompletedContent;
use crate::model::ConversationId;
use crate::session::SessionState;
use crate::stream::StreamEvent;

/// What a UI needs to draw one streamed reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderState {
    pub state: SessionState,
    /// Text accumulated from deltas; kept after failure.
    pub content: String,
    pub conversation_id: Option<ConversationId>,
    pub completed: Option<CompletedContent>,
    pub error: Option<String>,
}

impl RenderState {
    /// State for a freshly started session.
    pub fn started() -> Self {
        Self {
            state: SessionState::Active,
            ..Self::default()
        }
    }

    /// Folds one event into the state.
    ///
    /// Terminal states absorb every further event, so a duplicated `Completed`
    /// is a no-op.
    pub fn apply(mut self, event: &StreamEvent) -> Self {
        if self.state.is_terminal() {
            return self;
        }
        self.state = SessionState::Active;
        match event {
            StreamEvent::ConversationStarted { conversation_id } => {
                if self.conversation_id.is_none() {
                    self.conversation_id = Some(*conversation_id);
                }
            }
            StreamEvent::ContentDelta { text } => self.content.push_str(text),
            StreamEvent::Completed(content) => {
                self.state = SessionState::Completed;
                self.completed = Some(content.clone());
            }
            StreamEvent::Failed { message } => {
                self.state = SessionState::Failed;
                self.error = Some(message.clone());
            }
        }
        self
    }

    /// Marks the session cancelled. Partial content stays; no error is set.
    pub fn cancelled(mut self) -> Self {
        if !self.state.is_terminal() {
            self.state = SessionState::Cancelled;
        }
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Text streamed so far, available while the session is still active.
    pub fn stream_content(&self) -> &str {
        &self.content
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The completion's formatted content once available, the live text otherwise.
    pub fn display_content(&self) -> &str {
        match &self.completed {
            Some(content) => content.display_text(),
            None => &self.content,
        }
    }
}

/// Folds a sequence of events, starting from `state`.
pub fn fold_events<'a>(
    state: RenderState,
    events: impl IntoIterator<Item = &'a StreamEvent>,
) -> RenderState {
    events.into_iter().fold(state, RenderState::apply)
}
