use crate::content::CompletedContent;
use crate::model::ConversationId;

/// Typed events produced by a chat stream, in wire order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// The stream is bound to this conversation. At most once, before any delta.
    ConversationStarted { conversation_id: ConversationId },
    /// Incremental text to append to the output.
    ContentDelta { text: String },
    /// Terminal success with the canonical final content.
    Completed(CompletedContent),
    /// Terminal failure with a human-readable message.
    Failed { message: String },
}

impl StreamEvent {
    /// Whether no further events may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed { .. })
    }
}
