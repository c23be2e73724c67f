/// Final content reported by the backend when a stream completes.
///
/// This is authoritative: it can differ from the plain concatenation of the
/// deltas (for example when the server post-processes markdown).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompletedContent {
    /// Unformatted model output.
    pub raw_content: String,
    /// Output after server-side formatting.
    pub formatted_content: String,
}

impl CompletedContent {
    pub fn new(raw_content: impl Into<String>, formatted_content: impl Into<String>) -> Self {
        Self {
            raw_content: raw_content.into(),
            formatted_content: formatted_content.into(),
        }
    }

    /// Formatted content, falling back to the raw content when the server sent
    /// an empty formatted body.
    pub fn display_text(&self) -> &str {
        if self.formatted_content.is_empty() {
            &self.raw_content
        } else {
            &self.formatted_content
        }
    }
}
