use std::fmt;

/// Identifier of the backend agent a message is routed to (for example `general_qa`).
///
/// The server owns the list of agents, so unknown values are passed through
/// untouched and rejected server-side if invalid.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AgentType(pub String);

impl AgentType {
    pub const GENERAL_QA: &'static str = "general_qa";
    pub const SPEECH_WRITER: &'static str = "speech_writer";
    pub const NEWS_WRITER: &'static str = "news_writer";
    pub const OFFICIAL_DOCUMENT: &'static str = "official_document";
    pub const RESEARCH_REPORT: &'static str = "research_report";
    pub const CODE_ASSISTANT: &'static str = "code_assistant";
    pub const DATA_ANALYSIS: &'static str = "data_analysis";

    /// Agents shipped with the reference backend.
    pub const KNOWN: [&'static str; 7] = [
        Self::GENERAL_QA,
        Self::SPEECH_WRITER,
        Self::NEWS_WRITER,
        Self::OFFICIAL_DOCUMENT,
        Self::RESEARCH_REPORT,
        Self::CODE_ASSISTANT,
        Self::DATA_ANALYSIS,
    ];

    /// Creates an agent type from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the agent type as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the agents in [`AgentType::KNOWN`].
    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(&self.0.as_str())
    }
}

impl Default for AgentType {
    fn default() -> Self {
        Self::new(Self::GENERAL_QA)
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AgentType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Server-assigned conversation id.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl ConversationId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Body of a chat request, shared by the streaming and plain chat endpoints.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatRequest {
    /// User message text.
    pub message: String,
    /// Agent that should answer.
    pub agent_type: AgentType,
    /// Existing conversation to continue; a new one is created when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

impl ChatRequest {
    /// Creates a request for a new conversation.
    pub fn new(message: impl Into<String>, agent_type: impl Into<AgentType>) -> Self {
        Self {
            message: message.into(),
            agent_type: agent_type.into(),
            conversation_id: None,
        }
    }

    /// Continues an existing conversation (or starts a new one for `None`).
    pub fn conversation(mut self, conversation_id: Option<ConversationId>) -> Self {
        self.conversation_id = conversation_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_agent_is_general_qa() {
        assert_eq!(AgentType::default().as_str(), "general_qa");
        assert!(AgentType::default().is_known());
        assert!(!AgentType::new("poetry").is_known());
    }

    #[test]
    fn request_omits_missing_conversation_id() {
        let body = serde_json::to_value(ChatRequest::new("hi", "news_writer")).expect("json");
        assert_eq!(
            body,
            serde_json::json!({"message": "hi", "agent_type": "news_writer"})
        );

        let body = serde_json::to_value(
            ChatRequest::new("hi", AgentType::default()).conversation(Some(ConversationId(7))),
        )
        .expect("json");
        assert_eq!(body["conversation_id"], serde_json::json!(7));
    }
}
