//! Plain request/response calls to the agent backend.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::model::{AgentType, ChatRequest, ConversationId};

/// Agent advertised by `GET /api/agents/list/`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgentInfo {
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Stored message of a conversation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub agent_type: AgentType,
    pub is_user_message: bool,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Response of the non-streaming `POST /api/agents/chat/`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatResponse {
    pub conversation_id: ConversationId,
    pub response: String,
    pub agent_type: AgentType,
    pub success: bool,
    /// Server-side processing time in seconds.
    #[serde(default)]
    pub execution_time: f64,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for the non-streaming agent endpoints.
#[derive(Clone)]
pub struct AgentApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl AgentApi {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Sends a message and waits for the whole reply.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let req = self
            .client
            .post(self.config.api_url("agents/chat/"))
            .json(request);
        self.send(req).await
    }

    /// Conversations of the current session's user.
    pub async fn conversations(&self) -> Result<Vec<Conversation>, ClientError> {
        let req = self.client.get(self.config.api_url("agents/conversations/"));
        self.send(req).await
    }

    pub async fn conversation(&self, id: ConversationId) -> Result<Conversation, ClientError> {
        let req = self
            .client
            .get(self.config.api_url(&format!("agents/conversations/{id}/")));
        self.send(req).await
    }

    /// Agents the backend can route to.
    pub async fn agents(&self) -> Result<Vec<AgentInfo>, ClientError> {
        let req = self.client.get(self.config.api_url("agents/list/"));
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut req: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        if let Some(cookie) = self.config.session_cookie.as_deref() {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
        let response = req.send().await.map_err(ClientError::transport)?;
        let status = response.status();
        let body = response.text().await.map_err(ClientError::transport)?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_string());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_deserializes_backend_shape() {
        let conversation: Conversation = serde_json::from_value(serde_json::json!({
            "id": 5,
            "title": "Speech draft",
            "created_at": "2024-03-01T10:00:00.123456Z",
            "updated_at": "2024-03-01T18:05:00+08:00",
            "messages": [{
                "id": 9,
                "content": "Write a toast",
                "agent_type": "speech_writer",
                "is_user_message": true,
                "metadata": {},
                "created_at": "2024-03-01T10:00:01Z"
            }]
        }))
        .expect("conversation");
        assert_eq!(conversation.id, ConversationId(5));
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].agent_type.as_str(), "speech_writer");
        assert!(conversation.updated_at > conversation.created_at);
    }

    #[test]
    fn agent_info_reads_type_field() {
        let agent: AgentInfo = serde_json::from_value(serde_json::json!({
            "type": "general_qa",
            "name": "General Q&A",
            "description": "Answers questions",
            "capabilities": ["qa"]
        }))
        .expect("agent");
        assert_eq!(agent.agent_type, AgentType::default());
        assert_eq!(agent.capabilities, vec!["qa".to_string()]);
    }
}
