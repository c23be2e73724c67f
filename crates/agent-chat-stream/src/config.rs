use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration shared by the streaming client and the REST API client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend origin, without the `/api` suffix.
    pub base_url: String,
    /// Raw `Cookie` header value of an existing backend session, passed through as is.
    pub session_cookie: Option<String>,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Total timeout for non-streaming requests.
    ///
    /// Streams are not bounded by it; a silent stream stays open until cancelled.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_cookie: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ClientConfig {
    /// Creates a config for the given backend origin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from environment variables.
    ///
    /// - `AGENT_CHAT_BASE_URL` (default `http://localhost:8000`)
    /// - `AGENT_CHAT_SESSION_COOKIE`
    /// - `AGENT_CHAT_CONNECT_TIMEOUT_SECS`
    /// - `AGENT_CHAT_REQUEST_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(base_url) = env_value("AGENT_CHAT_BASE_URL") {
            config.base_url = base_url;
        }
        config.session_cookie = env_value("AGENT_CHAT_SESSION_COOKIE");
        if let Some(secs) = env_secs("AGENT_CHAT_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = secs;
        }
        if let Some(secs) = env_secs("AGENT_CHAT_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = secs;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the backend origin.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the session cookie forwarded with every request.
    pub fn session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the timeout of non-streaming requests.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https://, got {base}"
            )));
        }
        Ok(())
    }

    pub(crate) fn stream_url(&self) -> String {
        self.api_url("agents/stream-chat/")
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(key: &str) -> Result<Option<Duration>, ClientError> {
    match env_value(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ClientError::Config(format!("{key} must be a whole number of seconds"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slashes() {
        let config = ClientConfig::new("http://localhost:8000/");
        assert_eq!(
            config.stream_url(),
            "http://localhost:8000/api/agents/stream-chat/"
        );
        assert_eq!(
            config.api_url("/agents/conversations/3/"),
            "http://localhost:8000/api/agents/conversations/3/"
        );
    }

    #[test]
    fn validate_rejects_missing_scheme() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(matches!(
            ClientConfig::new("localhost:8000").validate(),
            Err(ClientError::Config(msg)) if msg.contains("http://")
        ));
        assert!(ClientConfig::new("  ").validate().is_err());
    }
}
