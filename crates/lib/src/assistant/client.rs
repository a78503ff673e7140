//! Assistant API client (http://127.0.0.1:8000 by default).

use crate::session::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = crate::config::DEFAULT_BASE_URL;

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("assistant api error: {0}")]
    Api(String),
    #[error("assistant response malformed: {0}")]
    Decode(String),
}

/// Remote assistant as seen by the chat controller.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// GET /health.
    async fn health(&self) -> Result<HealthStatus, AssistantError>;
    /// POST /chat with the full conversation so far.
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse, AssistantError>;
}

/// Client for the assistant HTTP API.
#[derive(Clone)]
pub struct AssistantClient {
    base_url: String,
    client: reqwest::Client,
}

impl AssistantClient {
    pub fn new(base_url: Option<String>) -> Self {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Use a preconfigured reqwest client (e.g. one with a request timeout).
    pub fn with_http_client(base_url: Option<String>, client: reqwest::Client) -> Self {
        let base_url = base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AssistantBackend for AssistantClient {
    async fn health(&self) -> Result<HealthStatus, AssistantError> {
        let url = format!("{}/health", self.base_url);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AssistantError::Api(format!("{} {}", status, body)));
        }
        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|e| AssistantError::Decode(e.to_string()))
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse, AssistantError> {
        let url = format!("{}/chat", self.base_url);
        let body = ChatRequest { messages };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AssistantError::Api(format!("{} {}", status, body)));
        }
        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|e| AssistantError::Decode(e.to_string()))
    }
}

/// Body of GET /health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
}

impl HealthStatus {
    /// The backend is ready only when it reports exactly "ok".
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// One message on the chat wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: m.origin.role().to_string(),
            content: m.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Body of POST /chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: Option<String>,
}

impl ChatResponse {
    /// Reply text, or "" when the backend sent none.
    pub fn content(&self) -> &str {
        self.response.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(AssistantClient::new(None).base_url(), "http://127.0.0.1:8000");
        assert_eq!(
            AssistantClient::new(Some(" http://api.local:9000/ ".to_string())).base_url(),
            "http://api.local:9000"
        );
        assert_eq!(
            AssistantClient::new(Some(String::new())).base_url(),
            "http://127.0.0.1:8000"
        );
    }

    #[test]
    fn roles_follow_origin() {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::from(&Message::user("Show me 3-bed houses")),
                ChatMessage::from(&Message::assistant("Try DHA Phase 6")),
            ],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "messages": [
                    { "role": "user", "content": "Show me 3-bed houses" },
                    { "role": "assistant", "content": "Try DHA Phase 6" }
                ]
            })
        );
    }

    #[test]
    fn health_status_requires_exact_ok() {
        let ok: HealthStatus = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        let loading: HealthStatus = serde_json::from_str(r#"{"status":"loading"}"#).unwrap();
        let missing: HealthStatus = serde_json::from_str("{}").unwrap();
        assert!(ok.is_ok());
        assert!(!loading.is_ok());
        assert!(!missing.is_ok());
    }

    #[test]
    fn absent_response_reads_empty() {
        let r: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(r.content(), "");
        let r: ChatResponse = serde_json::from_str(r#"{"response":null}"#).unwrap();
        assert_eq!(r.content(), "");
    }
}
