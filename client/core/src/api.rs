//! Conversation REST API
//!
//! Non-streaming collaborator next to the streaming transport: listing the
//! user's conversations, fetching one conversation's history, and deleting a
//! conversation. The streaming path never depends on these calls.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// One conversation in the sidebar listing.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConversationSummary {
    /// Server-assigned conversation identifier.
    pub id: String,
    /// Conversation title.
    pub title: String,
    /// Creation time, seconds since the epoch.
    #[serde(default)]
    pub created_at: f64,
    /// Last-update time, seconds since the epoch.
    #[serde(default)]
    pub updated_at: f64,
}

/// One message of a fetched conversation history.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HistoryMessage {
    /// Authoring role as the backend stores it (`user` or `bot`).
    pub role: String,
    /// The message text.
    pub text: String,
}

#[derive(Deserialize)]
struct ListResponse {
    conversations: Vec<ConversationSummary>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    messages: Vec<HistoryMessage>,
}

/// Client for the backend's conversation management endpoints.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for a backend base address.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// List the user's conversations, most recently updated first.
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>> {
        let url = format!("{}/conversations", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("user_id", user_id)])
            .send()
            .await
            .context("Failed to list conversations")?;

        if !response.status().is_success() {
            bail!("Conversation listing failed with status {}", response.status());
        }

        let body: ListResponse = response
            .json()
            .await
            .context("Invalid conversation listing response")?;
        Ok(body.conversations)
    }

    /// Fetch the message history of one conversation.
    pub async fn fetch_conversation(&self, conversation_id: &str) -> Result<Vec<HistoryMessage>> {
        let url = format!("{}/conversations/{}", self.base_url, conversation_id);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch conversation")?;

        if !response.status().is_success() {
            bail!(
                "Fetching conversation {} failed with status {}",
                conversation_id,
                response.status()
            );
        }

        let body: HistoryResponse = response
            .json()
            .await
            .context("Invalid conversation history response")?;
        Ok(body.messages)
    }

    /// Delete a conversation and its history.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let url = format!("{}/conversations/{}", self.base_url, conversation_id);
        let response = self
            .http_client
            .delete(&url)
            .send()
            .await
            .context("Failed to delete conversation")?;

        if !response.status().is_success() {
            bail!(
                "Deleting conversation {} failed with status {}",
                conversation_id,
                response.status()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_listing_deserializes() {
        let body = r#"{
            "conversations": [
                {"id": "c1", "title": "Trip planning", "user_id": "user_1",
                 "created_at": 1700000000.0, "updated_at": 1700000500.5}
            ]
        }"#;

        let parsed: ListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.conversations.len(), 1);
        assert_eq!(parsed.conversations[0].id, "c1");
        assert_eq!(parsed.conversations[0].title, "Trip planning");
        assert_eq!(parsed.conversations[0].updated_at, 1700000500.5);
    }

    #[test]
    fn test_history_deserializes() {
        let body = r#"{
            "conversation": {"id": "c1", "title": "Trip planning"},
            "messages": [
                {"text": "hi", "role": "user", "timestamp": 1700000000.0},
                {"text": "hello", "role": "bot", "timestamp": 1700000001.0}
            ]
        }"#;

        let parsed: HistoryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.messages.len(), 2);
        assert_eq!(parsed.messages[0].role, "user");
        assert_eq!(parsed.messages[1].text, "hello");
    }
}
