//! Client Configuration
//!
//! Backend address, user identity, and the display copy seeded into fresh
//! conversations. Values come from defaults, environment variables, or the
//! builder-style setters.

use std::time::Duration;

use crate::session::Persona;

/// Default backend base address.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Default user identifier sent with every request.
pub const DEFAULT_USER_ID: &str = "user_1";

/// Configuration for the exchange controller and its collaborators.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend base address.
    pub base_url: String,
    /// Identifier of the local user.
    pub user_id: String,
    /// Agent name attributed to assistant responses.
    pub assistant_agent: String,
    /// Agent name attributed to greetings and error notices.
    pub system_agent: String,
    /// Greeting seeded into every fresh conversation.
    pub greeting: String,
    /// Copy committed when the transport fails.
    pub failure_text: String,
    /// Timeout for HTTP requests, including the whole streamed body.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            assistant_agent: "Assistant".to_string(),
            system_agent: "System".to_string(),
            greeting: "Hello! I am your RITE Intelligence Assistant. I can help with HR \
                       Policies or Product details. How can I help you?"
                .to_string(),
            failure_text: "Sorry, I encountered an error. Please try again.".to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ClientConfig {
    /// Configuration from environment variables, with defaults for anything
    /// unset.
    ///
    /// Reads `RITECHAT_API_URL` and `RITECHAT_USER_ID`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("RITECHAT_API_URL") {
            config.base_url = url;
        }
        if let Ok(user_id) = std::env::var("RITECHAT_USER_ID") {
            config.user_id = user_id;
        }
        config
    }

    /// Override the backend base address.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the user identifier.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Override the assistant agent name.
    #[must_use]
    pub fn with_assistant_agent(mut self, agent: impl Into<String>) -> Self {
        self.assistant_agent = agent.into();
        self
    }

    /// Override the greeting seeded into fresh conversations.
    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// The persona handed to each stream session.
    #[must_use]
    pub fn persona(&self) -> Persona {
        Persona {
            assistant_agent: self.assistant_agent.clone(),
            system_agent: self.system_agent.clone(),
            failure_text: self.failure_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.user_id, DEFAULT_USER_ID);
        assert_eq!(config.assistant_agent, "Assistant");
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(
            config.greeting,
            "Hello! I am your RITE Intelligence Assistant. I can help with HR Policies \
             or Product details. How can I help you?"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::default()
            .with_base_url("http://10.0.0.2:9000")
            .with_user_id("user_42")
            .with_assistant_agent("Scribe")
            .with_greeting("Welcome.");

        assert_eq!(config.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.user_id, "user_42");
        assert_eq!(config.assistant_agent, "Scribe");
        assert_eq!(config.greeting, "Welcome.");
    }

    #[test]
    fn test_persona_mirrors_config() {
        let config = ClientConfig::default().with_assistant_agent("Scribe");
        let persona = config.persona();
        assert_eq!(persona.assistant_agent, "Scribe");
        assert_eq!(persona.system_agent, config.system_agent);
        assert_eq!(persona.failure_text, config.failure_text);
    }
}
