//! AI adapter: chat-completion provider abstraction.
//!
//! Groq and OpenAI speak the same Chat Completions wire format, so one
//! provider type covers both; only the endpoint and key differ.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<String, AiError>> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("assistant is disabled")]
    Disabled,
    #[error("model request failed: {0}")]
    Upstream(String),
    #[error("model returned an empty reply")]
    Empty,
}

/// Trait object used by the HTTP handlers.
pub trait ChatClient: Send + Sync {
    /// Send one system + user exchange and return the model's raw reply text.
    fn complete<'a>(&'a self, system: &'a str, prompt: &'a str) -> ChatFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynChatClient = Arc<dyn ChatClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a mock client that echoes a fixed analysis.
/// * Else if `config.enabled==false` or the key is empty, returns a disabled client.
/// * Else builds the Chat Completions provider for `config.provider`.
pub fn build_client_from_config(config: &AiConfig) -> DynChatClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockClient::new("Mock analysis: nothing unusual in these feeds."));
    }

    if !config.enabled || config.api_key.trim().is_empty() {
        return Arc::new(DisabledClient);
    }

    let endpoint = match config.provider.as_str() {
        "groq" => GROQ_ENDPOINT,
        "openai" => OPENAI_ENDPOINT,
        other => {
            tracing::warn!(provider = other, "unknown AI provider; assistant disabled");
            return Arc::new(DisabledClient);
        }
    };

    match ChatCompletionsProvider::new(endpoint, config) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            tracing::warn!(error = %e, "AI http client not built; assistant disabled");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

pub struct ChatCompletionsProvider {
    http: reqwest::Client,
    endpoint: &'static str,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    name: &'static str,
}

impl ChatCompletionsProvider {
    pub fn new(endpoint: &'static str, config: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("flux-dashboard/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()?;
        let name = if endpoint == GROQ_ENDPOINT {
            "groq"
        } else {
            "openai"
        };
        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            name,
        })
    }
}

impl ChatClient for ChatCompletionsProvider {
    fn complete<'a>(&'a self, system: &'a str, prompt: &'a str) -> ChatFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: system,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let resp = self
                .http
                .post(self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(|e| AiError::Upstream(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(AiError::Upstream(format!("status {status}")));
            }
            let body: Resp = resp
                .json()
                .await
                .map_err(|e| AiError::Upstream(e.to_string()))?;
            let content = body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default();
            let content = content.trim();
            if content.is_empty() {
                Err(AiError::Empty)
            } else {
                Ok(content.to_string())
            }
        })
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// Always fails with `AiError::Disabled`.
pub struct DisabledClient;

impl ChatClient for DisabledClient {
    fn complete<'a>(&'a self, _system: &'a str, _prompt: &'a str) -> ChatFuture<'a> {
        Box::pin(async { Err(AiError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns a fixed reply; used for tests and local runs.
#[derive(Clone)]
pub struct MockClient {
    pub reply: String,
}

impl MockClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl ChatClient for MockClient {
    fn complete<'a>(&'a self, _system: &'a str, _prompt: &'a str) -> ChatFuture<'a> {
        let out = self.reply.clone();
        Box::pin(async move { Ok(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn disabled_unless_enabled_with_key() {
        std::env::remove_var("AI_TEST_MODE");
        let cfg = AiConfig::default();
        assert_eq!(build_client_from_config(&cfg).provider_name(), "disabled");

        let cfg = AiConfig {
            enabled: true,
            api_key: "  ".into(),
            ..Default::default()
        };
        assert_eq!(build_client_from_config(&cfg).provider_name(), "disabled");

        let cfg = AiConfig {
            enabled: true,
            provider: "claude".into(),
            api_key: "k".into(),
            ..Default::default()
        };
        assert_eq!(build_client_from_config(&cfg).provider_name(), "disabled");
    }

    #[serial_test::serial]
    #[test]
    fn provider_selected_by_name() {
        std::env::remove_var("AI_TEST_MODE");
        let cfg = AiConfig {
            enabled: true,
            api_key: "k".into(),
            ..Default::default()
        };
        assert_eq!(build_client_from_config(&cfg).provider_name(), "groq");
        let cfg = AiConfig {
            provider: "openai".into(),
            ..cfg
        };
        assert_eq!(build_client_from_config(&cfg).provider_name(), "openai");
    }

    #[serial_test::serial]
    #[test]
    fn test_mode_forces_mock() {
        std::env::set_var("AI_TEST_MODE", "mock");
        let client = build_client_from_config(&AiConfig::default());
        assert_eq!(client.provider_name(), "mock");
        std::env::remove_var("AI_TEST_MODE");
    }

    #[tokio::test]
    async fn disabled_client_reports_disabled() {
        let err = DisabledClient.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, AiError::Disabled));
    }
}
