//! AI Client Module
//!
//! Handles communication with an OpenAI-compatible chat completions API.

use crate::ai::prompts;
use crate::config::AiSettings;
use crate::models::Complexity;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during AI operations
#[derive(Error, Debug)]
pub enum AiError {
    #[error("API key missing (set {0})")]
    ApiKeyMissing(String),

    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    #[error("API rejected the credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("Rate limited or quota exceeded")]
    RateLimited,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response from AI: {0}")]
    InvalidResponse(String),

    #[error("AI integration not available")]
    NotAvailable,
}

/// Something that can write an implementation plan narrative
pub trait TextGenerator: Send + Sync {
    /// Short human-readable description, used in logs
    fn describe(&self) -> String;

    /// Generates plan text for the given modules, complexity and technical
    /// requirements. Any failure is returned, never retried.
    fn generate_plan(
        &self,
        modules: &[String],
        complexity: Complexity,
        technical_requirements: &[String],
    ) -> Result<String, AiError>;
}

/// AI operation mode
#[derive(Debug, Clone, Default)]
pub enum AiMode {
    /// OpenAI-compatible chat completions endpoint
    OpenAi {
        base_url: String,
        model: String,
        api_key: String,
    },
    /// AI features disabled
    #[default]
    Disabled,
}

/// AI Client for the plan-writing model
#[derive(Debug, Clone)]
pub struct AiClient {
    mode: AiMode,
    timeout: Duration,
    max_tokens: u32,
    temperature: f32,
}

impl Default for AiClient {
    fn default() -> Self {
        Self::with_mode(AiMode::Disabled)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl AiClient {
    /// Create a client from settings, reading the API key from the environment
    pub fn from_settings(settings: &AiSettings) -> Self {
        let mode = Self::detect_mode(settings);
        Self {
            mode,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    /// Create a client with a specific mode and default request settings
    pub fn with_mode(mode: AiMode) -> Self {
        let defaults = AiSettings::default();
        Self {
            mode,
            timeout: Duration::from_secs(defaults.timeout_secs),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }

    /// Detect the available AI mode
    fn detect_mode(settings: &AiSettings) -> AiMode {
        if !settings.enabled {
            return AiMode::Disabled;
        }

        match std::env::var(&settings.api_key_env) {
            Ok(api_key) if !api_key.trim().is_empty() => AiMode::OpenAi {
                base_url: settings.base_url.trim_end_matches('/').to_string(),
                model: settings.model.clone(),
                api_key,
            },
            _ => {
                log::debug!(
                    "{} is not set, plan generation will use the built-in template",
                    settings.api_key_env
                );
                AiMode::Disabled
            }
        }
    }

    /// Check if AI features are available
    pub fn is_available(&self) -> bool {
        match &self.mode {
            AiMode::OpenAi { api_key, .. } => !api_key.is_empty(),
            AiMode::Disabled => false,
        }
    }

    /// Get the current mode
    pub fn mode(&self) -> &AiMode {
        &self.mode
    }

    /// Get a description of the current mode
    pub fn mode_description(&self) -> String {
        match &self.mode {
            AiMode::OpenAi { base_url, model, .. } => format!("{} via {}", model, base_url),
            AiMode::Disabled => "Disabled".to_string(),
        }
    }

    /// Send a chat request to the AI
    fn send_request(&self, system: &str, prompt: &str) -> Result<String, AiError> {
        match &self.mode {
            AiMode::OpenAi {
                base_url,
                model,
                api_key,
            } => self.send_chat_request(base_url, model, api_key, system, prompt),
            AiMode::Disabled => Err(AiError::NotAvailable),
        }
    }

    /// Send request via the chat completions endpoint
    fn send_chat_request(
        &self,
        base_url: &str,
        model: &str,
        api_key: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, AiError> {
        if api_key.is_empty() {
            return Err(AiError::ApiKeyMissing("API key".to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AiError::ApiRequestFailed(e.to_string()))?;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = client
            .post(format!("{}/chat/completions", base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout(self.timeout)
                } else {
                    AiError::ApiRequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        match status.as_u16() {
            401 | 403 => return Err(AiError::Unauthorized(status.as_u16())),
            429 => return Err(AiError::RateLimited),
            _ if !status.is_success() => {
                let body = response.text().unwrap_or_default();
                return Err(AiError::ApiRequestFailed(format!(
                    "HTTP {}: {}",
                    status, body
                )));
            }
            _ => {}
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        extract_content(parsed)
    }
}

/// Pulls the first non-empty message out of a chat response
fn extract_content(response: ChatResponse) -> Result<String, AiError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(AiError::InvalidResponse("Empty response from model".to_string()));
    }

    Ok(content)
}

impl TextGenerator for AiClient {
    fn describe(&self) -> String {
        self.mode_description()
    }

    fn generate_plan(
        &self,
        modules: &[String],
        complexity: Complexity,
        technical_requirements: &[String],
    ) -> Result<String, AiError> {
        let prompt = prompts::build_plan_prompt(modules, complexity, technical_requirements);
        self.send_request(prompts::PLAN_SYSTEM_PROMPT, &prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_mode() {
        let client = AiClient::with_mode(AiMode::Disabled);
        assert!(!client.is_available());
        assert_eq!(client.mode_description(), "Disabled");
        let err = client
            .generate_plan(&["CRM".to_string()], Complexity::Low, &[])
            .unwrap_err();
        assert!(matches!(err, AiError::NotAvailable));
    }

    #[test]
    fn test_settings_disabled_never_reads_key() {
        let settings = AiSettings {
            enabled: false,
            ..AiSettings::default()
        };
        let client = AiClient::from_settings(&settings);
        assert!(matches!(client.mode(), AiMode::Disabled));
    }

    #[test]
    fn test_missing_key_disables_client() {
        let settings = AiSettings {
            api_key_env: "ERPREQ_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..AiSettings::default()
        };
        let client = AiClient::from_settings(&settings);
        assert!(!client.is_available());
    }

    #[test]
    fn test_extract_content() {
        let parsed: ChatResponse = serde_json::from_str(
            r##"{"choices":[{"message":{"role":"assistant","content":"  # Plan\n- step  "}}]}"##,
        )
        .unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "# Plan\n- step");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_content(empty),
            Err(AiError::InvalidResponse(_))
        ));
    }
}
