//! Chat-completions client for an Azure OpenAI deployment.

use crate::error::{InterpError, Result};
use crate::translation::engine::{Completion, TranslationEngine};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Connection settings for an Azure OpenAI deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct AzureOpenAiSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com/`.
    pub endpoint: String,
    pub api_key: String,
    /// Name chosen for the model deployment.
    pub deployment: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl AzureOpenAiSettings {
    /// Full chat-completions URL for this deployment.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Interpret a chat-completions response body.
///
/// A choice without message content is a decline carrying its finish reason.
fn parse_chat_response(body: &str) -> Result<Completion> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| InterpError::TranslationResponse {
            message: format!("invalid JSON: {e}"),
        })?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InterpError::TranslationResponse {
            message: "response has no choices".to_string(),
        })?;

    match choice.message.and_then(|m| m.content) {
        Some(content) => Ok(Completion::Content(content)),
        None => Ok(Completion::Declined {
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
        }),
    }
}

/// Extract the service's error message from an error body, if it has one.
fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Translation engine backed by an Azure OpenAI chat deployment.
pub struct AzureOpenAiEngine {
    settings: AzureOpenAiSettings,
    client: reqwest::blocking::Client,
}

impl AzureOpenAiEngine {
    pub fn new(settings: AzureOpenAiSettings) -> Result<Self> {
        if settings.endpoint.is_empty() {
            return Err(InterpError::ConfigInvalidValue {
                key: "translation.endpoint".to_string(),
                message: "must be set (or INTERPSH_OPENAI_ENDPOINT)".to_string(),
            });
        }
        if settings.api_key.is_empty() {
            return Err(InterpError::ConfigInvalidValue {
                key: "translation.api_key".to_string(),
                message: "must be set (or INTERPSH_OPENAI_KEY)".to_string(),
            });
        }
        if settings.deployment.is_empty() {
            return Err(InterpError::ConfigInvalidValue {
                key: "translation.deployment".to_string(),
                message: "must be set (or INTERPSH_OPENAI_DEPLOYMENT)".to_string(),
            });
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| InterpError::TranslationRequest {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { settings, client })
    }
}

impl TranslationEngine for AzureOpenAiEngine {
    fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        max_output_tokens: u32,
    ) -> Result<Completion> {
        let body = json!({
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_text},
            ],
            "max_tokens": max_output_tokens,
        });

        let response = self
            .client
            .post(self.settings.completions_url())
            .header("api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    InterpError::TranslationTimeout {
                        timeout_ms: self.settings.timeout.as_millis() as u64,
                    }
                } else {
                    InterpError::TranslationRequest {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let text = response.text().map_err(|e| InterpError::TranslationRequest {
            message: format!("failed to read response: {e}"),
        })?;

        if status.as_u16() == 429 {
            return Err(InterpError::TranslationRateLimited);
        }
        if !status.is_success() {
            return Err(InterpError::TranslationApi {
                status: status.as_u16(),
                message: parse_error_message(&text),
            });
        }

        parse_chat_response(&text)
    }

    fn name(&self) -> &str {
        &self.settings.deployment
    }
}
