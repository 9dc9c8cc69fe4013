//! OpenAI provider using the chat completions API

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ChatPrompt, LanguageModel};
use crate::config::WeftConfig;
use crate::error::{Result, WeftError};
use crate::util::{CONNECT_TIMEOUT, MODEL_TIMEOUT};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiModel {
    api_key: String,
    client: Client,
}

impl OpenAiModel {
    pub fn new(config: &WeftConfig) -> Result<Self> {
        let api_key = config
            .openai_key()
            .ok_or_else(|| WeftError::MissingApiKey {
                provider: "openai".to_string(),
            })?
            .to_string();

        let client = Client::builder()
            .timeout(MODEL_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent("weft/0.1")
            .build()
            .map_err(|e| WeftError::ProviderApiError {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self { api_key, client })
    }

    fn messages(prompt: &ChatPrompt) -> Vec<Value> {
        let mut messages = Vec::with_capacity(prompt.history.len() + 2);
        if let Some(system) = &prompt.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.extend(prompt.history.iter().cloned());
        messages.push(json!({"role": "user", "content": prompt.user}));
        messages
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &ChatPrompt, model: &str) -> Result<String> {
        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": model,
                "messages": Self::messages(prompt),
            }))
            .send()
            .await
            .map_err(|e| WeftError::ModelCallFailed {
                reason: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WeftError::ProviderApiError {
                message: format!("OpenAI API error {status}: {body}"),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| WeftError::ModelCallFailed {
                reason: format!("invalid response body: {e}"),
            })?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WeftError::ModelCallFailed {
                reason: "response carries no message content".to_string(),
            })
    }
}
