//! Language-model provider abstraction
//!
//! The executor talks to [`LanguageModel`] only; the concrete provider is
//! chosen by name through [`ModelFactory`], which caches instances so the
//! underlying HTTP client and connection pool are shared across invocations.

mod mock;
mod openai;

pub use mock::MockModel;
pub use openai::OpenAiModel;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::config::WeftConfig;
use crate::error::{Result, WeftError};

/// One synthesis request: resolved prompts plus prior conversation turns.
#[derive(Debug, Clone, Default)]
pub struct ChatPrompt {
    pub system: Option<String>,
    pub user: String,
    /// Prior turns as `{"role": …, "content": …}` objects, oldest first
    pub history: Vec<Value>,
}

impl ChatPrompt {
    pub fn new(system: Option<String>, user: impl Into<String>) -> Self {
        Self {
            system,
            user: user.into(),
            history: Vec::new(),
        }
    }
}

/// LLM provider abstraction for synthesis calls.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name, used for registry lookups and logging
    fn name(&self) -> &str;

    /// Run one completion and return the raw response text.
    async fn complete(&self, prompt: &ChatPrompt, model: &str) -> Result<String>;
}

/// Name-keyed provider cache.
///
/// Instances are built lazily on first use and reused afterwards, so every
/// flow invocation shares one HTTP connection pool per provider.
pub struct ModelFactory {
    config: WeftConfig,
    cache: DashMap<String, Arc<dyn LanguageModel>>,
}

impl ModelFactory {
    pub fn new(config: WeftConfig) -> Self {
        Self {
            config,
            cache: DashMap::new(),
        }
    }

    /// Pre-register a provider instance under a name (tests use this to
    /// install a [`MockModel`]).
    pub fn register(&self, name: impl Into<String>, model: Arc<dyn LanguageModel>) {
        self.cache.insert(name.into(), model);
    }

    /// Resolve a provider by name, building and caching it on first use.
    pub fn get(&self, provider: &str) -> Result<Arc<dyn LanguageModel>> {
        if let Some(cached) = self.cache.get(provider) {
            return Ok(Arc::clone(cached.value()));
        }

        let built: Arc<dyn LanguageModel> = match provider {
            "openai" => Arc::new(OpenAiModel::new(&self.config)?),
            other => {
                return Err(WeftError::ProviderNotConfigured {
                    provider: other.to_string(),
                })
            }
        };

        // Entry API so a concurrent first use builds at most one instance
        let entry = self
            .cache
            .entry(provider.to_string())
            .or_insert_with(|| built);
        Ok(Arc::clone(entry.value()))
    }

    /// Effective model name for an invocation: request override first,
    /// then the configured default.
    pub fn model_for(&self, requested: Option<&str>) -> String {
        requested.unwrap_or_else(|| self.config.model()).to_string()
    }

    /// Configured provider name, falling back to openai.
    pub fn default_provider(&self) -> &str {
        self.config.defaults.provider.as_deref().unwrap_or("openai")
    }
}
