//! Scripted model for tests: replays canned responses and records prompts

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatPrompt, LanguageModel};
use crate::error::{Result, WeftError};

/// Replays a fixed script of responses, one per call, repeating the last
/// entry once the script runs out. Every received prompt is recorded.
pub struct MockModel {
    script: Vec<String>,
    calls: Mutex<Vec<ChatPrompt>>,
}

impl MockModel {
    pub fn new(script: Vec<String>) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A mock that answers every call with the same text.
    pub fn always(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Prompts received so far, in call order.
    pub fn received(&self) -> Vec<ChatPrompt> {
        self.calls.lock().expect("mock lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock").len()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &ChatPrompt, _model: &str) -> Result<String> {
        let mut calls = self.calls.lock().expect("mock lock");
        calls.push(prompt.clone());
        let index = calls.len() - 1;

        self.script
            .get(index)
            .or_else(|| self.script.last())
            .cloned()
            .ok_or_else(|| WeftError::ModelCallFailed {
                reason: "mock script is empty".to_string(),
            })
    }
}
