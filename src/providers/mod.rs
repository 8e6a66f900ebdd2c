/*!
 * Provider implementations for the language models that write SQL.
 *
 * This module contains client implementations for various LLM providers:
 * - OpenAI-compatible: Groq, OpenAI and LM Studio chat completions
 * - Anthropic: Anthropic messages API
 * - Ollama: Local LLM server
 * - Mock: scripted behaviors for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One prompt sent to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction framing the task
    pub system_instruction: String,
    /// The user message
    pub user_text: String,
    /// Model identifier understood by the provider
    pub model: String,
    /// Sampling temperature, provider default when unset
    pub temperature: Option<f32>,
    /// Completion length limit, provider default when unset
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        system_instruction: impl Into<String>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_text: user_text.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Text produced by a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind an `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The prompt to complete
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The generated text or an error
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
