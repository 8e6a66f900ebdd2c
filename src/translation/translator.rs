/*!
 * Natural-language to SQL translation through a completion provider.
 *
 * The model is treated as an opaque oracle. Replies are trimmed and returned
 * as-is; nothing checks that the text is valid SQL.
 */

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use crate::errors::TranslationError;
use crate::providers::{CompletionRequest, Provider};

/// Placeholder replaced by the user's question in prompt templates
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// Capability that turns questions into SQL and explains the result
#[async_trait]
pub trait SqlTranslator: Send + Sync {
    /// Produce a SQL statement answering `question`
    async fn translate_to_sql(&self, question: &str) -> Result<String, TranslationError>;

    /// Describe how the SQL for `question` was produced
    async fn explain(&self, question: &str) -> Result<String, TranslationError>;
}

/// System instruction and user template for one kind of request
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPair {
    pub system: String,
    /// User message, with `{question}` replaced by the question
    pub user_template: String,
}

impl PromptPair {
    pub fn new(system: impl Into<String>, user_template: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user_template: user_template.into(),
        }
    }

    fn user_text(&self, question: &str) -> String {
        self.user_template.replace(QUESTION_PLACEHOLDER, question)
    }

    pub fn default_sql() -> Self {
        Self::new(
            "You are an assistant that generates SQL queries.",
            "Generate a SQL query for: {question}",
        )
    }

    pub fn default_explain() -> Self {
        Self::new(
            "You are an assistant that explains SQL query generation.",
            "Explain how the SQL query was generated for: {question}",
        )
    }
}

/// Translator backed by an LLM provider
#[derive(Debug, Clone)]
pub struct LlmTranslator {
    provider: Arc<dyn Provider>,
    model: String,
    sql_prompt: PromptPair,
    explain_prompt: PromptPair,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            sql_prompt: PromptPair::default_sql(),
            explain_prompt: PromptPair::default_explain(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_prompts(mut self, sql_prompt: PromptPair, explain_prompt: PromptPair) -> Self {
        self.sql_prompt = sql_prompt;
        self.explain_prompt = explain_prompt;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn ask(&self, prompt: &PromptPair, question: &str) -> Result<String, TranslationError> {
        let request = CompletionRequest {
            system_instruction: prompt.system.clone(),
            user_text: prompt.user_text(question),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.provider.complete(request).await?;
        if let (Some(prompt_tokens), Some(completion_tokens)) =
            (response.prompt_tokens, response.completion_tokens)
        {
            debug!(
                "{} used {} prompt / {} completion tokens",
                self.provider.name(),
                prompt_tokens,
                completion_tokens
            );
        }

        let text = response.text.trim();
        if text.is_empty() {
            return Err(TranslationError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl SqlTranslator for LlmTranslator {
    async fn translate_to_sql(&self, question: &str) -> Result<String, TranslationError> {
        let sql = self.ask(&self.sql_prompt, question).await?;
        debug!("Generated SQL: {}", sql);
        Ok(sql)
    }

    async fn explain(&self, question: &str) -> Result<String, TranslationError> {
        self.ask(&self.explain_prompt, question).await
    }
}
