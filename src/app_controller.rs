use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

use crate::app_config::{Config, TranslationConfig, TranslationProvider};
use crate::database::target::FileTarget;
use crate::database::{ConnectionManager, ConnectionTarget};
use crate::errors::PipelineError;
use crate::providers::anthropic::Anthropic;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::Provider;
use crate::render;
use crate::translation::{ChatHistory, LlmTranslator, QueryPipeline, QueryResult, ResultCache, SqlTranslator};

// @module: Application controller wiring config, provider, database and pipeline

/// Build the completion provider selected in `config`
pub fn create_provider(config: &TranslationConfig) -> Arc<dyn Provider> {
    let endpoint = config.get_endpoint();
    let timeout_secs = config.get_timeout_secs();

    match config.provider {
        TranslationProvider::Groq => {
            Arc::new(OpenAI::new(config.get_api_key(), endpoint, timeout_secs).with_label("groq"))
        }
        TranslationProvider::OpenAI => {
            Arc::new(OpenAI::new(config.get_api_key(), endpoint, timeout_secs))
        }
        TranslationProvider::LMStudio => {
            // LM Studio often doesn't require an API key; use a default if empty
            let api_key = {
                let k = config.get_api_key();
                if k.is_empty() { "lm-studio".to_string() } else { k }
            };
            Arc::new(OpenAI::new(api_key, endpoint, timeout_secs).with_label("lmstudio"))
        }
        TranslationProvider::Anthropic => {
            Arc::new(Anthropic::new(config.get_api_key(), endpoint, timeout_secs))
        }
        TranslationProvider::Ollama => Arc::new(Ollama::from_url(endpoint, timeout_secs)),
    }
}

/// Main application controller for natural-language queries
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Completion provider, kept for connection checks
    provider: Option<Arc<dyn Provider>>,
    pipeline: QueryPipeline,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let provider = create_provider(&config.translation);
        let common = &config.translation.common;
        let translator = LlmTranslator::new(Arc::clone(&provider), config.translation.get_model())
            .with_prompts(common.sql_prompt(), common.explain_prompt())
            .with_temperature(common.temperature)
            .with_max_tokens(common.max_tokens);

        debug!(
            "Using {} with model {}",
            config.translation.provider.display_name(),
            translator.model()
        );

        let mut controller = Self::with_translator(config, Arc::new(translator));
        controller.provider = Some(provider);
        Ok(controller)
    }

    /// Create a controller around an existing translator
    pub fn with_translator(config: Config, translator: Arc<dyn SqlTranslator>) -> Self {
        let pipeline = QueryPipeline::new(
            translator,
            Arc::new(ConnectionManager::new()),
            ResultCache::new(config.pipeline.cache.to_policy()),
            config.pipeline.to_pipeline_config(),
        );

        Self {
            config,
            provider: None,
            pipeline,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }

    /// Connect to the database named in the configuration
    pub async fn connect(&self) -> Result<()> {
        let target = self.config.database.to_target()?;
        self.pipeline
            .manager()
            .connect(target.clone())
            .await
            .with_context(|| format!("Failed to connect to {}", target))
    }

    /// Switch the active database to another SQLite file.
    ///
    /// Cached results belong to the previous database, so the cache is
    /// emptied as well.
    pub async fn switch_database(&self, path: &Path) -> Result<()> {
        let target = ConnectionTarget::File(FileTarget {
            path: path.to_path_buf(),
            read_only: self.config.database.read_only,
        });
        let switched = self.pipeline.manager().switch_to(target).await;
        // Cleared after the switch so no in-flight answer for the old file survives
        self.pipeline.cache().clear();
        switched.with_context(|| format!("Failed to switch to database {:?}", path))
    }

    /// Answer `question` and record the exchange in `history`
    pub async fn ask(
        &self,
        history: &mut ChatHistory,
        question: &str,
    ) -> Result<Arc<QueryResult>, PipelineError> {
        match self.pipeline.run(question).await {
            Ok(result) => {
                let mut response = render::format_table(&result);
                if let Some(explanation) = &result.explanation {
                    response.push_str("\n\n");
                    response.push_str(explanation);
                }
                history.record(question, result.sql.clone(), response);
                Ok(result)
            }
            Err(e) => {
                history.record(question, "", e.user_message());
                Err(e)
            }
        }
    }

    /// Send a tiny request to the configured provider
    pub async fn check_provider(&self) -> Result<()> {
        let provider = self
            .provider
            .as_ref()
            .context("No provider configured for this controller")?;
        let model = self.config.translation.get_model();

        provider
            .test_connection(&model)
            .await
            .with_context(|| format!("{} is not reachable", provider.name()))?;
        info!("{} answered with model {}", provider.name(), model);
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.pipeline.manager().close().await?;
        Ok(())
    }
}
