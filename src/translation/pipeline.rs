/*!
 * Query pipeline: question in, rows out.
 *
 * Each run goes through these stages:
 * 1. Cache check: an identical earlier question returns the stored result
 * 2. Translating: the translator produces SQL
 * 3. Executing: the SQL runs on the active connection (timed)
 * 4. Caching: the packaged result is stored under the question
 *
 * A failure at any stage is returned as-is, tagged with its stage, and
 * nothing is cached.
 */

use log::{debug, warn};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cache::ResultCache;
use super::translator::SqlTranslator;
use crate::database::{ConnectionManager, Row};
use crate::errors::{PipelineError, Stage};

/// Outcome of one successful pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// The SQL exactly as the translator returned it
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows changed, for statements that are not reads
    pub rows_affected: u64,
    /// Present only when explanation was requested and succeeded
    pub explanation: Option<String>,
    /// Seconds spent executing the SQL
    pub elapsed_secs: f64,
}

/// Pipeline behavior switches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    /// Ask the translator to explain each new query
    pub explain: bool,
    /// Limit for each translator call, `None` to wait indefinitely
    pub translation_timeout: Option<Duration>,
    /// Limit for statement execution, `None` to wait indefinitely
    pub execution_timeout: Option<Duration>,
}

/// Orchestrates cache, translator and connection manager
pub struct QueryPipeline {
    translator: Arc<dyn SqlTranslator>,
    manager: Arc<ConnectionManager>,
    cache: ResultCache,
    config: PipelineConfig,
}

impl QueryPipeline {
    pub fn new(
        translator: Arc<dyn SqlTranslator>,
        manager: Arc<ConnectionManager>,
        cache: ResultCache,
        config: PipelineConfig,
    ) -> Self {
        Self {
            translator,
            manager,
            cache,
            config,
        }
    }

    /// Answer `question`, from the cache when possible.
    ///
    /// A cache hit returns the stored result unchanged, including the
    /// execution time recorded when it was first computed.
    pub async fn run(&self, question: &str) -> Result<Arc<QueryResult>, PipelineError> {
        if let Some(cached) = self.cache.lookup(question) {
            return Ok(cached);
        }

        let sql = with_timeout(
            Stage::Translating,
            self.config.translation_timeout,
            self.translator.translate_to_sql(question),
        )
        .await?
        .map_err(PipelineError::Translation)?;

        // A switch that clears the cache while this runs makes the result stale
        let generation = self.cache.generation();
        let started = Instant::now();
        let execution = with_timeout(
            Stage::Executing,
            self.config.execution_timeout,
            self.manager.execute(&sql, &[]),
        )
        .await?
        .map_err(PipelineError::Execution)?;
        let elapsed_secs = started.elapsed().as_secs_f64();
        debug!("Pipeline executed '{}' in {:.3}s", sql, elapsed_secs);

        let explanation = if self.config.explain {
            self.explain(question).await
        } else {
            None
        };

        let result = Arc::new(QueryResult {
            sql,
            columns: execution.columns,
            rows: execution.rows,
            rows_affected: execution.rows_affected,
            explanation,
            elapsed_secs,
        });
        self.cache.store_if_current(question, Arc::clone(&result), generation);

        Ok(result)
    }

    /// Best-effort explanation; failures are logged and dropped
    async fn explain(&self, question: &str) -> Option<String> {
        let outcome = with_timeout(
            Stage::Translating,
            self.config.translation_timeout,
            self.translator.explain(question),
        )
        .await;

        match outcome {
            Ok(Ok(explanation)) => Some(explanation),
            Ok(Err(e)) => {
                warn!("Could not explain query: {}", e);
                None
            }
            Err(e) => {
                warn!("Could not explain query: {}", e);
                None
            }
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Run `future`, failing with `Timeout` for `stage` once `limit` expires
async fn with_timeout<F: Future>(
    stage: Stage,
    limit: Option<Duration>,
    future: F,
) -> Result<F::Output, PipelineError> {
    match limit {
        Some(after) => tokio::time::timeout(after, future)
            .await
            .map_err(|_| PipelineError::Timeout { stage, after }),
        None => Ok(future.await),
    }
}
