/*!
 * Natural-language to SQL query answering.
 *
 * This module is split into several submodules:
 *
 * - `translator`: turns questions into SQL through a completion provider
 * - `cache`: results of earlier questions, keyed by the exact question text
 * - `pipeline`: cache check, translation, execution and caching for one question
 * - `history`: per-session chat history and its CSV/JSON export
 */

// Re-export main types for easier usage
pub use self::cache::{CachePolicy, ResultCache};
pub use self::history::{ChatHistory, ExportFormat, HistoryEntry};
pub use self::pipeline::{PipelineConfig, QueryPipeline, QueryResult};
pub use self::translator::{LlmTranslator, PromptPair, SqlTranslator};

// Submodules
pub mod cache;
pub mod history;
pub mod pipeline;
pub mod translator;
