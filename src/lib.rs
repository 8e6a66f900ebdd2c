/*!
 * # sqlchat - ask a SQL database questions in plain language
 *
 * A Rust library that turns natural-language questions into SQL with a
 * hosted or local language model, runs the SQL, and returns the rows.
 *
 * ## Features
 *
 * - Generate SQL using various AI providers:
 *   - Groq (default), OpenAI and LM Studio through the OpenAI-compatible API
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Query a local SQLite file or, with the `mysql` feature, a MySQL server
 * - Switch the active database at runtime
 * - Cache answers to repeated questions (LRU or unbounded)
 * - Optional explanation of each generated query
 * - Chat history with CSV and JSON export
 * - Text table and bar chart rendering of results
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: Connection targets, the connection manager and its backends
 * - `translation`: Question answering:
 *   - `translation::translator`: Question to SQL through a provider
 *   - `translation::cache`: Results of earlier questions
 *   - `translation::pipeline`: Cache check, translation, execution, caching
 *   - `translation::history`: Chat history and export
 * - `providers`: Client implementations for various LLM providers
 * - `render`: Text rendering of query results
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod providers;
pub mod render;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use database::{ConnectionManager, ConnectionTarget, SqlValue};
pub use errors::{AppError, DatabaseError, ErrorKind, PipelineError, ProviderError, TranslationError};
pub use translation::{ChatHistory, QueryPipeline, QueryResult, ResultCache};
