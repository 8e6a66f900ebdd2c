/*!
 * Common test utilities for the sqlchat test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use sqlchat::database::seed;
use sqlchat::errors::{ProviderError, TranslationError};
use sqlchat::translation::SqlTranslator;

/// Route library logs through env_logger once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a STUDENT database holding the given rows
pub fn create_student_db(dir: &Path, filename: &str, rows: &[(&str, &str, &str, i64)]) -> Result<PathBuf> {
    let path = dir.join(filename);
    seed::create_database(&path)?;

    let conn = Connection::open(&path)?;
    for (name, class, section, marks) in rows {
        conn.execute(
            "INSERT INTO STUDENT (NAME, CLASS, SECTION, MARKS) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![name, class, section, marks],
        )?;
    }
    Ok(path)
}

/// The two-row database used by most pipeline tests
pub fn create_krish_john_db(dir: &Path) -> Result<PathBuf> {
    create_student_db(
        dir,
        "student.db",
        &[
            ("Krish", "Data Science", "A", 90),
            ("John", "Data Science", "B", 100),
        ],
    )
}

/// Translator answering from a fixed question to SQL table
#[derive(Clone, Default)]
pub struct ScriptedTranslator {
    answers: Arc<Mutex<HashMap<String, String>>>,
    translate_calls: Arc<AtomicUsize>,
    explain_calls: Arc<AtomicUsize>,
    explain_fails: bool,
}

impl ScriptedTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `question` with `sql`
    pub fn answer(self, question: &str, sql: &str) -> Self {
        self.answers.lock().insert(question.to_string(), sql.to_string());
        self
    }

    /// Make every explain call fail
    pub fn failing_explanations(mut self) -> Self {
        self.explain_fails = true;
        self
    }

    pub fn translate_calls(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    pub fn explain_calls(&self) -> usize {
        self.explain_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlTranslator for ScriptedTranslator {
    async fn translate_to_sql(&self, question: &str) -> Result<String, TranslationError> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        self.answers.lock().get(question).cloned().ok_or_else(|| {
            TranslationError::Provider(ProviderError::ConnectionError(format!(
                "no scripted answer for '{}'",
                question
            )))
        })
    }

    async fn explain(&self, question: &str) -> Result<String, TranslationError> {
        self.explain_calls.fetch_add(1, Ordering::SeqCst);
        if self.explain_fails {
            return Err(TranslationError::EmptyResponse);
        }
        Ok(format!("Selected the rows matching: {}", question))
    }
}
