/*!
 * Chat history for one session, with CSV and JSON export.
 *
 * The history is owned by the caller and passed in explicitly; it lives for
 * one session and is only emptied by `clear`. Exports are snapshots.
 */

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::file_utils::FileManager;

/// Greeting shown at the start of every session
pub const GREETING: &str = "How can I help you?";

/// One question and what came back for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Local>,
    pub question: String,
    /// Generated SQL, empty when translation failed
    pub sql: String,
    /// Text shown to the user
    pub response: String,
}

/// Export file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(anyhow!("Unknown export format: {} (expected csv or json)", s)),
        }
    }
}

/// Ordered record of one chat session
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    entries: Vec<HistoryEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an exchange and return it
    pub fn record(
        &mut self,
        question: impl Into<String>,
        sql: impl Into<String>,
        response: impl Into<String>,
    ) -> &HistoryEntry {
        self.entries.push(HistoryEntry {
            id: Uuid::new_v4(),
            timestamp: Local::now(),
            question: question.into(),
            sql: sql.into(),
            response: response.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Render as CSV with a `timestamp,question,sql,response` header
    pub fn to_csv(&self) -> String {
        let mut out = String::from("timestamp,question,sql,response\r\n");
        for entry in &self.entries {
            let fields = [
                entry.timestamp.to_rfc3339(),
                entry.question.clone(),
                entry.sql.clone(),
                entry.response.clone(),
            ];
            let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
            out.push_str(&line.join(","));
            out.push_str("\r\n");
        }
        out
    }

    /// Render as a pretty-printed JSON array of records
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.entries).context("Failed to serialize chat history")
    }

    /// Write a snapshot of the history to `path`
    pub fn export<P: AsRef<Path>>(&self, path: P, format: ExportFormat) -> Result<()> {
        let content = match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Json => self.to_json()?,
        };
        FileManager::write_to_file(&path, &content)?;
        info!(
            "Exported {} history entries to {:?}",
            self.entries.len(),
            path.as_ref()
        );
        Ok(())
    }
}

/// Quote a field when it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
