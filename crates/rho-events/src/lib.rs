//! Append-only action log for orchestrated issue mutations.
//!
//! Every attempted operation lands here as one JSON object per line,
//! whether it succeeded or failed. Reads are non-fatal in the face of
//! corruption: malformed lines are skipped and counted, never surfaced
//! as errors.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed failures surfaced by the action log.
#[derive(Debug, Error)]
pub enum ActionLogError {
    #[error("failed to append action record: {0}")]
    Append(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of orchestrated operation a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Analyze,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Analyze => "analyze",
        }
    }
}

/// One recorded orchestration attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub timestamp: String,
    pub action_type: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<u64>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub response: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ActionLogEntry {
    /// Entry for an operation that ran to completion.
    pub fn completed(
        action_type: ActionKind,
        issue_id: Option<u64>,
        content: String,
        prompt: String,
        response: String,
    ) -> Self {
        Self {
            timestamp: now_rfc3339(),
            action_type,
            issue_id,
            content,
            prompt,
            response,
            success: true,
            error_message: None,
        }
    }

    /// Entry for an operation that failed after passing the rate gate.
    pub fn failed(
        action_type: ActionKind,
        issue_id: Option<u64>,
        prompt: String,
        error_message: String,
    ) -> Self {
        Self {
            timestamp: now_rfc3339(),
            action_type,
            issue_id,
            content: String::new(),
            prompt,
            response: String::new(),
            success: false,
            error_message: Some(error_message),
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn timestamp_sort_key(entry: &ActionLogEntry) -> i64 {
    DateTime::parse_from_rfc3339(&entry.timestamp)
        .map(|parsed| parsed.timestamp_millis())
        .unwrap_or(0)
}

/// Durable, append-only log of orchestrated actions.
#[derive(Debug, Clone)]
pub struct ActionLog {
    path: PathBuf,
}

impl ActionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Appends one entry as a single line. Existing records are never
    /// rewritten.
    pub fn append(&self, entry: &ActionLogEntry) -> Result<(), ActionLogError> {
        let line = serde_json::to_string(entry)?;
        rho_core::append_jsonl_line(self.path.as_path(), &line)
            .map_err(|error| ActionLogError::Append(format!("{error:#}")))
    }

    /// Reads up to `limit` entries, most recent first. Ties on timestamp
    /// keep append order. Malformed lines are skipped and counted.
    pub fn read(&self, limit: usize) -> Result<(Vec<ActionLogEntry>, usize), ActionLogError> {
        if !self.path.exists() {
            return Ok((Vec::new(), 0));
        }

        let raw = std::fs::read_to_string(self.path.as_path())?;
        let mut entries = Vec::new();
        let mut malformed = 0_usize;
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ActionLogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    malformed = malformed.saturating_add(1);
                    tracing::warn!(
                        path = %self.path.display(),
                        %error,
                        "skipping malformed action log line"
                    );
                }
            }
        }

        // Stable sort keeps equal timestamps in append order.
        entries.sort_by(|a, b| timestamp_sort_key(b).cmp(&timestamp_sort_key(a)));
        entries.truncate(limit);
        Ok((entries, malformed))
    }
}
