use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Enumerates supported `GeneratorError` values.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("missing generator credential")]
    MissingCredential,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generator returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid generator response: {0}")]
    InvalidResponse(String),
}

/// Structured fields produced for a new tracker issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedIssue {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u64>,
}

/// Partial field set produced for an existing issue; absent fields stay
/// untouched on the tracker side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Insight payload produced when analyzing an existing issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub root_causes: Vec<String>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub complexity: String,
    #[serde(default)]
    pub recommended_priority: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub additional_insights: String,
}

#[async_trait]
/// Trait contract for `GeneratorClient` behavior.
///
/// Implementations are stateless and constructed fresh per orchestrated
/// call from the current configuration snapshot.
pub trait GeneratorClient: Send + Sync {
    /// Turns a free-form prompt into structured fields for a new issue.
    async fn generate_issue(&self, prompt: &str) -> Result<GeneratedIssue, GeneratorError>;

    /// Derives a partial update from a prompt and the current issue state.
    async fn update_issue(
        &self,
        prompt: &str,
        current_issue: &Value,
    ) -> Result<IssueUpdate, GeneratorError>;

    /// Produces an analysis payload for an existing issue.
    async fn analyze_issue(&self, issue: &Value) -> Result<IssueAnalysis, GeneratorError>;
}
