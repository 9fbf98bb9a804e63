use async_trait::async_trait;
use serde_json::Value;

use crate::types::{
    GeneratedIssue, GeneratorClient, GeneratorError, IssueAnalysis, IssueUpdate,
};

const MOCK_SUBJECT_LIMIT: usize = 80;

#[derive(Debug, Clone, Copy, Default)]
/// Deterministic in-process generator used for development and as the
/// fallback when a bridge endpoint would point back at this service.
pub struct MockClient;

impl MockClient {
    pub fn new() -> Self {
        Self
    }
}

fn subject_from_prompt(prompt: &str) -> String {
    let first_line = prompt
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Untitled request");
    first_line.chars().take(MOCK_SUBJECT_LIMIT).collect()
}

fn issue_id_of(issue: &Value) -> Option<u64> {
    issue.get("id").and_then(Value::as_u64)
}

#[async_trait]
impl GeneratorClient for MockClient {
    async fn generate_issue(&self, prompt: &str) -> Result<GeneratedIssue, GeneratorError> {
        Ok(GeneratedIssue {
            subject: subject_from_prompt(prompt),
            description: format!("Mock issue generated from prompt:\n{prompt}"),
            project_id: Some(1),
            tracker_id: Some(1),
            priority_id: Some(2),
            assigned_to_id: None,
        })
    }

    async fn update_issue(
        &self,
        prompt: &str,
        current_issue: &Value,
    ) -> Result<IssueUpdate, GeneratorError> {
        let reference = issue_id_of(current_issue)
            .map(|id| format!("issue #{id}"))
            .unwrap_or_else(|| "the issue".to_string());
        Ok(IssueUpdate {
            notes: Some(format!("Mock update for {reference}: {prompt}")),
            ..IssueUpdate::default()
        })
    }

    async fn analyze_issue(&self, issue: &Value) -> Result<IssueAnalysis, GeneratorError> {
        let reference = issue_id_of(issue)
            .map(|id| format!("issue #{id}"))
            .unwrap_or_else(|| "the issue".to_string());
        Ok(IssueAnalysis {
            summary: format!("Mock analysis of {reference}"),
            root_causes: vec!["Not enough information to determine a root cause".to_string()],
            suggested_actions: vec!["Review the issue manually".to_string()],
            complexity: "Medium".to_string(),
            recommended_priority: "Normal".to_string(),
            patterns: Vec::new(),
            additional_insights: "Produced by the deterministic mock generator".to_string(),
        })
    }
}
