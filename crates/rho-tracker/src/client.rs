use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use crate::types::{IssueChanges, IssueFilter, NewIssue, TrackerError};

pub const DEFAULT_LIST_LIMIT: u32 = 25;

#[derive(Debug, Clone)]
/// Public struct `TrackerConfig` used across Rho components.
pub struct TrackerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// Issue tracker REST client. Without an API key the client is read-only
/// and write operations fail before any request is sent.
pub struct TrackerClient {
    client: reqwest::Client,
    base_url: String,
    has_credential: bool,
}

impl TrackerClient {
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                "X-Api-Key",
                HeaderValue::from_str(key).map_err(|error| {
                    TrackerError::InvalidResponse(format!("invalid API key header: {error}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            has_credential: api_key.is_some(),
        })
    }

    pub fn is_read_only(&self) -> bool {
        !self.has_credential
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn require_credential(&self) -> Result<(), TrackerError> {
        if self.has_credential {
            Ok(())
        } else {
            Err(TrackerError::CredentialRequired)
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, TrackerError> {
        let mut request = self.client.request(method, self.endpoint(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(TrackerError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }

        // Mutations answer 204 with an empty body; normalize to a success
        // object so callers always get JSON back.
        if status == StatusCode::NO_CONTENT || raw.trim().is_empty() {
            return Ok(json!({
                "success": true,
                "message": "Operation completed successfully",
            }));
        }

        serde_json::from_str(&raw).map_err(TrackerError::Serde)
    }

    fn take_array(mut envelope: Value, key: &str) -> Vec<Value> {
        match envelope.get_mut(key).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }

    /// Fetches one issue, unwrapped from its response envelope.
    pub async fn get_issue(&self, issue_id: u64) -> Result<Value, TrackerError> {
        let mut envelope = self
            .request(Method::GET, &format!("issues/{issue_id}.json"), &[], None)
            .await?;
        match envelope.get_mut("issue").map(Value::take) {
            Some(issue @ Value::Object(_)) => Ok(issue),
            _ => Err(TrackerError::InvalidResponse(format!(
                "issue #{issue_id} response had no issue object"
            ))),
        }
    }

    pub async fn list_issues(&self, filter: IssueFilter) -> Result<Vec<Value>, TrackerError> {
        let mut query = vec![(
            "limit",
            filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).to_string(),
        )];
        if let Some(project_id) = filter.project_id {
            query.push(("project_id", project_id.to_string()));
        }
        if let Some(status_id) = filter.status_id {
            query.push(("status_id", status_id.to_string()));
        }

        let envelope = self.request(Method::GET, "issues.json", &query, None).await?;
        Ok(Self::take_array(envelope, "issues"))
    }

    /// Creates an issue and returns the created issue object.
    pub async fn create_issue(&self, issue: &NewIssue) -> Result<Value, TrackerError> {
        self.require_credential()?;
        let body = json!({ "issue": issue });
        let mut envelope = self
            .request(Method::POST, "issues.json", &[], Some(&body))
            .await?;
        match envelope.get_mut("issue").map(Value::take) {
            Some(created @ Value::Object(_)) => Ok(created),
            _ => Err(TrackerError::InvalidResponse(
                "create response had no issue object".to_string(),
            )),
        }
    }

    /// Applies a partial change set. An empty change set short-circuits to
    /// success without touching the tracker.
    pub async fn update_issue(
        &self,
        issue_id: u64,
        changes: &IssueChanges,
    ) -> Result<String, TrackerError> {
        self.require_credential()?;
        if changes.is_empty() {
            tracing::warn!(issue_id, "update requested with no changes");
            return Ok("No updates provided".to_string());
        }

        let body = json!({ "issue": changes });
        self.request(
            Method::PUT,
            &format!("issues/{issue_id}.json"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(format!("Issue #{issue_id} updated successfully"))
    }

    pub async fn get_projects(&self) -> Result<Vec<Value>, TrackerError> {
        let envelope = self.request(Method::GET, "projects.json", &[], None).await?;
        Ok(Self::take_array(envelope, "projects"))
    }

    pub async fn get_trackers(&self) -> Result<Vec<Value>, TrackerError> {
        let envelope = self.request(Method::GET, "trackers.json", &[], None).await?;
        Ok(Self::take_array(envelope, "trackers"))
    }

    pub async fn get_statuses(&self) -> Result<Vec<Value>, TrackerError> {
        let envelope = self
            .request(Method::GET, "issue_statuses.json", &[], None)
            .await?;
        Ok(Self::take_array(envelope, "issue_statuses"))
    }

    pub async fn get_priorities(&self) -> Result<Vec<Value>, TrackerError> {
        let envelope = self
            .request(Method::GET, "enumerations/issue_priorities.json", &[], None)
            .await?;
        Ok(Self::take_array(envelope, "issue_priorities"))
    }

    /// Availability check used by the service health report.
    pub async fn probe(&self) -> Result<(), TrackerError> {
        self.get_projects().await.map(|_| ())
    }
}
