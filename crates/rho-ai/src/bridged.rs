use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::types::{
    GeneratedIssue, GeneratorClient, GeneratorError, IssueAnalysis, IssueUpdate,
};

#[derive(Debug, Clone)]
/// Public struct `BridgedConfig` used across Rho components.
pub struct BridgedConfig {
    pub bridge_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// Backend that forwards generation requests to a local bridge endpoint.
/// The bridge owns model access; no credential is required here.
pub struct BridgedClient {
    client: reqwest::Client,
    config: BridgedConfig,
}

impl BridgedClient {
    pub fn new(config: BridgedConfig) -> Result<Self, GeneratorError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/api/generate",
            self.config.bridge_url.trim_end_matches('/')
        )
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        operation: &str,
        prompt: Option<&str>,
        context: Option<&Value>,
    ) -> Result<T, GeneratorError> {
        let body = json!({
            "operation": operation,
            "prompt": prompt,
            "context": context,
        });

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(GeneratorError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }

        serde_json::from_str::<T>(&raw).map_err(GeneratorError::Serde)
    }
}

#[async_trait]
impl GeneratorClient for BridgedClient {
    async fn generate_issue(&self, prompt: &str) -> Result<GeneratedIssue, GeneratorError> {
        self.dispatch("generate_issue", Some(prompt), None).await
    }

    async fn update_issue(
        &self,
        prompt: &str,
        current_issue: &Value,
    ) -> Result<IssueUpdate, GeneratorError> {
        self.dispatch("update_issue", Some(prompt), Some(current_issue))
            .await
    }

    async fn analyze_issue(&self, issue: &Value) -> Result<IssueAnalysis, GeneratorError> {
        self.dispatch("analyze_issue", None, Some(issue)).await
    }
}
