use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{
    GeneratedIssue, GeneratorClient, GeneratorError, IssueAnalysis, IssueUpdate,
};

pub const DEFAULT_HOSTED_API_BASE: &str = "https://api.anthropic.com/v1";

const HOSTED_MODEL: &str = "claude-3-opus-20240229";
const HOSTED_API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const ANALYZE_MAX_TOKENS: u32 = 2000;

const GENERATE_SYSTEM_PROMPT: &str = "You are an assistant that turns natural language \
descriptions into structured issue data for an issue tracker.\n\n\
Extract the key attributes from the provided prompt and return a JSON object with these fields:\n\
- subject: a clear, concise title for the issue\n\
- description: a detailed description of the issue\n\
- tracker_id: the issue kind (1 for Bug, 2 for Feature, 3 for Support)\n\
- priority_id: the priority level (1 Low, 2 Normal, 3 High, 4 Urgent, 5 Immediate)\n\
- project_id: the project id named in the prompt, defaulting to 1\n\
- assigned_to_id: the assignee user id when one is specified, otherwise omit it\n\n\
Respond with the JSON object only. Do not include explanations or surrounding text.";

const UPDATE_SYSTEM_PROMPT: &str = "You are an assistant that updates issue-tracker issues \
based on natural language descriptions.\n\n\
Compare the current issue data with the requested changes and return a JSON object containing \
ONLY the fields that need to change. Possible fields:\n\
- subject, description, tracker_id, priority_id, assigned_to_id, status_id\n\
- notes: appended to the issue as a new note, never replacing existing notes\n\n\
Respond with the JSON object only. Do not include explanations or surrounding text.";

const ANALYZE_SYSTEM_PROMPT: &str = "You are an assistant that analyzes issue-tracker issues \
and provides insights.\n\n\
Review the provided issue data and return a JSON object with this structure:\n\
{\n\
  \"summary\": \"brief summary of the issue\",\n\
  \"root_causes\": [\"potential cause\", ...],\n\
  \"suggested_actions\": [\"action\", ...],\n\
  \"complexity\": \"Low|Medium|High\",\n\
  \"recommended_priority\": \"Low|Normal|High|Urgent|Immediate\",\n\
  \"patterns\": [\"pattern or similar issue\", ...],\n\
  \"additional_insights\": \"other relevant observations\"\n\
}\n\n\
Respond with the JSON object only. Do not include explanations or surrounding text.";

#[derive(Debug, Clone)]
/// Public struct `HostedKeyConfig` used across Rho components.
pub struct HostedKeyConfig {
    pub api_base: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// Hosted messages-API backend authenticated with an API key.
pub struct HostedKeyClient {
    client: reqwest::Client,
    config: HostedKeyConfig,
}

impl HostedKeyClient {
    pub fn new(config: HostedKeyConfig) -> Result<Self, GeneratorError> {
        if config.api_key.trim().is_empty() {
            return Err(GeneratorError::MissingCredential);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(config.api_key.trim()).map_err(|error| {
                GeneratorError::InvalidResponse(format!("invalid API key header: {error}"))
            })?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(HOSTED_API_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.ends_with("/messages") {
            return base.to_string();
        }

        format!("{base}/messages")
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_content: String,
        max_tokens: u32,
    ) -> Result<String, GeneratorError> {
        let body = json!({
            "model": HOSTED_MODEL,
            "max_tokens": max_tokens,
            "system": system_prompt,
            "messages": [{"role": "user", "content": user_content}],
        });

        let response = self.client.post(self.messages_url()).json(&body).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(GeneratorError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }

        extract_message_text(&raw)
    }
}

#[async_trait]
impl GeneratorClient for HostedKeyClient {
    async fn generate_issue(&self, prompt: &str) -> Result<GeneratedIssue, GeneratorError> {
        let text = self
            .complete(GENERATE_SYSTEM_PROMPT, prompt.to_string(), DEFAULT_MAX_TOKENS)
            .await?;
        decode_structured_payload(&text)
    }

    async fn update_issue(
        &self,
        prompt: &str,
        current_issue: &Value,
    ) -> Result<IssueUpdate, GeneratorError> {
        let rendered = serde_json::to_string_pretty(current_issue)?;
        let content = format!("Current issue data:\n{rendered}\n\nRequested updates:\n{prompt}");
        let text = self
            .complete(UPDATE_SYSTEM_PROMPT, content, DEFAULT_MAX_TOKENS)
            .await?;
        decode_structured_payload(&text)
    }

    async fn analyze_issue(&self, issue: &Value) -> Result<IssueAnalysis, GeneratorError> {
        let rendered = serde_json::to_string_pretty(issue)?;
        let content = format!("Issue data to analyze:\n{rendered}");
        let text = self
            .complete(ANALYZE_SYSTEM_PROMPT, content, ANALYZE_MAX_TOKENS)
            .await?;
        decode_structured_payload(&text)
    }
}

/// Decodes a structured payload from model output, accepting either bare
/// JSON or the first fenced code block.
pub(crate) fn decode_structured_payload<T: DeserializeOwned>(
    raw: &str,
) -> Result<T, GeneratorError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    let fenced = extract_fenced_block(trimmed).ok_or_else(|| {
        GeneratorError::InvalidResponse("response did not contain a JSON payload".to_string())
    })?;
    serde_json::from_str::<T>(fenced).map_err(|error| {
        GeneratorError::InvalidResponse(format!("fenced payload failed to parse: {error}"))
    })
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    Some(after[..end].trim())
}

fn extract_message_text(raw: &str) -> Result<String, GeneratorError> {
    let parsed: MessagesResponse = serde_json::from_str(raw)?;
    parsed
        .content
        .into_iter()
        .find_map(|block| match block {
            ResponseBlock::Text { text } => Some(text),
            ResponseBlock::Other => None,
        })
        .ok_or_else(|| {
            GeneratorError::InvalidResponse("messages response contained no text block".to_string())
        })
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::{
        decode_structured_payload, HostedKeyClient, HostedKeyConfig, DEFAULT_HOSTED_API_BASE,
    };
    use crate::types::{GeneratedIssue, GeneratorClient, GeneratorError};

    fn client_for(base: String, key: &str) -> HostedKeyClient {
        HostedKeyClient::new(HostedKeyConfig {
            api_base: base,
            api_key: key.to_string(),
            request_timeout_ms: 5_000,
        })
        .expect("client builds")
    }

    #[test]
    fn unit_new_rejects_empty_credential() {
        let result = HostedKeyClient::new(HostedKeyConfig {
            api_base: DEFAULT_HOSTED_API_BASE.to_string(),
            api_key: "   ".to_string(),
            request_timeout_ms: 5_000,
        });
        assert!(matches!(result, Err(GeneratorError::MissingCredential)));
    }

    #[test]
    fn unit_messages_url_appends_suffix_once() {
        let client = client_for("https://api.example.com/v1/".to_string(), "key");
        assert_eq!(client.messages_url(), "https://api.example.com/v1/messages");

        let suffixed = client_for("https://api.example.com/v1/messages".to_string(), "key");
        assert_eq!(
            suffixed.messages_url(),
            "https://api.example.com/v1/messages"
        );
    }

    #[test]
    fn unit_decode_structured_payload_accepts_bare_json() {
        let parsed: GeneratedIssue =
            decode_structured_payload(r#"{"subject":"Crash","description":"Crashes on save"}"#)
                .expect("bare payload parses");
        assert_eq!(parsed.subject, "Crash");
    }

    #[test]
    fn regression_decode_structured_payload_falls_back_to_fenced_block() {
        let raw = "Here is the issue you asked for:\n```json\n{\"subject\":\"Crash\",\"description\":\"Crashes on save\"}\n```\nLet me know if you need more.";
        let parsed: GeneratedIssue =
            decode_structured_payload(raw).expect("fenced payload parses");
        assert_eq!(parsed.description, "Crashes on save");
    }

    #[test]
    fn unit_decode_structured_payload_rejects_prose() {
        let result: Result<GeneratedIssue, _> =
            decode_structured_payload("I could not produce structured data.");
        assert!(matches!(result, Err(GeneratorError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn functional_generate_issue_round_trips_messages_wire() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/messages")
                .header("x-api-key", "secret-key")
                .header("anthropic-version", "2023-06-01");
            then.status(200).json_body(json!({
                "content": [{
                    "type": "text",
                    "text": "{\"subject\":\"Login crash\",\"description\":\"Crash after login\",\"tracker_id\":1,\"priority_id\":3}"
                }]
            }));
        });

        let client = client_for(server.base_url(), "secret-key");
        let issue = client
            .generate_issue("The app crashes right after login")
            .await
            .expect("generate succeeds");

        mock.assert_calls(1);
        assert_eq!(issue.subject, "Login crash");
        assert_eq!(issue.tracker_id, Some(1));
    }

    #[tokio::test]
    async fn regression_non_success_status_surfaces_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/messages");
            then.status(429).body("overloaded");
        });

        let client = client_for(server.base_url(), "secret-key");
        let error = client
            .generate_issue("anything")
            .await
            .expect_err("status error expected");
        match error {
            GeneratorError::HttpStatus { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
