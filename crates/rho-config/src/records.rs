use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Persisted credentials record, the middle precedence layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
}

/// Defaults manifest, the lowest file-backed precedence layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub bridge_url: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
    pub bind_host: Option<String>,
    pub bind_port: Option<u16>,
    pub default_project_id: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub prompt_templates: BTreeMap<String, PromptTemplate>,
}

/// Named prompt template shipped in the defaults manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default)]
    pub description: String,
    pub template: String,
}

/// Loads a TOML record, treating a missing or unreadable file as an absent
/// layer rather than a resolution failure.
pub(crate) fn load_toml_record<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "configuration record not found");
        return None;
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "failed to read configuration record");
            return None;
        }
    };
    match toml::from_str::<T>(&raw) {
        Ok(record) => Some(record),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "failed to parse configuration record");
            None
        }
    }
}
