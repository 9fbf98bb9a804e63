use async_trait::async_trait;
use reqwest::Url;
use rho_config::{GeneratorProvider, ResolvedConfig};
use serde_json::Value;

use crate::bridged::{BridgedClient, BridgedConfig};
use crate::hosted::{HostedKeyClient, HostedKeyConfig, DEFAULT_HOSTED_API_BASE};
use crate::mock::MockClient;
use crate::types::{
    GeneratedIssue, GeneratorClient, GeneratorError, IssueAnalysis, IssueUpdate,
};

/// Concrete backend selected for one orchestrated call. The variant is
/// observable so callers and tests can assert which backend was chosen.
#[derive(Debug, Clone)]
pub enum SelectedGenerator {
    Hosted(HostedKeyClient),
    Bridged(BridgedClient),
    Mock(MockClient),
}

#[async_trait]
impl GeneratorClient for SelectedGenerator {
    async fn generate_issue(&self, prompt: &str) -> Result<GeneratedIssue, GeneratorError> {
        match self {
            Self::Hosted(client) => client.generate_issue(prompt).await,
            Self::Bridged(client) => client.generate_issue(prompt).await,
            Self::Mock(client) => client.generate_issue(prompt).await,
        }
    }

    async fn update_issue(
        &self,
        prompt: &str,
        current_issue: &Value,
    ) -> Result<IssueUpdate, GeneratorError> {
        match self {
            Self::Hosted(client) => client.update_issue(prompt, current_issue).await,
            Self::Bridged(client) => client.update_issue(prompt, current_issue).await,
            Self::Mock(client) => client.update_issue(prompt, current_issue).await,
        }
    }

    async fn analyze_issue(&self, issue: &Value) -> Result<IssueAnalysis, GeneratorError> {
        match self {
            Self::Hosted(client) => client.analyze_issue(issue).await,
            Self::Bridged(client) => client.analyze_issue(issue).await,
            Self::Mock(client) => client.analyze_issue(issue).await,
        }
    }
}

/// Builds the generator backend for the current configuration snapshot.
///
/// `mock_override` short-circuits selection for development runs. A bridge
/// endpoint that resolves back to this service's own bind address falls
/// back to the mock backend instead of looping requests into ourselves.
pub fn build_generator_client(
    config: &ResolvedConfig,
    mock_override: bool,
) -> Result<SelectedGenerator, GeneratorError> {
    if mock_override {
        return Ok(SelectedGenerator::Mock(MockClient::new()));
    }

    match config.generator_provider {
        GeneratorProvider::Mock => Ok(SelectedGenerator::Mock(MockClient::new())),
        GeneratorProvider::Hosted => {
            let api_key = config
                .generator_api_key
                .clone()
                .ok_or(GeneratorError::MissingCredential)?;
            let client = HostedKeyClient::new(HostedKeyConfig {
                api_base: DEFAULT_HOSTED_API_BASE.to_string(),
                api_key,
                request_timeout_ms: config.request_timeout_ms,
            })?;
            Ok(SelectedGenerator::Hosted(client))
        }
        GeneratorProvider::Bridge => {
            if bridge_targets_own_bind(
                config.bridge_url.as_str(),
                config.bind_host.as_str(),
                config.bind_port,
            ) {
                tracing::warn!(
                    bridge_url = %config.bridge_url,
                    bind_port = config.bind_port,
                    "bridge endpoint points at this service, using mock backend"
                );
                return Ok(SelectedGenerator::Mock(MockClient::new()));
            }
            let client = BridgedClient::new(BridgedConfig {
                bridge_url: config.bridge_url.clone(),
                request_timeout_ms: config.request_timeout_ms,
            })?;
            Ok(SelectedGenerator::Bridged(client))
        }
    }
}

/// Local aliases collapse to one class so a bridge URL of `localhost`
/// matches a bind host of `0.0.0.0`.
fn host_class(host: &str) -> String {
    match host.to_ascii_lowercase().as_str() {
        "localhost" | "127.0.0.1" | "0.0.0.0" => "loopback".to_string(),
        other => other.to_string(),
    }
}

fn bridge_targets_own_bind(bridge_url: &str, bind_host: &str, bind_port: u16) -> bool {
    let Ok(parsed) = Url::parse(bridge_url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let Some(port) = parsed.port_or_known_default() else {
        return false;
    };

    port == bind_port && host_class(host) == host_class(bind_host)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rho_config::{GeneratorProvider, ResolvedConfig};

    use super::{bridge_targets_own_bind, build_generator_client, SelectedGenerator};
    use crate::types::GeneratorError;

    fn config_fixture(provider: GeneratorProvider) -> ResolvedConfig {
        ResolvedConfig {
            tracker_url: "https://tracker.example.com".to_string(),
            tracker_api_key: Some("tracker-key".to_string()),
            generator_provider: provider,
            generator_api_key: None,
            bridge_url: "http://localhost:9000".to_string(),
            rate_limit_per_minute: 60,
            bind_host: "0.0.0.0".to_string(),
            bind_port: 5000,
            default_project_id: 1,
            request_timeout_ms: 5_000,
            prompt_templates: BTreeMap::new(),
        }
    }

    #[test]
    fn unit_factory_honors_mock_tag_and_override() {
        let mock_tagged = build_generator_client(&config_fixture(GeneratorProvider::Mock), false)
            .expect("mock builds");
        assert!(matches!(mock_tagged, SelectedGenerator::Mock(_)));

        let overridden = build_generator_client(&config_fixture(GeneratorProvider::Hosted), true)
            .expect("override builds");
        assert!(matches!(overridden, SelectedGenerator::Mock(_)));
    }

    #[test]
    fn functional_factory_requires_hosted_credential() {
        let missing = build_generator_client(&config_fixture(GeneratorProvider::Hosted), false);
        assert!(matches!(missing, Err(GeneratorError::MissingCredential)));

        let mut config = config_fixture(GeneratorProvider::Hosted);
        config.generator_api_key = Some("hosted-key".to_string());
        let built = build_generator_client(&config, false).expect("hosted builds");
        assert!(matches!(built, SelectedGenerator::Hosted(_)));
    }

    #[test]
    fn functional_self_reference_guard_falls_back_to_mock() {
        let mut config = config_fixture(GeneratorProvider::Bridge);
        config.bridge_url = "http://localhost:5000".to_string();
        let guarded = build_generator_client(&config, false).expect("guarded build");
        assert!(matches!(guarded, SelectedGenerator::Mock(_)));

        let clear = build_generator_client(&config_fixture(GeneratorProvider::Bridge), false)
            .expect("bridge builds");
        assert!(matches!(clear, SelectedGenerator::Bridged(_)));
    }

    #[test]
    fn unit_bridge_self_reference_detection_compares_port_and_host_class() {
        assert!(bridge_targets_own_bind("http://127.0.0.1:5000", "0.0.0.0", 5000));
        assert!(bridge_targets_own_bind(
            "http://localhost:5000/api",
            "127.0.0.1",
            5000
        ));
        assert!(!bridge_targets_own_bind("http://localhost:9000", "0.0.0.0", 5000));
        assert!(!bridge_targets_own_bind(
            "http://bridge.internal:5000",
            "0.0.0.0",
            5000
        ));
        assert!(!bridge_targets_own_bind("not a url", "0.0.0.0", 5000));
    }
}
