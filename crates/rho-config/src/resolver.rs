use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::provider::GeneratorProvider;
use crate::records::{load_toml_record, CredentialsRecord, ManifestRecord, PromptTemplate};

pub const ENV_TRACKER_URL: &str = "RHO_TRACKER_URL";
pub const ENV_TRACKER_API_KEY: &str = "RHO_TRACKER_API_KEY";
pub const ENV_GENERATOR_PROVIDER: &str = "RHO_GENERATOR_PROVIDER";
pub const ENV_GENERATOR_API_KEY: &str = "RHO_GENERATOR_API_KEY";
pub const ENV_BRIDGE_URL: &str = "RHO_BRIDGE_URL";
pub const ENV_RATE_LIMIT_PER_MINUTE: &str = "RHO_RATE_LIMIT_PER_MINUTE";

pub(crate) const DEFAULT_BRIDGE_URL: &str = "http://localhost:9000";
pub(crate) const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;
const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_BIND_PORT: u16 = 5000;
const DEFAULT_PROJECT_ID: u64 = 1;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Typed failures surfaced by configuration resolution and persistence.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required configuration value `{0}` is missing")]
    ConfigurationMissing(&'static str),
    #[error("failed to persist configuration record: {0}")]
    Persist(String),
}

/// Authoritative configuration snapshot, rebuilt only on invalidation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub tracker_url: String,
    pub tracker_api_key: Option<String>,
    pub generator_provider: GeneratorProvider,
    pub generator_api_key: Option<String>,
    pub bridge_url: String,
    pub rate_limit_per_minute: u32,
    pub bind_host: String,
    pub bind_port: u16,
    pub default_project_id: u64,
    pub request_timeout_ms: u64,
    pub prompt_templates: BTreeMap<String, PromptTemplate>,
}

/// Environment layer; only constructed when the tracker URL override is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EnvOverrides {
    pub tracker_url: String,
    pub tracker_api_key: Option<String>,
    pub generator_provider: Option<String>,
    pub generator_api_key: Option<String>,
    pub bridge_url: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
}

pub(crate) fn normalized(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Builds the environment layer from raw candidates. Returns `None` when
/// the tracker URL candidate is absent, which drops the layer as a whole:
/// the remaining candidates are then ignored, never blended per-field into
/// the file layers.
pub(crate) fn env_layer_from_candidates(
    tracker_url: Option<String>,
    tracker_api_key: Option<String>,
    generator_provider: Option<String>,
    generator_api_key: Option<String>,
    bridge_url: Option<String>,
    rate_limit_per_minute: Option<String>,
) -> Option<EnvOverrides> {
    let tracker_url = normalized(tracker_url)?;
    Some(EnvOverrides {
        tracker_url,
        tracker_api_key: normalized(tracker_api_key),
        generator_provider: normalized(generator_provider),
        generator_api_key: normalized(generator_api_key),
        bridge_url: normalized(bridge_url),
        rate_limit_per_minute: normalized(rate_limit_per_minute)
            .and_then(|raw| raw.parse::<u32>().ok()),
    })
}

fn env_layer_from_process() -> Option<EnvOverrides> {
    let read = |name: &str| std::env::var(name).ok();
    env_layer_from_candidates(
        read(ENV_TRACKER_URL),
        read(ENV_TRACKER_API_KEY),
        read(ENV_GENERATOR_PROVIDER),
        read(ENV_GENERATOR_API_KEY),
        read(ENV_BRIDGE_URL),
        read(ENV_RATE_LIMIT_PER_MINUTE),
    )
}

pub(crate) fn merge_layers(
    env: Option<EnvOverrides>,
    credentials: Option<CredentialsRecord>,
    manifest: Option<ManifestRecord>,
) -> Result<ResolvedConfig, ConfigError> {
    let credentials = credentials.unwrap_or_default();
    let manifest = manifest.unwrap_or_default();

    let tracker_url = env
        .as_ref()
        .map(|layer| layer.tracker_url.clone())
        .or_else(|| normalized(credentials.tracker_url.clone()))
        .ok_or(ConfigError::ConfigurationMissing("tracker_url"))?;

    let tracker_api_key = env
        .as_ref()
        .and_then(|layer| layer.tracker_api_key.clone())
        .or_else(|| normalized(credentials.tracker_api_key.clone()));

    let provider_tag = env
        .as_ref()
        .and_then(|layer| layer.generator_provider.clone())
        .or_else(|| normalized(credentials.generator_provider.clone()));
    let generator_provider = GeneratorProvider::parse_or_default(provider_tag.as_deref());

    let generator_api_key = env
        .as_ref()
        .and_then(|layer| layer.generator_api_key.clone())
        .or_else(|| normalized(credentials.generator_api_key.clone()));

    let bridge_url = env
        .as_ref()
        .and_then(|layer| layer.bridge_url.clone())
        .or_else(|| normalized(credentials.bridge_url.clone()))
        .or_else(|| normalized(manifest.bridge_url.clone()))
        .unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string());

    let rate_limit_per_minute = env
        .as_ref()
        .and_then(|layer| layer.rate_limit_per_minute)
        .or(credentials.rate_limit_per_minute)
        .or(manifest.rate_limit_per_minute)
        .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE);

    Ok(ResolvedConfig {
        tracker_url,
        tracker_api_key,
        generator_provider,
        generator_api_key,
        bridge_url,
        rate_limit_per_minute,
        bind_host: normalized(manifest.bind_host.clone())
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
        bind_port: manifest.bind_port.unwrap_or(DEFAULT_BIND_PORT),
        default_project_id: manifest.default_project_id.unwrap_or(DEFAULT_PROJECT_ID),
        request_timeout_ms: manifest.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        prompt_templates: manifest.prompt_templates,
    })
}

/// Resolver owning the record paths and the cached snapshot.
///
/// Constructed once at the service root and threaded into callers; never a
/// process-wide global, so each test can build an isolated instance.
#[derive(Debug)]
pub struct ConfigResolver {
    credentials_path: PathBuf,
    manifest_path: PathBuf,
    cached: RwLock<Option<Arc<ResolvedConfig>>>,
}

impl ConfigResolver {
    pub fn new(credentials_path: impl Into<PathBuf>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            manifest_path: manifest_path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn credentials_path(&self) -> &Path {
        self.credentials_path.as_path()
    }

    /// Returns the cached snapshot, resolving the layers on first access.
    pub fn get(&self) -> Result<Arc<ResolvedConfig>, ConfigError> {
        if let Ok(guard) = self.cached.read() {
            if let Some(snapshot) = guard.as_ref() {
                return Ok(Arc::clone(snapshot));
            }
        }

        let resolved = Arc::new(merge_layers(
            env_layer_from_process(),
            load_toml_record::<CredentialsRecord>(self.credentials_path.as_path()),
            load_toml_record::<ManifestRecord>(self.manifest_path.as_path()),
        )?);

        if let Ok(mut guard) = self.cached.write() {
            // First stored snapshot wins; consecutive readers see one value.
            if let Some(existing) = guard.as_ref() {
                return Ok(Arc::clone(existing));
            }
            *guard = Some(Arc::clone(&resolved));
        }
        Ok(resolved)
    }

    /// Drops the cached snapshot so the next `get` re-reads every layer.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
    }

    /// Looks up a named prompt template from the defaults manifest.
    pub fn prompt_template(&self, name: &str) -> Result<Option<PromptTemplate>, ConfigError> {
        let snapshot = self.get()?;
        Ok(snapshot.prompt_templates.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        env_layer_from_candidates, merge_layers, ConfigError, ConfigResolver, EnvOverrides,
    };
    use crate::provider::GeneratorProvider;
    use crate::records::{CredentialsRecord, ManifestRecord};

    fn credentials_fixture() -> CredentialsRecord {
        CredentialsRecord {
            tracker_url: Some("https://tracker.example.com".to_string()),
            tracker_api_key: Some("record-key".to_string()),
            generator_provider: Some("hosted".to_string()),
            generator_api_key: Some("hosted-key".to_string()),
            bridge_url: Some("http://localhost:9100".to_string()),
            rate_limit_per_minute: Some(7),
        }
    }

    #[test]
    fn unit_merge_layers_fails_without_tracker_url_anywhere() {
        let result = merge_layers(None, None, Some(ManifestRecord::default()));
        assert!(matches!(
            result,
            Err(ConfigError::ConfigurationMissing("tracker_url"))
        ));
    }

    #[test]
    fn unit_merge_layers_applies_built_in_fallbacks() {
        let credentials = CredentialsRecord {
            tracker_url: Some("https://tracker.example.com".to_string()),
            ..CredentialsRecord::default()
        };
        let resolved = merge_layers(None, Some(credentials), None).expect("resolves");

        assert_eq!(resolved.bridge_url, "http://localhost:9000");
        assert_eq!(resolved.rate_limit_per_minute, 60);
        assert_eq!(resolved.bind_host, "0.0.0.0");
        assert_eq!(resolved.bind_port, 5000);
        assert_eq!(resolved.default_project_id, 1);
        assert_eq!(resolved.generator_provider, GeneratorProvider::Bridge);
        assert!(resolved.tracker_api_key.is_none());
    }

    #[test]
    fn functional_credentials_layer_overrides_manifest_values() {
        let manifest = ManifestRecord {
            bridge_url: Some("http://manifest:9000".to_string()),
            rate_limit_per_minute: Some(120),
            ..ManifestRecord::default()
        };
        let resolved =
            merge_layers(None, Some(credentials_fixture()), Some(manifest)).expect("resolves");

        assert_eq!(resolved.bridge_url, "http://localhost:9100");
        assert_eq!(resolved.rate_limit_per_minute, 7);
        assert_eq!(resolved.generator_provider, GeneratorProvider::Hosted);
    }

    #[test]
    fn functional_env_layer_fields_fall_through_when_unset_within_layer() {
        // Tracker URL set, rate budget absent from the environment layer:
        // the URL must come from the environment while the budget falls to
        // the credentials record.
        let env = EnvOverrides {
            tracker_url: "https://env.example.com".to_string(),
            ..EnvOverrides::default()
        };
        let resolved =
            merge_layers(Some(env), Some(credentials_fixture()), None).expect("resolves");

        assert_eq!(resolved.tracker_url, "https://env.example.com");
        assert_eq!(resolved.rate_limit_per_minute, 7);
        assert_eq!(resolved.tracker_api_key.as_deref(), Some("record-key"));
    }

    #[test]
    fn unit_env_layer_is_dropped_entirely_without_tracker_url() {
        let layer = env_layer_from_candidates(
            None,
            Some("env-key".to_string()),
            Some("mock".to_string()),
            None,
            Some("http://env:9000".to_string()),
            Some("3".to_string()),
        );
        assert!(layer.is_none());
    }

    #[test]
    fn unit_env_layer_parses_rate_budget_and_trims_values() {
        let layer = env_layer_from_candidates(
            Some("  https://env.example.com  ".to_string()),
            Some("   ".to_string()),
            None,
            None,
            None,
            Some("15".to_string()),
        )
        .expect("layer present");

        assert_eq!(layer.tracker_url, "https://env.example.com");
        assert!(layer.tracker_api_key.is_none());
        assert_eq!(layer.rate_limit_per_minute, Some(15));
    }

    #[test]
    fn regression_unknown_provider_tag_in_record_coerces_to_default() {
        let credentials = CredentialsRecord {
            tracker_url: Some("https://tracker.example.com".to_string()),
            generator_provider: Some("claude-desktop".to_string()),
            ..CredentialsRecord::default()
        };
        let resolved = merge_layers(None, Some(credentials), None).expect("resolves");
        assert_eq!(resolved.generator_provider, GeneratorProvider::Bridge);
    }

    #[test]
    fn functional_resolver_caches_until_invalidated() {
        let temp = tempfile::tempdir().expect("tempdir");
        let credentials_path = temp.path().join("credentials.toml");
        let manifest_path = temp.path().join("manifest.toml");
        std::fs::write(
            credentials_path.as_path(),
            "tracker_url = \"https://first.example.com\"\n",
        )
        .expect("write credentials");

        let resolver = ConfigResolver::new(credentials_path.clone(), manifest_path);
        let first = resolver.get().expect("first resolve");
        assert_eq!(first.tracker_url, "https://first.example.com");

        std::fs::write(
            credentials_path.as_path(),
            "tracker_url = \"https://second.example.com\"\n",
        )
        .expect("rewrite credentials");

        let second = resolver.get().expect("cached resolve");
        assert_eq!(second.tracker_url, "https://first.example.com");
        assert!(std::sync::Arc::ptr_eq(&first, &second));

        resolver.invalidate();
        let third = resolver.get().expect("resolve after invalidate");
        assert_eq!(third.tracker_url, "https://second.example.com");
    }

    #[test]
    fn functional_prompt_template_lookup_reads_manifest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let credentials_path = temp.path().join("credentials.toml");
        let manifest_path = temp.path().join("manifest.toml");
        std::fs::write(
            credentials_path.as_path(),
            "tracker_url = \"https://tracker.example.com\"\n",
        )
        .expect("write credentials");
        std::fs::write(
            manifest_path.as_path(),
            r#"
[prompt_templates.triage]
description = "Classify an incoming report"
template = "Classify: {report}"
"#,
        )
        .expect("write manifest");

        let resolver = ConfigResolver::new(credentials_path, manifest_path);
        let template = resolver
            .prompt_template("triage")
            .expect("resolves")
            .expect("template present");
        assert_eq!(template.template, "Classify: {report}");
        assert!(resolver
            .prompt_template("unknown")
            .expect("resolves")
            .is_none());
    }
}
