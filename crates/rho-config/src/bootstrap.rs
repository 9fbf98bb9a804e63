use std::path::{Path, PathBuf};

use rho_core::write_text_atomic;

use crate::provider::GeneratorProvider;
use crate::records::{load_toml_record, CredentialsRecord};
use crate::resolver::{
    normalized, ConfigError, ConfigResolver, DEFAULT_BRIDGE_URL, DEFAULT_RATE_LIMIT_PER_MINUTE,
};

/// Inputs for creating a starter credentials record.
#[derive(Debug, Clone)]
pub struct CredentialsBootstrap {
    pub tracker_url: String,
    pub tracker_api_key: String,
    pub bridge_url: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
}

fn example_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".example");
    PathBuf::from(name)
}

fn render_record(record: &CredentialsRecord) -> Result<String, ConfigError> {
    toml::to_string_pretty(record).map_err(|error| ConfigError::Persist(error.to_string()))
}

/// Writes a credentials record atomically, plus a `.example` sibling with
/// placeholder values when one does not already exist.
pub fn write_credentials_file(
    path: &Path,
    bootstrap: &CredentialsBootstrap,
) -> Result<(), ConfigError> {
    let record = CredentialsRecord {
        tracker_url: Some(bootstrap.tracker_url.clone()),
        tracker_api_key: Some(bootstrap.tracker_api_key.clone()),
        generator_provider: Some(GeneratorProvider::default().as_str().to_string()),
        generator_api_key: None,
        bridge_url: Some(
            bootstrap
                .bridge_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string()),
        ),
        rate_limit_per_minute: Some(
            bootstrap
                .rate_limit_per_minute
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE),
        ),
    };
    write_text_atomic(path, &render_record(&record)?)
        .map_err(|error| ConfigError::Persist(error.to_string()))?;

    let example_path = example_sibling(path);
    if !example_path.exists() {
        let example = CredentialsRecord {
            tracker_url: Some("https://tracker.example.com".to_string()),
            tracker_api_key: Some("your_tracker_api_key_here".to_string()),
            generator_provider: Some(GeneratorProvider::default().as_str().to_string()),
            generator_api_key: None,
            bridge_url: Some(DEFAULT_BRIDGE_URL.to_string()),
            rate_limit_per_minute: Some(DEFAULT_RATE_LIMIT_PER_MINUTE),
        };
        write_text_atomic(example_path.as_path(), &render_record(&example)?)
            .map_err(|error| ConfigError::Persist(error.to_string()))?;
    }

    tracing::info!(path = %path.display(), "credentials record written");
    Ok(())
}

/// Re-validates the persisted credentials record and invalidates the cached
/// snapshot so the next resolution observes the record.
pub fn update_from_credentials(resolver: &ConfigResolver) -> Result<(), ConfigError> {
    let record: CredentialsRecord = load_toml_record(resolver.credentials_path())
        .ok_or(ConfigError::ConfigurationMissing("credentials record"))?;

    if normalized(record.tracker_url).is_none() {
        return Err(ConfigError::ConfigurationMissing("tracker_url"));
    }
    if normalized(record.tracker_api_key).is_none() {
        return Err(ConfigError::ConfigurationMissing("tracker_api_key"));
    }

    resolver.invalidate();
    tracing::info!("configuration reloaded from credentials record");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{update_from_credentials, write_credentials_file, CredentialsBootstrap};
    use crate::records::{load_toml_record, CredentialsRecord};
    use crate::resolver::{ConfigError, ConfigResolver};

    fn bootstrap_fixture() -> CredentialsBootstrap {
        CredentialsBootstrap {
            tracker_url: "https://tracker.example.com".to_string(),
            tracker_api_key: "bootstrap-key".to_string(),
            bridge_url: None,
            rate_limit_per_minute: Some(12),
        }
    }

    #[test]
    fn functional_write_credentials_file_creates_record_and_example() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("credentials.toml");

        write_credentials_file(path.as_path(), &bootstrap_fixture()).expect("write record");

        let record: CredentialsRecord =
            load_toml_record(path.as_path()).expect("record parses back");
        assert_eq!(
            record.tracker_url.as_deref(),
            Some("https://tracker.example.com")
        );
        assert_eq!(record.rate_limit_per_minute, Some(12));
        assert_eq!(record.bridge_url.as_deref(), Some("http://localhost:9000"));
        assert!(temp.path().join("credentials.toml.example").exists());
    }

    #[test]
    fn unit_update_from_credentials_requires_record_and_key() {
        let temp = tempfile::tempdir().expect("tempdir");
        let credentials_path = temp.path().join("credentials.toml");
        let resolver =
            ConfigResolver::new(credentials_path.clone(), temp.path().join("manifest.toml"));

        assert!(matches!(
            update_from_credentials(&resolver),
            Err(ConfigError::ConfigurationMissing("credentials record"))
        ));

        std::fs::write(
            credentials_path.as_path(),
            "tracker_url = \"https://tracker.example.com\"\n",
        )
        .expect("write partial record");
        assert!(matches!(
            update_from_credentials(&resolver),
            Err(ConfigError::ConfigurationMissing("tracker_api_key"))
        ));
    }

    #[test]
    fn functional_update_from_credentials_invalidates_cached_snapshot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let credentials_path = temp.path().join("credentials.toml");
        let resolver =
            ConfigResolver::new(credentials_path.clone(), temp.path().join("manifest.toml"));

        write_credentials_file(credentials_path.as_path(), &bootstrap_fixture())
            .expect("initial record");
        let first = resolver.get().expect("first resolve");
        assert_eq!(first.rate_limit_per_minute, 12);

        let updated = CredentialsBootstrap {
            rate_limit_per_minute: Some(3),
            ..bootstrap_fixture()
        };
        write_credentials_file(credentials_path.as_path(), &updated).expect("updated record");
        update_from_credentials(&resolver).expect("reload");

        let second = resolver.get().expect("second resolve");
        assert_eq!(second.rate_limit_per_minute, 3);
    }
}
