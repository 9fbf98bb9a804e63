//! Layered configuration resolution for the Rho service.
//!
//! Merges environment overrides, the persisted credentials record, and the
//! defaults manifest into one cached snapshot consumed by the orchestrator.
//! Precedence is environment > credentials record > manifest > built-in
//! fallback, applied whole-layer-at-a-time: the environment layer only
//! participates when it supplies the tracker URL.

mod bootstrap;
mod provider;
mod records;
mod resolver;

pub use bootstrap::{update_from_credentials, write_credentials_file, CredentialsBootstrap};
pub use provider::GeneratorProvider;
pub use records::{CredentialsRecord, ManifestRecord, PromptTemplate};
pub use resolver::{
    ConfigError, ConfigResolver, ResolvedConfig, ENV_BRIDGE_URL, ENV_GENERATOR_API_KEY,
    ENV_GENERATOR_PROVIDER, ENV_RATE_LIMIT_PER_MINUTE, ENV_TRACKER_API_KEY, ENV_TRACKER_URL,
};
