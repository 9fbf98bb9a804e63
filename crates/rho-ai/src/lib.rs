//! Generator client abstraction for the Rho service.
//!
//! Exposes the three-method capability contract the orchestrator depends
//! on, the concrete hosted/bridged/mock backends behind it, and the factory
//! that selects one from the resolved configuration.

mod bridged;
mod factory;
mod hosted;
mod mock;
mod types;

pub use bridged::{BridgedClient, BridgedConfig};
pub use factory::{build_generator_client, SelectedGenerator};
pub use hosted::{HostedKeyClient, HostedKeyConfig, DEFAULT_HOSTED_API_BASE};
pub use mock::MockClient;
pub use types::{GeneratedIssue, GeneratorClient, GeneratorError, IssueAnalysis, IssueUpdate};
