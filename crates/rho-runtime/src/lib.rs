//! Orchestration runtime for the Rho service.
//!
//! Owns the per-resource rate limiter, the service context threaded into
//! every operation, the issue mutation orchestrator, and the service
//! health probe.

mod context;
mod health;
mod orchestrator;
mod rate_limit;

pub use context::ServiceContext;
pub use health::{service_health, HealthReport, ServiceHealth};
pub use orchestrator::{
    analyze_issue, create_issue, update_issue, OrchestratorError, GENERATOR_RESOURCE,
    TRACKER_RESOURCE,
};
pub use rate_limit::{RateLimiter, WINDOW_SECONDS};
