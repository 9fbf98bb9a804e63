//! REST client for the issue tracker the Rho service mutates.
//!
//! Covers issue reads and writes, project and metadata lookups, and the
//! availability probe the health report uses. Constructed without an API
//! key the client stays read-only and refuses writes before any HTTP.

mod client;
mod types;

pub use client::{TrackerClient, TrackerConfig, DEFAULT_LIST_LIMIT};
pub use types::{IssueChanges, IssueFilter, NewIssue, TrackerError};
