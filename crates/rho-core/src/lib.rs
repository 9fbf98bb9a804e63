//! Shared filesystem and time primitives for the Rho workspace.
//!
//! Provides atomic whole-file writes for configuration records, durable
//! single-line appends for the audit log, and a Unix-time helper used by
//! the rate-limit windows.

mod durable_io;
mod time_utils;

pub use durable_io::{append_jsonl_line, write_text_atomic};
pub use time_utils::current_unix_timestamp;
