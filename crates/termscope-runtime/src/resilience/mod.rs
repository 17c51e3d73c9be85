//! Per-request resilience for model calls.
//!
//! This module provides:
//! - A single bounded retry for transient stage failures
//! - Token usage and cost accounting for one request
//!
//! Nothing here is shared between requests.

mod retry;
mod usage;

pub use retry::RetryPolicy;
pub use usage::{LlmUsage, UsageTracker};
