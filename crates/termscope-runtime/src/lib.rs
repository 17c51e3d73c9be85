//! # termscope-runtime
//!
//! Network-facing half of termscope: crawling a site for its privacy policy
//! and terms pages, then asking an LLM to score them against the privacy
//! rubric.
//!
//! Deterministic pieces (classification, text extraction, strict parsing and
//! rubric enforcement) live in `termscope-core`; this crate adds:
//! - [`HttpFetcher`]: bounded, same-site page fetching
//! - [`CrawlOrchestrator`]: depth- and budget-bounded discovery
//! - [`AnalysisOrchestrator`]: URL-mode -> text-mode -> none fallback chain
//! - [`TermsScope`]: the request-level facade
//!
//! Each call owns its own frontier, dedup set and buffers. Dropping a
//! returned future cancels its in-flight fetches and model call.
//!
//! ## Example
//!
//! ```rust,ignore
//! use termscope_runtime::{RuntimeConfig, TermsScope};
//!
//! let scope = TermsScope::builder()
//!     .config(RuntimeConfig::from_file("termscope.yaml")?)
//!     .build()?;
//! let result = scope.analyze("example.com").await?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! ```

pub mod config;
pub mod crawl;
pub mod fetch;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod resilience;

#[cfg(test)]
mod testing;

pub use config::{
    AnalysisConfig, ConfigError, CrawlConfig, FetchConfig, ProviderConfig, RuntimeConfig,
};
pub use crawl::{CrawlOrchestrator, CrawlReport, PageFailure, COMMON_POLICY_PATHS};
pub use fetch::{FetchLimits, Fetcher, HttpFetcher};
pub use orchestrator::{AnalysisOrchestrator, AnalysisOutcome, Stage, StageError, StageFailure};
pub use pipeline::{AnalysisReport, RuntimeError, TermsScope, TermsScopeBuilder};
pub use providers::{
    build_provider, ChatMessage, CompletionConfig, CompletionResponse, GeminiProvider,
    LlmProvider, ProviderError, TokenUsage,
};
pub use resilience::{LlmUsage, RetryPolicy};
