//! The request-level entry point.
//!
//! ```rust,ignore
//! let scope = TermsScope::builder().config(config).build()?;
//! let check = scope.check_terms("example.com").await?;
//! let result = scope.analyze("https://example.com").await?;
//! ```
//!
//! Both calls return a complete record for any well-formed input URL; a
//! malformed URL is the only error.

use std::sync::Arc;
use termscope_core::{
    parse_input_url, AnalysisMethod, AnalysisResult, ResultAssembler, TermsCheck, UrlError,
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::config::{ConfigError, RuntimeConfig};
use crate::crawl::{CrawlOrchestrator, CrawlReport};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::orchestrator::{AnalysisOrchestrator, AnalysisOutcome};
use crate::providers::{build_provider, LlmProvider, ProviderError};
use crate::resilience::LlmUsage;

/// Errors from building or calling [`TermsScope`].
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("LLM provider unavailable: {0}")]
    Provider(#[from] ProviderError),

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Analysis requires an LLM provider; this instance was built for discovery only")]
    AnalysisUnavailable,
}

/// A full analysis record plus per-request diagnostics.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub crawl: CrawlReport,
    pub usage: LlmUsage,
}

/// Discovery and analysis for one site per call. Holds no per-request state.
pub struct TermsScope {
    crawler: CrawlOrchestrator,
    analyzer: Option<AnalysisOrchestrator>,
}

impl TermsScope {
    pub fn builder() -> TermsScopeBuilder {
        TermsScopeBuilder::default()
    }

    /// Discover policy pages for `input`.
    pub async fn check_terms(&self, input: &str) -> Result<TermsCheck, RuntimeError> {
        let url = parse_input_url(input)?;
        let report = self.crawler.run(&url).await;
        Ok(ResultAssembler::terms_check(
            &url,
            &report.candidates,
            report.home_failure_message(),
        ))
    }

    /// Discover policy pages for `input` and analyze them.
    pub async fn analyze(&self, input: &str) -> Result<AnalysisResult, RuntimeError> {
        Ok(self.analyze_with_report(input).await?.result)
    }

    /// [`analyze`](Self::analyze) with the crawl report and model usage.
    pub async fn analyze_with_report(&self, input: &str) -> Result<AnalysisReport, RuntimeError> {
        let analyzer = self
            .analyzer
            .as_ref()
            .ok_or(RuntimeError::AnalysisUnavailable)?;
        let url = parse_input_url(input)?;

        let crawl = self.crawler.run(&url).await;
        let targets: Vec<Url> = crawl.candidates.iter().map(|c| c.url.clone()).collect();

        let outcome = if targets.is_empty() {
            info!(url = %url, "No policy pages found, skipping analysis");
            AnalysisOutcome {
                analysis: None,
                method: AnalysisMethod::None,
                raw_analysis: None,
                usage: LlmUsage::default(),
                failures: Vec::new(),
            }
        } else {
            analyzer.analyze(&targets).await
        };

        for failure in &outcome.failures {
            warn!(url = %url, method = %failure.method, error = %failure.error, "Stage failure");
        }

        let result = ResultAssembler::analysis_result(
            &url,
            &crawl.candidates,
            outcome.analysis,
            outcome.method,
            outcome.raw_analysis,
        );

        Ok(AnalysisReport {
            result,
            crawl,
            usage: outcome.usage,
        })
    }
}

/// Builder for [`TermsScope`].
#[derive(Default)]
pub struct TermsScopeBuilder {
    config: RuntimeConfig,
    provider: Option<Arc<dyn LlmProvider>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    discovery_only: bool,
}

impl TermsScopeBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this provider instead of one built from `config.provider`.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use this fetcher instead of an [`HttpFetcher`].
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Skip provider setup; [`TermsScope::analyze`] will fail.
    pub fn discovery_only(mut self) -> Self {
        self.discovery_only = true;
        self
    }

    pub fn build(self) -> Result<TermsScope, RuntimeError> {
        let config = self.config;
        config.validate()?;

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(
                HttpFetcher::new(&config.fetch).map_err(|e| RuntimeError::Client(e.to_string()))?,
            ),
        };

        let crawler = CrawlOrchestrator::new(
            fetcher.clone(),
            config.build_classifier()?,
            config.crawl.clone(),
            config.crawl_limits(),
        );

        let analyzer = if self.discovery_only {
            None
        } else {
            let provider = match self.provider {
                Some(provider) => provider,
                None => build_provider(&config.provider)?,
            };
            Some(AnalysisOrchestrator::new(
                provider,
                fetcher,
                config.analysis.clone(),
                config.content_limits(),
            ))
        };

        Ok(TermsScope { crawler, analyzer })
    }
}
