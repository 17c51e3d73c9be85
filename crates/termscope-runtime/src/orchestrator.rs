//! Analysis orchestrator: the URL-mode -> text-mode -> none fallback chain.
//!
//! Each stage makes one model call under a deadline, retried once when the
//! failure is transient (timeout or an unparseable reply). Retries never
//! cross stages. Every accepted analysis passes through the
//! [`RubricValidator`] before it leaves this module.

use backon::Retryable;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use termscope_core::{
    parse_privacy_analysis, AnalysisMethod, ContentExtractor, FetchStatus, PrivacyAnalysis,
    RubricValidator, SchemaError,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AnalysisConfig;
use crate::fetch::{FetchLimits, Fetcher};
use crate::prompts::{text_prompt, url_prompt, SYSTEM_PROMPT};
use crate::providers::{ChatMessage, LlmProvider, ProviderError};
use crate::resilience::{LlmUsage, UsageTracker};

/// Fallback chain states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    TryUrl,
    TryText,
    Failed,
    Done,
}

/// Why one stage produced no analysis.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("model call failed: {0}")]
    Model(#[from] ProviderError),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model reply rejected: {0}")]
    Schema(#[from] SchemaError),

    #[error("content fetch failed: {0}")]
    Fetch(FetchStatus),

    #[error("page has only {chars} characters of text")]
    InsufficientContent { chars: usize },

    #[error("no candidate pages to analyze")]
    NoCandidates,
}

impl StageError {
    /// Worth one more attempt within the same stage.
    pub fn is_transient(&self) -> bool {
        match self {
            StageError::Timeout(_) | StageError::Schema(_) => true,
            StageError::Model(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// A failed stage, kept for logging and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub method: AnalysisMethod,
    pub error: String,
}

/// Everything the chain produced for one request.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: Option<PrivacyAnalysis>,
    pub method: AnalysisMethod,
    /// Last unparseable model reply, only when `analysis` is `None`
    pub raw_analysis: Option<String>,
    pub usage: LlmUsage,
    pub failures: Vec<StageFailure>,
}

/// Per-request scratch state.
struct Attempt {
    usage: UsageTracker,
    /// Latest model reply of the running stage
    reply: Mutex<Option<String>>,
}

pub struct AnalysisOrchestrator {
    provider: Arc<dyn LlmProvider>,
    fetcher: Arc<dyn Fetcher>,
    config: AnalysisConfig,
    content_limits: FetchLimits,
    validator: RubricValidator,
}

impl AnalysisOrchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        fetcher: Arc<dyn Fetcher>,
        config: AnalysisConfig,
        content_limits: FetchLimits,
    ) -> Self {
        Self {
            provider,
            fetcher,
            config,
            content_limits,
            validator: RubricValidator::new(),
        }
    }

    /// Run the fallback chain over ranked candidate URLs.
    pub async fn analyze(&self, candidates: &[Url]) -> AnalysisOutcome {
        let attempt = Attempt {
            usage: UsageTracker::new(),
            reply: Mutex::new(None),
        };
        let mut failures = Vec::new();
        let mut captured: Option<(AnalysisMethod, String)> = None;
        let mut analysis = None;
        let mut method = AnalysisMethod::None;

        let mut stage = if candidates.is_empty() {
            failures.push(StageFailure {
                method: AnalysisMethod::None,
                error: StageError::NoCandidates.to_string(),
            });
            Stage::Failed
        } else {
            Stage::TryUrl
        };

        loop {
            let current = match stage {
                Stage::TryUrl => AnalysisMethod::Url,
                Stage::TryText => AnalysisMethod::Text,
                Stage::Failed | Stage::Done => break,
            };

            let result = match stage {
                Stage::TryUrl => self.try_url(candidates, &attempt).await,
                _ => self.try_text(candidates, &attempt).await,
            };

            stage = match result {
                Ok(validated) => {
                    info!(method = %current, score = validated.privacy_score, "Analysis produced");
                    analysis = Some(validated);
                    method = current;
                    Stage::Done
                }
                Err(e) => {
                    warn!(method = %current, error = %e, "Analysis stage failed");
                    if let Some(reply) = attempt.reply.lock().take() {
                        captured = Some((current, reply));
                    }
                    failures.push(StageFailure {
                        method: current,
                        error: e.to_string(),
                    });
                    if stage == Stage::TryUrl {
                        Stage::TryText
                    } else {
                        Stage::Failed
                    }
                }
            };
            attempt.reply.lock().take();
        }

        let raw_analysis = match (&analysis, captured) {
            (None, Some((stage_method, reply))) => {
                method = stage_method;
                Some(reply)
            }
            _ => None,
        };

        AnalysisOutcome {
            analysis,
            method,
            raw_analysis,
            usage: attempt.usage.snapshot(),
            failures,
        }
    }

    async fn try_url(
        &self,
        candidates: &[Url],
        attempt: &Attempt,
    ) -> Result<PrivacyAnalysis, StageError> {
        let prompt = url_prompt(candidates);
        self.with_retry(AnalysisMethod::Url, || self.call_model(&prompt, true, attempt))
            .await
    }

    async fn try_text(
        &self,
        candidates: &[Url],
        attempt: &Attempt,
    ) -> Result<PrivacyAnalysis, StageError> {
        let target = candidates.first().ok_or(StageError::NoCandidates)?;

        let page = self.fetcher.fetch(target, &self.content_limits).await;
        if !page.status.is_success() {
            return Err(StageError::Fetch(page.status));
        }

        let content = ContentExtractor::new(self.config.max_text_chars)
            .extract_text(page.body.as_deref().unwrap_or_default());
        if content.original_chars < self.config.min_content_chars {
            return Err(StageError::InsufficientContent {
                chars: content.original_chars,
            });
        }
        debug!(
            url = %page.final_url,
            chars = content.original_chars,
            truncated = content.truncated,
            "Extracted policy text"
        );

        let prompt = text_prompt(&page.final_url, &content);
        self.with_retry(AnalysisMethod::Text, || self.call_model(&prompt, false, attempt))
            .await
    }

    async fn with_retry<F, Fut>(
        &self,
        method: AnalysisMethod,
        call: F,
    ) -> Result<PrivacyAnalysis, StageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PrivacyAnalysis, StageError>>,
    {
        call.retry(self.config.retry.backoff())
            .sleep(tokio::time::sleep)
            .when(StageError::is_transient)
            .notify(|e: &StageError, delay: Duration| {
                warn!(method = %method, error = %e, delay = ?delay, "Retrying analysis stage");
            })
            .await
    }

    /// One model call: deadline, usage accounting, strict parse, rubric.
    async fn call_model(
        &self,
        prompt: &str,
        url_context: bool,
        attempt: &Attempt,
    ) -> Result<PrivacyAnalysis, StageError> {
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let completion = self.config.completion_config(url_context);

        let response = match tokio::time::timeout(
            self.config.model_timeout,
            self.provider.complete(messages, &completion),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                attempt.usage.record_failure();
                return Err(e.into());
            }
            Err(_) => {
                attempt.usage.record_failure();
                return Err(StageError::Timeout(self.config.model_timeout));
            }
        };

        attempt.usage.record(&response.usage, &response.model);
        debug!(
            provider = self.provider.name(),
            model = %response.model,
            tokens = response.usage.total(),
            chars = response.content.len(),
            "Model replied"
        );
        *attempt.reply.lock() = Some(response.content.clone());

        let analysis = parse_privacy_analysis(&response.content).inspect_err(|e| {
            warn!(
                model = %response.model,
                stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
                error = %e,
                "Model reply rejected"
            );
        })?;
        Ok(self.validator.validate(analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::RetryPolicy;
    use crate::testing::{
        url, FakeFetcher, Reply, ScriptedProvider, CLEAN_REPLY, POLICY_PAGE, VALID_REPLY,
    };

    fn orchestrator(provider: Arc<ScriptedProvider>, fetcher: FakeFetcher) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(
            provider,
            Arc::new(fetcher),
            AnalysisConfig::default(),
            FetchLimits::default(),
        )
    }

    fn candidates() -> Vec<Url> {
        vec![
            url("https://example.com/privacy"),
            url("https://example.com/terms"),
        ]
    }

    fn policy_site() -> FakeFetcher {
        FakeFetcher::new().page("https://example.com/privacy", POLICY_PAGE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_mode_success_is_rubric_validated() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::Text(VALID_REPLY)]));
        let outcome = orchestrator(provider.clone(), policy_site())
            .analyze(&candidates())
            .await;

        let analysis = outcome.analysis.unwrap();
        assert_eq!(outcome.method, AnalysisMethod::Url);
        assert_eq!(analysis.privacy_score, 69);
        assert!(analysis.score_explanation.contains("Rubric adjustment:"));
        assert!(outcome.raw_analysis.is_none());
        assert_eq!(provider.modes(), vec![true]);
        assert_eq!(outcome.usage.llm_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_failure_falls_back_to_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::Fail(ProviderError::AuthError),
            Reply::Text(CLEAN_REPLY),
        ]));
        let outcome = orchestrator(provider.clone(), policy_site())
            .analyze(&candidates())
            .await;

        assert_eq!(outcome.method, AnalysisMethod::Text);
        assert_eq!(outcome.analysis.unwrap().privacy_score, 92);
        // Non-transient failures are not retried.
        assert_eq!(provider.modes(), vec![true, false]);
        assert!(provider.prompts()[1].contains("advertising partners"));
        assert!(!provider.prompts()[1].contains("Copyright"));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].method, AnalysisMethod::Url);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_reply_retried_once_within_stage() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::Text("{\"privacy_score\": 80}"),
            Reply::Text(CLEAN_REPLY),
        ]));
        let outcome = orchestrator(provider.clone(), policy_site())
            .analyze(&candidates())
            .await;

        assert_eq!(outcome.method, AnalysisMethod::Url);
        assert!(outcome.analysis.is_some());
        assert_eq!(provider.modes(), vec![true, true]);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_then_failed_fetch_yield_none() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::Hang, Reply::Hang]));
        let fetcher = FakeFetcher::new().failing("https://example.com/privacy", FetchStatus::Timeout);
        let outcome = orchestrator(provider.clone(), fetcher)
            .analyze(&candidates())
            .await;

        assert!(outcome.analysis.is_none());
        assert_eq!(outcome.method, AnalysisMethod::None);
        assert!(outcome.raw_analysis.is_none());
        assert_eq!(provider.call_count(), 2);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.usage.llm_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_json_reply_is_preserved_as_raw() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::Text("I cannot access that page."),
            Reply::Text("I cannot access that page."),
            Reply::Text("The policy looks fine overall."),
            Reply::Text("The policy looks fine overall."),
        ]));
        let outcome = orchestrator(provider.clone(), policy_site())
            .analyze(&candidates())
            .await;

        assert!(outcome.analysis.is_none());
        assert_eq!(outcome.method, AnalysisMethod::Text);
        assert_eq!(
            outcome.raw_analysis.as_deref(),
            Some("The policy looks fine overall.")
        );
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_raw_reply_from_url_stage_kept_when_text_stage_never_calls_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::Text("not json"),
            Reply::Text("still not json"),
        ]));
        let fetcher = FakeFetcher::new().failing(
            "https://example.com/privacy",
            FetchStatus::HttpError { status: Some(503) },
        );
        let outcome = orchestrator(provider, fetcher).analyze(&candidates()).await;

        assert!(outcome.analysis.is_none());
        assert_eq!(outcome.method, AnalysisMethod::Url);
        assert_eq!(outcome.raw_analysis.as_deref(), Some("still not json"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_comes_from_config() {
        let replies = || {
            vec![
                Reply::Text("not json"),
                Reply::Text("not json"),
                Reply::Text("not json"),
                Reply::Text(CLEAN_REPLY),
            ]
        };

        let no_retry = AnalysisConfig {
            retry: RetryPolicy {
                max_retries: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let provider = Arc::new(ScriptedProvider::new(replies()));
        let outcome = AnalysisOrchestrator::new(
            provider.clone(),
            Arc::new(policy_site()),
            no_retry,
            FetchLimits::default(),
        )
        .analyze(&candidates())
        .await;
        assert_eq!(provider.modes(), vec![true, false]);
        assert!(outcome.analysis.is_none());

        let patient = AnalysisConfig {
            retry: RetryPolicy {
                delay: Duration::from_secs(2),
                max_retries: 3,
            },
            ..Default::default()
        };
        let provider = Arc::new(ScriptedProvider::new(replies()));
        let start = tokio::time::Instant::now();
        let outcome = AnalysisOrchestrator::new(
            provider.clone(),
            Arc::new(policy_site()),
            patient,
            FetchLimits::default(),
        )
        .analyze(&candidates())
        .await;
        assert_eq!(outcome.method, AnalysisMethod::Url);
        assert_eq!(provider.modes(), vec![true, true, true, true]);
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Reply::Fail(ProviderError::RateLimited { retry_after: None }),
            Reply::Fail(ProviderError::RateLimited { retry_after: None }),
        ]));
        let outcome = orchestrator(provider.clone(), policy_site())
            .analyze(&candidates())
            .await;

        assert!(outcome.analysis.is_none());
        assert_eq!(outcome.method, AnalysisMethod::None);
        assert_eq!(provider.modes(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_thin_page_is_not_analyzed() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::Fail(ProviderError::AuthError)]));
        let fetcher = FakeFetcher::new().page("https://example.com/privacy", "<p>Loading...</p>");
        let outcome = orchestrator(provider.clone(), fetcher)
            .analyze(&candidates())
            .await;

        assert!(outcome.analysis.is_none());
        assert_eq!(provider.call_count(), 1);
        assert!(outcome.failures[1].error.contains("characters"));
    }

    #[tokio::test]
    async fn test_no_candidates_makes_no_calls() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::Text(CLEAN_REPLY)]));
        let outcome = orchestrator(provider.clone(), policy_site()).analyze(&[]).await;

        assert!(outcome.analysis.is_none());
        assert_eq!(outcome.method, AnalysisMethod::None);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(outcome.usage, LlmUsage::default());
    }

    #[test]
    fn test_transient_classification() {
        assert!(StageError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(StageError::Schema(SchemaError::NoJson).is_transient());
        assert!(StageError::Model(ProviderError::Timeout(Duration::from_secs(1))).is_transient());
        assert!(!StageError::Model(ProviderError::AuthError).is_transient());
        assert!(!StageError::Fetch(FetchStatus::Timeout).is_transient());
        assert!(!StageError::NoCandidates.is_transient());
    }
}
