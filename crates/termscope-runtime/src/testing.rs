//! In-memory fakes for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use termscope_core::{FetchResult, FetchStatus};
use url::Url;

use crate::fetch::{FetchLimits, Fetcher};
use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// Serves canned pages; anything unknown is a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<Url, (FetchStatus, Option<String>, Option<Url>)>,
    log: Mutex<Vec<Url>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, at: &str, html: &str) -> Self {
        self.pages
            .insert(url(at), (FetchStatus::Success, Some(html.to_string()), None));
        self
    }

    pub fn redirect(mut self, at: &str, to: &str, html: &str) -> Self {
        self.pages.insert(
            url(at),
            (FetchStatus::Success, Some(html.to_string()), Some(url(to))),
        );
        self
    }

    pub fn failing(mut self, at: &str, status: FetchStatus) -> Self {
        self.pages.insert(url(at), (status, None, None));
        self
    }

    pub fn fetched(&self) -> Vec<Url> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, target: &Url, _limits: &FetchLimits) -> FetchResult {
        self.log.lock().push(target.clone());
        match self.pages.get(target) {
            Some((FetchStatus::Success, Some(body), final_url)) => FetchResult::success(
                target.clone(),
                final_url.clone().unwrap_or_else(|| target.clone()),
                body.clone(),
                Duration::from_millis(1),
            ),
            Some((status, _, _)) => FetchResult::failure(target.clone(), *status, Duration::ZERO),
            None => FetchResult::failure(
                target.clone(),
                FetchStatus::HttpError { status: Some(404) },
                Duration::ZERO,
            ),
        }
    }
}

/// Counts drops of pending fetches.
pub struct DropGuard(pub Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fetcher whose calls never complete.
pub struct HangingFetcher {
    pub started: Arc<AtomicUsize>,
    pub dropped: Arc<AtomicUsize>,
}

#[async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, _url: &Url, _limits: &FetchLimits) -> FetchResult {
        let _guard = DropGuard(self.dropped.clone());
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<FetchResult>().await
    }
}

/// One scripted provider reply.
pub enum Reply {
    Text(&'static str),
    Fail(ProviderError),
    /// Never answers within any deadline
    Hang,
}

/// Replays scripted replies in order and records every call.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(Vec<ChatMessage>, bool)>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// `url_context` flag of each call, in order.
    pub fn modes(&self) -> Vec<bool> {
        self.calls.lock().iter().map(|(_, url)| *url).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|(messages, _)| messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.lock().push((messages, config.url_context));
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(CompletionResponse {
                content: text.to_string(),
                usage: TokenUsage {
                    prompt_tokens: 100,
                    completion_tokens: 50,
                    ..Default::default()
                },
                model: config.model.clone(),
                stop_reason: Some("STOP".to_string()),
            }),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(ProviderError::HttpError("script exhausted".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub const VALID_REPLY: &str = r#"{
  "privacy_score": 85,
  "score_explanation": "Limited collection.",
  "terms_analysis": {
    "ok": ["Users can export their data"],
    "neutral": ["Uses session cookies"],
    "bad": ["Shares data with advertising networks"]
  },
  "data_selling": "Shares with advertisers.",
  "data_buyers": ["Advertising networks"],
  "data_storage": "Stored in the EU for 1 year.",
  "main_concerns": ["Advertising sharing"],
  "user_rights": "Access, deletion, export.",
  "summary": "Mostly reasonable. Shares data with advertisers."
}"#;

pub const CLEAN_REPLY: &str = r#"{
  "privacy_score": 92,
  "score_explanation": "No external sharing.",
  "terms_analysis": {"ok": ["No third-party sharing"], "neutral": [], "bad": []},
  "data_selling": "No.",
  "data_buyers": [],
  "data_storage": "30 days.",
  "main_concerns": [],
  "user_rights": "Full deletion.",
  "summary": "Strong privacy. Minimal retention."
}"#;

/// Page with enough readable text for text-mode analysis.
pub const POLICY_PAGE: &str = r#"<html><head><title>Privacy</title></head><body>
<nav>Home | About</nav>
<main><h1>Privacy Policy</h1>
<p>We collect your email address and usage data to operate the service. We share
usage data with advertising partners. You may request deletion of your account at
any time by contacting support. Data is retained for twelve months.</p></main>
<footer>Copyright</footer></body></html>"#;
