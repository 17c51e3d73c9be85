//! Bounded page fetching.
//!
//! A fetch never returns `Err`: every failure is a [`FetchStatus`] on the
//! returned [`FetchResult`], so one bad page never aborts a crawl.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION};
use std::time::{Duration, Instant};
use termscope_core::{FetchResult, FetchStatus, SiteScope};
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;

/// Content types treated as readable pages.
const TEXT_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml", "text/plain"];

/// Per-call bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchLimits {
    /// Whole-call deadline, redirects and body included
    pub timeout: Duration,
    pub max_bytes: usize,
    pub max_redirects: usize,
    /// Hosts a redirect may land on besides the requested site
    pub allowed_hosts: Vec<String>,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_bytes: 2 * 1024 * 1024,
            max_redirects: 5,
            allowed_hosts: Vec::new(),
        }
    }
}

/// Retrieves one page under the given limits.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, limits: &FetchLimits) -> FetchResult;
}

/// reqwest-backed fetcher. Redirects are followed manually so each hop can be
/// checked against the requested site.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,text/plain;q=0.8,*/*;q=0.5",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,fr;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }

    async fn fetch_body(&self, url: &Url, limits: &FetchLimits) -> Result<(Url, String), FetchStatus> {
        let scope = SiteScope::new(url).with_allowed_hosts(&limits.allowed_hosts);
        let mut current = url.clone();
        let mut hops = 0;

        let mut response = loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| transport_status(&e))?;

            if !response.status().is_redirection() {
                break response;
            }

            let status = response.status().as_u16();
            let next = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|location| current.join(location));
            let next = match next {
                Some(Ok(next)) => next,
                Some(Err(_)) => return Err(FetchStatus::BlockedRedirect),
                // 304 and friends without a target
                None => return Err(FetchStatus::HttpError { status: Some(status) }),
            };

            hops += 1;
            if hops > limits.max_redirects || !scope.contains(&next) {
                debug!(from = %current, to = %next, hops, "Redirect blocked");
                return Err(FetchStatus::BlockedRedirect);
            }
            current = next;
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchStatus::HttpError {
                status: Some(status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        if !is_text_content_type(content_type) {
            return Err(FetchStatus::NonHtml);
        }

        if response
            .content_length()
            .is_some_and(|len| len > limits.max_bytes as u64)
        {
            return Err(FetchStatus::TooLarge);
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_status(&e))? {
            if body.len() + chunk.len() > limits.max_bytes {
                return Err(FetchStatus::TooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        Ok((current, String::from_utf8_lossy(&body).into_owned()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, limits: &FetchLimits) -> FetchResult {
        let started = Instant::now();

        match tokio::time::timeout(limits.timeout, self.fetch_body(url, limits)).await {
            Ok(Ok((final_url, body))) => {
                FetchResult::success(url.clone(), final_url, body, started.elapsed())
            }
            Ok(Err(status)) => {
                debug!(url = %url, status = %status, "Fetch failed");
                FetchResult::failure(url.clone(), status, started.elapsed())
            }
            Err(_) => {
                debug!(url = %url, timeout = ?limits.timeout, "Fetch timed out");
                FetchResult::failure(url.clone(), FetchStatus::Timeout, started.elapsed())
            }
        }
    }
}

fn transport_status(e: &reqwest::Error) -> FetchStatus {
    if e.is_timeout() {
        FetchStatus::Timeout
    } else {
        FetchStatus::HttpError { status: None }
    }
}

/// A missing content type is treated as HTML.
fn is_text_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || TEXT_CONTENT_TYPES.contains(&mime.as_str())
}
