//! Policy-page discovery.
//!
//! Level-synchronous breadth-first crawl from the origin page:
//! - every page of one level is fetched with bounded concurrency
//! - links scoring above the follow threshold form the next level
//! - links scoring above the report threshold become candidates
//!
//! A normalized URL is fetched at most once per crawl, no page deeper than
//! `max_depth` is fetched, and the total number of fetches never exceeds
//! `max_pages_fetched`.

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use termscope_core::{
    extract_links, normalize_url, page_headings, CandidateClassifier, CandidatePage, FetchResult,
    FetchStatus, SiteScope,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::fetch::{FetchLimits, Fetcher};

/// Well-known policy locations tried when link discovery finds nothing.
pub const COMMON_POLICY_PATHS: &[&str] = &[
    // English
    "/privacy",
    "/privacy-policy",
    "/privacy-notice",
    "/terms",
    "/terms-of-service",
    "/terms-and-conditions",
    "/tos",
    "/legal",
    "/legal-notice",
    "/cookies",
    "/cookie-policy",
    // French
    "/mentions-legales",
    "/politique-confidentialite",
    "/politique-de-confidentialite",
    "/confidentialite",
    "/donnees-personnelles",
    "/politique-cookies",
    "/conditions-generales",
    "/conditions-utilisation",
    "/cgu",
    "/cgv",
    // Nested
    "/legal/privacy",
    "/legal/terms",
    "/fr/mentions-legales",
];

/// A page that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub url: Url,
    pub depth: u32,
    pub status: FetchStatus,
}

/// Outcome of one discovery run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub origin: Url,
    /// Ranked by score, then depth, then discovery order
    pub candidates: Vec<CandidatePage>,
    pub pages_fetched: usize,
    pub failures: Vec<PageFailure>,
    /// Set when the origin page itself could not be fetched
    pub home_failure: Option<FetchStatus>,
}

impl CrawlReport {
    /// End-user explanation of why nothing could be crawled.
    pub fn home_failure_message(&self) -> Option<String> {
        let host = self.origin.host_str().unwrap_or_default();
        self.home_failure.map(|status| status.describe(host))
    }
}

struct FrontierEntry {
    url: Url,
    score: f64,
}

/// Candidates in discovery order, unique by URL after redirects.
#[derive(Default)]
struct Found {
    pages: Vec<CandidatePage>,
    urls: HashSet<Url>,
    /// Requested URL to the URL it redirected to
    redirects: HashMap<Url, Url>,
}

impl Found {
    fn insert(&mut self, mut page: CandidatePage) {
        if let Some(target) = self.redirects.get(&page.url) {
            page.url = target.clone();
        }
        if self.urls.insert(page.url.clone()) {
            debug!(url = %page.url, score = page.classifier_score, depth = page.source_depth, "Candidate found");
            self.pages.push(page);
        }
    }

    /// Record that `from` redirected to `to`, folding any candidate for
    /// `from` into the one for `to`.
    fn redirected(&mut self, from: Url, to: Url) {
        if from == to {
            return;
        }
        if self.urls.remove(&from) {
            if let Some(index) = self.pages.iter().position(|p| p.url == from) {
                let mut page = self.pages.remove(index);
                match self.pages.iter_mut().find(|p| p.url == to) {
                    Some(existing) => {
                        if page.classifier_score > existing.classifier_score {
                            existing.classifier_score = page.classifier_score;
                            existing.anchor_text = page.anchor_text;
                        }
                        existing.source_depth = existing.source_depth.min(page.source_depth);
                    }
                    None => {
                        debug!(from = %from, to = %to, "Candidate redirected");
                        page.url = to.clone();
                        self.urls.insert(to.clone());
                        self.pages.insert(index, page);
                    }
                }
            }
        }
        self.redirects.insert(from, to);
    }

    fn len(&self) -> usize {
        self.pages.len()
    }

    fn into_ranked(mut self, max_results: usize) -> Vec<CandidatePage> {
        // Stable, so ties keep discovery order.
        self.pages.sort_by(|a, b| {
            b.classifier_score
                .total_cmp(&a.classifier_score)
                .then(a.source_depth.cmp(&b.source_depth))
        });
        self.pages.truncate(max_results);
        self.pages
    }
}

/// Runs discovery crawls. Holds no per-request state.
pub struct CrawlOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    classifier: CandidateClassifier,
    config: CrawlConfig,
    limits: FetchLimits,
}

impl CrawlOrchestrator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        classifier: CandidateClassifier,
        config: CrawlConfig,
        limits: FetchLimits,
    ) -> Self {
        Self {
            fetcher,
            classifier,
            config,
            limits,
        }
    }

    /// Discover with the configured bounds.
    pub async fn run(&self, origin: &Url) -> CrawlReport {
        self.discover(
            origin,
            self.config.max_depth,
            self.config.max_pages_fetched,
            self.config.max_results,
        )
        .await
    }

    /// Crawl from `origin` and rank the policy pages found.
    ///
    /// Depth counts fetched levels: the origin page is depth 1, so the
    /// default `max_depth` of 2 fetches the home page and one hop.
    pub async fn discover(
        &self,
        origin: &Url,
        max_depth: u32,
        max_pages_fetched: usize,
        max_results: usize,
    ) -> CrawlReport {
        let origin = normalize_url(origin);
        let scope = SiteScope::new(&origin).with_allowed_hosts(&self.config.allowed_hosts);

        let mut found = Found::default();
        let mut failures = Vec::new();
        let mut home_failure = None;
        let mut home_reached = false;
        let mut pages_fetched = 0;

        let origin_score = self.classifier.score(&origin, "");
        if self.classifier.is_policy(origin_score) {
            found.insert(CandidatePage {
                url: origin.clone(),
                anchor_text: String::new(),
                source_depth: 0,
                classifier_score: origin_score,
            });
        }

        let mut seen: HashSet<Url> = HashSet::from([origin.clone()]);
        let mut frontier = vec![FrontierEntry {
            url: origin.clone(),
            score: origin_score,
        }];

        for depth in 1..=max_depth {
            if frontier.is_empty()
                || pages_fetched >= max_pages_fetched
                || found.len() >= max_results
            {
                break;
            }
            frontier.truncate(max_pages_fetched - pages_fetched);
            debug!(depth, pages = frontier.len(), "Fetching level");

            let results = self.fetch_all(frontier.iter().map(|e| &e.url)).await;
            pages_fetched += results.len();

            let mut next = Vec::new();
            for result in results {
                if !result.status.is_success() {
                    warn!(url = %result.url, depth, status = %result.status, "Page fetch failed");
                    if depth == 1 {
                        home_failure = Some(result.status);
                    }
                    failures.push(PageFailure {
                        url: result.url,
                        depth,
                        status: result.status,
                    });
                    continue;
                }
                if depth == 1 {
                    home_reached = true;
                }

                let final_url = normalize_url(&result.final_url);
                seen.insert(final_url.clone());
                found.redirected(normalize_url(&result.url), final_url);
                let Some(body) = result.body.as_deref() else {
                    continue;
                };

                for link in extract_links(body, &result.final_url, &scope) {
                    let score = self.classifier.score(&link.url, &link.anchor_text);
                    if self.classifier.is_policy(score) {
                        found.insert(CandidatePage {
                            url: link.url.clone(),
                            anchor_text: link.anchor_text.clone(),
                            source_depth: depth,
                            classifier_score: score,
                        });
                    }
                    if depth < max_depth
                        && self.classifier.should_follow(score)
                        && seen.insert(link.url.clone())
                    {
                        next.push(FrontierEntry {
                            url: link.url,
                            score,
                        });
                    }
                }
            }

            next.sort_by(|a, b| b.score.total_cmp(&a.score));
            frontier = next;
        }

        if found.pages.is_empty()
            && home_reached
            && self.config.probe_common_paths
            && max_depth >= 2
            && pages_fetched < max_pages_fetched
        {
            pages_fetched += self
                .probe_common_paths(&origin, &mut seen, &mut found, max_pages_fetched - pages_fetched)
                .await;
        }

        let candidates = found.into_ranked(max_results);
        info!(
            origin = %origin,
            pages_fetched,
            candidates = candidates.len(),
            failures = failures.len(),
            "Discovery finished"
        );

        CrawlReport {
            origin,
            candidates,
            pages_fetched,
            failures,
            home_failure,
        }
    }

    /// Fetch well-known policy paths; returns the number of fetches made.
    async fn probe_common_paths(
        &self,
        origin: &Url,
        seen: &mut HashSet<Url>,
        found: &mut Found,
        budget: usize,
    ) -> usize {
        let probes: Vec<Url> = COMMON_POLICY_PATHS
            .iter()
            .filter_map(|path| origin.join(path).ok())
            .map(|url| normalize_url(&url))
            .filter(|url| seen.insert(url.clone()))
            .take(budget)
            .collect();
        debug!(origin = %origin, probes = probes.len(), "No policy links found, probing common paths");

        let results = self.fetch_all(probes.iter()).await;
        let fetched = results.len();

        for result in results {
            if !result.status.is_success() {
                debug!(url = %result.url, status = %result.status, "Probe missed");
                continue;
            }
            let final_url = normalize_url(&result.final_url);
            if final_url == *origin {
                continue;
            }
            seen.insert(final_url.clone());

            let headings = result.body.as_deref().map(page_headings).unwrap_or_default();
            if !self.classifier.should_follow(self.classifier.score_text(&headings)) {
                debug!(url = %final_url, headings = %headings, "Page at common path is not a policy page");
                continue;
            }

            let label = probe_label(result.url.path());
            let score = self.classifier.score(&final_url, label);
            if self.classifier.is_policy(score) {
                found.insert(CandidatePage {
                    url: final_url,
                    anchor_text: label.to_string(),
                    source_depth: 1,
                    classifier_score: score,
                });
            }
        }

        fetched
    }

    /// Fetch in order with bounded concurrency.
    async fn fetch_all<'a>(&self, urls: impl Iterator<Item = &'a Url>) -> Vec<FetchResult> {
        stream::iter(urls)
            .map(|url| self.fetcher.fetch(url, &self.limits))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }
}

/// Synthetic anchor text for a probed path.
fn probe_label(path: &str) -> &'static str {
    let path = path.to_ascii_lowercase();
    if path.contains("privacy") || path.contains("confidentialite") || path.contains("donnees") {
        "Privacy Policy"
    } else if path.contains("cookie") {
        "Cookie Policy"
    } else if path.contains("mentions") {
        "Mentions Legales"
    } else if ["terms", "condition", "cgu", "cgv", "tos"]
        .iter()
        .any(|t| path.contains(t))
    {
        "Terms & Conditions"
    } else {
        "Legal Notice"
    }
}
