//! Data model shared by discovery, analysis and the final output records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

// ============================================================================
// Discovery
// ============================================================================

/// A link that scored high enough to be reported as a policy page.
///
/// Built once during link extraction and never mutated after scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePage {
    /// Normalized absolute URL
    pub url: Url,

    /// Anchor text of the first link that pointed here (may be empty)
    pub anchor_text: String,

    /// Depth of the page the link was found on (0 for the input URL itself)
    pub source_depth: u32,

    /// Classifier score for (url, anchor_text)
    pub classifier_score: f64,
}

/// Outcome of a single page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FetchStatus {
    Success,
    Timeout,
    /// Non-2xx response, or a transport error when `status` is `None`
    HttpError { status: Option<u16> },
    TooLarge,
    NonHtml,
    /// Redirect left the site or exceeded the hop cap
    BlockedRedirect,
}

impl FetchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchStatus::Success)
    }

    /// Human-readable explanation suitable for end users.
    pub fn describe(&self, host: &str) -> String {
        match self {
            FetchStatus::Success => format!("Fetched {} successfully.", host),
            FetchStatus::Timeout => format!(
                "Request timeout for {}. The server took too long to respond.",
                host
            ),
            FetchStatus::HttpError { status: None } => format!(
                "Connection failed to {}. The site may be down or unreachable.",
                host
            ),
            FetchStatus::HttpError {
                status: Some(code),
            } => match *code {
                403 => format!(
                    "Access denied by {}. The website blocks automated requests.",
                    host
                ),
                404 => format!(
                    "Page not found on {}. The URL may have changed or been removed.",
                    host
                ),
                429 => format!(
                    "Rate limited by {}. Too many requests, please try again later.",
                    host
                ),
                503 => format!(
                    "Service unavailable on {}. The website may be under maintenance.",
                    host
                ),
                400..=499 => format!(
                    "Client error when accessing {} (HTTP {}). The request was rejected.",
                    host, code
                ),
                500..=599 => format!(
                    "Server error on {} (HTTP {}). The website is experiencing technical issues.",
                    host, code
                ),
                _ => format!("HTTP error {} when accessing {}.", code, host),
            },
            FetchStatus::TooLarge => format!(
                "The page on {} is larger than the configured size limit.",
                host
            ),
            FetchStatus::NonHtml => format!("The page on {} is not an HTML document.", host),
            FetchStatus::BlockedRedirect => format!(
                "{} redirected outside the site or through too many hops.",
                host
            ),
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Success => write!(f, "success"),
            FetchStatus::Timeout => write!(f, "timeout"),
            FetchStatus::HttpError { status: Some(code) } => write!(f, "http_error ({})", code),
            FetchStatus::HttpError { status: None } => write!(f, "http_error (transport)"),
            FetchStatus::TooLarge => write!(f, "too_large"),
            FetchStatus::NonHtml => write!(f, "non_html"),
            FetchStatus::BlockedRedirect => write!(f, "blocked_redirect"),
        }
    }
}

/// Result of one fetch. `body` is present only on success.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: Url,
    /// URL after same-site redirects; equals `url` when there were none
    pub final_url: Url,
    pub status: FetchStatus,
    pub body: Option<String>,
    pub elapsed: Duration,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    pub fn success(url: Url, final_url: Url, body: String, elapsed: Duration) -> Self {
        Self {
            url,
            final_url,
            status: FetchStatus::Success,
            body: Some(body),
            elapsed,
            fetched_at: Utc::now(),
        }
    }

    pub fn failure(url: Url, status: FetchStatus, elapsed: Duration) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status,
            body: None,
            elapsed,
            fetched_at: Utc::now(),
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Which strategy produced an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMethod {
    /// The model read the policy URL itself
    Url,
    /// The model read text extracted from the policy page
    Text,
    /// No analysis was produced
    None,
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMethod::Url => write!(f, "url"),
            AnalysisMethod::Text => write!(f, "text"),
            AnalysisMethod::None => write!(f, "none"),
        }
    }
}

/// Rubric bucket for a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Ok,
    Neutral,
    Bad,
}

/// A single statement the model filed under a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricFinding {
    pub bucket: Bucket,
    pub statement: String,
}

/// Bucketed findings, in the order the model reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TermsAnalysis {
    pub ok: Vec<String>,
    pub neutral: Vec<String>,
    pub bad: Vec<String>,
}

impl TermsAnalysis {
    /// Statements for one bucket.
    pub fn bucket(&self, bucket: Bucket) -> &[String] {
        match bucket {
            Bucket::Ok => &self.ok,
            Bucket::Neutral => &self.neutral,
            Bucket::Bad => &self.bad,
        }
    }

    /// All findings, bucket by bucket.
    pub fn findings(&self) -> impl Iterator<Item = RubricFinding> + '_ {
        [Bucket::Ok, Bucket::Neutral, Bucket::Bad]
            .into_iter()
            .flat_map(move |bucket| {
                self.bucket(bucket).iter().map(move |statement| RubricFinding {
                    bucket,
                    statement: statement.clone(),
                })
            })
    }
}

/// Structured privacy assessment returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrivacyAnalysis {
    pub privacy_score: i64,
    pub score_explanation: String,
    pub terms_analysis: TermsAnalysis,
    pub data_selling: String,
    pub data_buyers: Vec<String>,
    pub data_storage: String,
    pub main_concerns: Vec<String>,
    pub user_rights: String,
    pub summary: String,
}

// ============================================================================
// Output records
// ============================================================================

/// Discovery-only response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsCheck {
    pub url: Url,
    pub has_terms: bool,
    pub found_terms_pages: Vec<Url>,

    /// Friendly explanation when the site itself could not be fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full analysis response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub url: Url,
    pub terms_urls: Vec<Url>,
    pub analysis: Option<PrivacyAnalysis>,
    pub analysis_method: AnalysisMethod,
    pub raw_analysis: Option<String>,
}
