//! Candidate classification for discovered links.
//!
//! A link is scored from two sources: its URL path and its anchor text. Each
//! [`WeightedTerm`] in the table carries a separate weight for each source,
//! with path matches weighted higher. Negative weights demote generic
//! navigation such as "contact" or "careers". The table is plain data so it
//! can be loaded from configuration and tuned without touching crawl logic.
//!
//! Two thresholds turn a score into decisions:
//! - `follow_threshold`: worth fetching to look for more links (a "Legal" hub)
//! - `report_threshold`: likely a policy page itself
//!
//! Both comparisons are strict: a score must exceed the threshold.

mod terms;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use terms::default_terms;

/// A term and its contribution to a link score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub path_weight: f64,
    pub anchor_weight: f64,
}

/// Term table plus decision thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub terms: Vec<WeightedTerm>,
    pub follow_threshold: f64,
    pub report_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            terms: default_terms(),
            follow_threshold: 15.0,
            report_threshold: 40.0,
        }
    }
}

/// Errors from an invalid classifier configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Term table is empty")]
    EmptyTable,

    #[error("Term at index {0} is blank after normalization")]
    BlankTerm(usize),

    #[error("Weights for term '{0}' must be finite")]
    NonFiniteWeight(String),

    #[error("follow_threshold ({follow}) must not exceed report_threshold ({report})")]
    ThresholdOrder { follow: f64, report: f64 },
}

/// Where a term matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchLocation {
    Path,
    Anchor,
}

/// One matched term and the weight it contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermMatch {
    pub term: String,
    pub location: MatchLocation,
    pub weight: f64,
}

/// Score with the matches that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub matches: Vec<TermMatch>,
    pub follow: bool,
    pub report: bool,
}

#[derive(Debug, Clone)]
struct CompiledTerm {
    term: String,
    needle: String,
    path_weight: f64,
    anchor_weight: f64,
}

/// Scores (url, anchor text) pairs against a weighted term table.
///
/// Scoring is a pure function of its inputs and the table.
#[derive(Debug, Clone)]
pub struct CandidateClassifier {
    terms: Vec<CompiledTerm>,
    follow_threshold: f64,
    report_threshold: f64,
}

impl Default for CandidateClassifier {
    fn default() -> Self {
        Self::compile(ClassifierConfig::default())
    }
}

impl CandidateClassifier {
    /// Build a classifier, rejecting unusable tables.
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        validate_config(&config)?;
        Ok(Self::compile(config))
    }

    fn compile(config: ClassifierConfig) -> Self {
        let terms = config
            .terms
            .into_iter()
            .map(|t| CompiledTerm {
                needle: normalize_text(&t.term),
                term: t.term,
                path_weight: t.path_weight,
                anchor_weight: t.anchor_weight,
            })
            .filter(|t| !t.needle.is_empty())
            .collect();

        Self {
            terms,
            follow_threshold: config.follow_threshold,
            report_threshold: config.report_threshold,
        }
    }

    /// Likelihood score for a link; never negative.
    pub fn score(&self, url: &Url, anchor_text: &str) -> f64 {
        self.raw_score(url, anchor_text, |_| {})
    }

    /// Score free text, such as a page title, with the anchor weights.
    pub fn score_text(&self, text: &str) -> f64 {
        let text = normalize_text(text);
        self.terms
            .iter()
            .filter(|term| contains_term(&text, &term.needle))
            .map(|term| term.anchor_weight)
            .sum::<f64>()
            .max(0.0)
    }

    /// Score plus the individual matches, for inspection and tuning.
    pub fn explain(&self, url: &Url, anchor_text: &str) -> ScoreBreakdown {
        let mut matches = Vec::new();
        let score = self.raw_score(url, anchor_text, |m| matches.push(m));
        ScoreBreakdown {
            score,
            matches,
            follow: self.should_follow(score),
            report: self.is_policy(score),
        }
    }

    fn raw_score(&self, url: &Url, anchor_text: &str, mut on_match: impl FnMut(TermMatch)) -> f64 {
        let path = normalize_text(&decoded_path(url));
        let anchor = normalize_text(anchor_text);

        let mut total = 0.0;
        for term in &self.terms {
            if contains_term(&path, &term.needle) {
                total += term.path_weight;
                on_match(TermMatch {
                    term: term.term.clone(),
                    location: MatchLocation::Path,
                    weight: term.path_weight,
                });
            }
            if contains_term(&anchor, &term.needle) {
                total += term.anchor_weight;
                on_match(TermMatch {
                    term: term.term.clone(),
                    location: MatchLocation::Anchor,
                    weight: term.anchor_weight,
                });
            }
        }

        total.max(0.0)
    }

    /// Worth fetching to look for more links.
    pub fn should_follow(&self, score: f64) -> bool {
        score > self.follow_threshold
    }

    /// Likely a policy page.
    pub fn is_policy(&self, score: f64) -> bool {
        score > self.report_threshold
    }

    pub fn follow_threshold(&self) -> f64 {
        self.follow_threshold
    }

    pub fn report_threshold(&self) -> f64 {
        self.report_threshold
    }
}

fn validate_config(config: &ClassifierConfig) -> Result<(), ClassifierError> {
    if config.terms.is_empty() {
        return Err(ClassifierError::EmptyTable);
    }
    for (index, term) in config.terms.iter().enumerate() {
        if normalize_text(&term.term).is_empty() {
            return Err(ClassifierError::BlankTerm(index));
        }
        if !term.path_weight.is_finite() || !term.anchor_weight.is_finite() {
            return Err(ClassifierError::NonFiniteWeight(term.term.clone()));
        }
    }
    if config.follow_threshold > config.report_threshold {
        return Err(ClassifierError::ThresholdOrder {
            follow: config.follow_threshold,
            report: config.report_threshold,
        });
    }
    Ok(())
}

fn decoded_path(url: &Url) -> String {
    let path = url.path();
    urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Lowercase, strip common Latin accents and turn punctuation into single
/// spaces, so "Mentions Légales", "mentions-legales" and
/// "mentions_legales" all read "mentions legales".
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut gap = false;

    for ch in text.chars().flat_map(char::to_lowercase).map(fold_accent) {
        if ch.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push(' ');
            }
            gap = false;
            out.push(ch);
        } else {
            gap = true;
        }
    }

    out
}

fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ÿ' | 'ý' => 'y',
        other => other,
    }
}

/// Word-prefix match: `needle` must start at the beginning of a word.
fn contains_term(haystack: &str, needle: &str) -> bool {
    haystack
        .match_indices(needle)
        .any(|(i, _)| i == 0 || haystack.as_bytes()[i - 1] == b' ')
}
