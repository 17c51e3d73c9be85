//! Rubric enforcement for model-produced analyses.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::triggers::{contains_external_sharing, PenaltyTrigger};
use super::ScoreBand;
use crate::types::PrivacyAnalysis;

/// Highest score allowed once any external sharing is reported.
pub const EXTERNAL_SHARING_CEILING: i64 = 69;

/// Prefix of every note appended to `score_explanation`.
pub const ADJUSTMENT_PREFIX: &str = "Rubric adjustment:";

/// A trigger matched by one or more `bad` findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerHit {
    pub trigger: PenaltyTrigger,
    /// Number of distinct `bad` findings that matched
    pub matches: usize,
    pub penalty: i64,
}

/// What the rubric allows for a given set of findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricAssessment {
    pub hits: Vec<TriggerHit>,
    pub total_penalty: i64,
    pub external_sharing: bool,
    /// Highest rubric-consistent score
    pub ceiling: i64,
}

impl RubricAssessment {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.ceiling)
    }

    fn reason(&self) -> String {
        let mut parts: Vec<String> = self
            .hits
            .iter()
            .map(|hit| format!("{} -{}", hit.trigger, hit.penalty))
            .collect();
        if self.external_sharing {
            parts.push(format!(
                "external sharing caps the score at {}",
                EXTERNAL_SHARING_CEILING
            ));
        }
        parts.join("; ")
    }
}

/// Recomputes the rubric from the model's own `bad` findings and keeps the
/// published score within it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RubricValidator;

impl RubricValidator {
    pub fn new() -> Self {
        Self
    }

    /// Apply penalty triggers and the hard ceiling to `analysis`'s findings.
    pub fn assess(&self, analysis: &PrivacyAnalysis) -> RubricAssessment {
        let bad = distinct(&analysis.terms_analysis.bad);

        let hits: Vec<TriggerHit> = PenaltyTrigger::ALL
            .into_iter()
            .filter_map(|trigger| {
                let matches = bad.iter().filter(|s| trigger.matches(s)).count();
                (matches > 0).then(|| TriggerHit {
                    trigger,
                    matches,
                    penalty: trigger.penalty_for(matches),
                })
            })
            .collect();

        let total_penalty: i64 = hits.iter().map(|h| h.penalty).sum();
        let external_sharing = bad.iter().any(|s| contains_external_sharing(s));

        let mut ceiling = (100 - total_penalty).clamp(0, 100);
        if external_sharing {
            ceiling = ceiling.min(EXTERNAL_SHARING_CEILING);
        }

        RubricAssessment {
            hits,
            total_penalty,
            external_sharing,
            ceiling,
        }
    }

    /// Return `analysis` with a rubric-consistent score.
    ///
    /// A score outside 0..=100 is clamped; a score above the ceiling is
    /// lowered to it. Either change is documented in `score_explanation`.
    /// `data_buyers` is de-duplicated case-insensitively.
    pub fn validate(&self, mut analysis: PrivacyAnalysis) -> PrivacyAnalysis {
        let assessment = self.assess(&analysis);
        let reported = analysis.privacy_score;
        let mut score = reported;
        let mut notes = Vec::new();

        if !(0..=100).contains(&score) {
            score = score.clamp(0, 100);
            notes.push(format!(
                "reported score {} is outside 0-100 and was clamped to {}.",
                reported, score
            ));
        }

        if score > assessment.ceiling {
            notes.push(format!(
                "score lowered from {} to {} ({}).",
                score,
                assessment.ceiling,
                assessment.reason()
            ));
            score = assessment.ceiling;
        }

        if !notes.is_empty() {
            tracing::info!(
                reported,
                adjusted = score,
                ceiling = assessment.ceiling,
                external_sharing = assessment.external_sharing,
                "Rubric override applied"
            );
            let note = format!("{} {}", ADJUSTMENT_PREFIX, notes.join(" "));
            let explanation = analysis.score_explanation.trim_end();
            analysis.score_explanation = if explanation.is_empty() {
                note
            } else {
                format!("{} {}", explanation, note)
            };
            analysis.privacy_score = score;
        }

        analysis.data_buyers = dedup_case_insensitive(analysis.data_buyers);
        analysis
    }
}

fn distinct(statements: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    statements
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.trim().to_lowercase()))
        .collect()
}
