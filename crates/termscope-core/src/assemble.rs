//! Final output records.
//!
//! Pure composition of discovery and analysis outputs; no decisions are made
//! here.

use url::Url;

use crate::types::{AnalysisMethod, AnalysisResult, CandidatePage, PrivacyAnalysis, TermsCheck};

pub struct ResultAssembler;

impl ResultAssembler {
    /// Discovery-only record.
    pub fn terms_check(url: &Url, candidates: &[CandidatePage], error: Option<String>) -> TermsCheck {
        TermsCheck {
            url: url.clone(),
            has_terms: !candidates.is_empty(),
            found_terms_pages: candidates.iter().map(|c| c.url.clone()).collect(),
            error,
        }
    }

    /// Full analysis record.
    pub fn analysis_result(
        url: &Url,
        candidates: &[CandidatePage],
        analysis: Option<PrivacyAnalysis>,
        analysis_method: AnalysisMethod,
        raw_analysis: Option<String>,
    ) -> AnalysisResult {
        AnalysisResult {
            url: url.clone(),
            terms_urls: candidates.iter().map(|c| c.url.clone()).collect(),
            analysis,
            analysis_method,
            raw_analysis,
        }
    }
}
