//! # termscope-core
//!
//! Deterministic building blocks for policy-page discovery and privacy scoring.
//!
//! This crate answers, without touching the network:
//! - Which links on a page look like terms of service or privacy policies?
//! - What readable text does a policy page contain?
//! - Is a model-produced privacy score consistent with its own findings?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: classification and rubric checks are pure functions
//! 2. **No LLM calls**: model output is only parsed and validated here
//! 3. **Strict parsing**: model replies must match the `PrivacyAnalysis` schema exactly
//! 4. **Bounded scores**: a validated score is always within the rubric ceiling
//!
//! ## Example
//!
//! ```rust,ignore
//! use termscope_core::{parse_privacy_analysis, RubricValidator};
//!
//! let analysis = parse_privacy_analysis(&model_reply)?;
//! let analysis = RubricValidator::new().validate(analysis);
//! assert!(analysis.privacy_score <= 100);
//! ```

pub mod assemble;
pub mod classifier;
pub mod content;
pub mod links;
pub mod origin;
pub mod response;
pub mod rubric;
pub mod types;

// Re-export main types at crate root
pub use assemble::ResultAssembler;
pub use classifier::{
    CandidateClassifier, ClassifierConfig, ClassifierError, MatchLocation, ScoreBreakdown,
    TermMatch, WeightedTerm,
};
pub use content::{page_headings, ContentExtractor, ExtractedText, TRUNCATION_MARKER};
pub use links::{extract_links, ExtractedLink};
pub use origin::{normalize_url, parse_input_url, SiteScope, UrlError};
pub use response::{parse_privacy_analysis, SchemaError};
pub use rubric::{
    contains_external_sharing, PenaltyTrigger, RubricAssessment, RubricValidator, ScoreBand,
    TriggerHit, ADJUSTMENT_PREFIX, EXTERNAL_SHARING_CEILING,
};
pub use types::{
    AnalysisMethod, AnalysisResult, Bucket, CandidatePage, FetchResult, FetchStatus,
    PrivacyAnalysis, RubricFinding, TermsAnalysis, TermsCheck,
};
