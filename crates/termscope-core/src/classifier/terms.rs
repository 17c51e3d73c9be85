//! Default weighted term table.
//!
//! Weights are (path, anchor). Phrases stack with their component words, so
//! "Privacy Policy" earns the phrase weight plus "privacy" plus "policy".
//! Terms are written already normalized: lowercase, unaccented, with
//! punctuation replaced by spaces.

use super::WeightedTerm;

const DEFAULT_TERMS: &[(&str, f64, f64)] = &[
    // English phrases
    ("privacy policy", 40.0, 35.0),
    ("privacy notice", 40.0, 35.0),
    ("privacy statement", 40.0, 35.0),
    ("terms of service", 40.0, 35.0),
    ("terms of use", 40.0, 35.0),
    ("terms and conditions", 40.0, 35.0),
    ("terms conditions", 40.0, 35.0),
    ("data policy", 35.0, 30.0),
    ("data protection", 35.0, 30.0),
    ("cookie policy", 30.0, 25.0),
    ("cookies policy", 30.0, 25.0),
    ("cookie notice", 30.0, 25.0),
    ("user agreement", 30.0, 25.0),
    ("legal notice", 25.0, 20.0),
    // English words
    ("privacy", 30.0, 25.0),
    ("gdpr", 30.0, 25.0),
    ("ccpa", 25.0, 20.0),
    ("terms", 25.0, 20.0),
    ("legal", 20.0, 15.0),
    ("cookie", 20.0, 15.0),
    ("conditions", 15.0, 12.0),
    ("agreement", 10.0, 8.0),
    ("policy", 10.0, 8.0),
    ("policies", 10.0, 8.0),
    // French phrases
    ("politique de confidentialite", 40.0, 35.0),
    ("conditions generales", 40.0, 35.0),
    ("conditions d utilisation", 40.0, 35.0),
    ("mentions legales", 40.0, 35.0),
    ("politique des donnees", 35.0, 30.0),
    ("donnees personnelles", 30.0, 25.0),
    ("politique des cookies", 30.0, 25.0),
    ("gestion des cookies", 25.0, 20.0),
    // French words
    ("confidentialite", 30.0, 25.0),
    ("rgpd", 30.0, 25.0),
    ("cgu", 30.0, 25.0),
    ("cgv", 25.0, 20.0),
    ("politique", 10.0, 8.0),
    // Generic navigation
    ("contact", -15.0, -15.0),
    ("about", -10.0, -10.0),
    ("help", -10.0, -10.0),
    ("support", -10.0, -10.0),
    ("news", -15.0, -15.0),
    ("blog", -15.0, -15.0),
    ("careers", -20.0, -20.0),
    ("jobs", -20.0, -20.0),
    ("press", -15.0, -15.0),
    ("media", -10.0, -10.0),
    ("investor", -15.0, -15.0),
];

/// The built-in term table.
pub fn default_terms() -> Vec<WeightedTerm> {
    DEFAULT_TERMS
        .iter()
        .map(|&(term, path_weight, anchor_weight)| WeightedTerm {
            term: term.to_string(),
            path_weight,
            anchor_weight,
        })
        .collect()
}
