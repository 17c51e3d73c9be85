//! The privacy scoring rubric.
//!
//! Bands:
//! - 90-100 excellent
//! - 70-89 good
//! - 50-69 moderate
//! - 30-49 poor
//! - 0-29 very poor
//!
//! Penalty triggers are matched against `bad` findings and reduce the score
//! from a ceiling of 100. Any external sharing additionally caps the score
//! below the good band. See [`RubricValidator`].

mod triggers;
mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use triggers::{contains_external_sharing, PenaltyTrigger};
pub use validator::{
    RubricAssessment, RubricValidator, TriggerHit, ADJUSTMENT_PREFIX, EXTERNAL_SHARING_CEILING,
};

/// Qualitative band for a privacy score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Moderate,
    Poor,
    VeryPoor,
}

impl ScoreBand {
    /// Band for a score; values outside 0..=100 fall into the nearest band.
    pub fn from_score(score: i64) -> Self {
        match score {
            90..=i64::MAX => ScoreBand::Excellent,
            70..=89 => ScoreBand::Good,
            50..=69 => ScoreBand::Moderate,
            30..=49 => ScoreBand::Poor,
            _ => ScoreBand::VeryPoor,
        }
    }

    /// Inclusive score range.
    pub fn range(&self) -> (i64, i64) {
        match self {
            ScoreBand::Excellent => (90, 100),
            ScoreBand::Good => (70, 89),
            ScoreBand::Moderate => (50, 69),
            ScoreBand::Poor => (30, 49),
            ScoreBand::VeryPoor => (0, 29),
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::Excellent => write!(f, "excellent"),
            ScoreBand::Good => write!(f, "good"),
            ScoreBand::Moderate => write!(f, "moderate"),
            ScoreBand::Poor => write!(f, "poor"),
            ScoreBand::VeryPoor => write!(f, "very poor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(ScoreBand::from_score(100), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(90), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(89), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(70), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(69), ScoreBand::Moderate);
        assert_eq!(ScoreBand::from_score(50), ScoreBand::Moderate);
        assert_eq!(ScoreBand::from_score(49), ScoreBand::Poor);
        assert_eq!(ScoreBand::from_score(30), ScoreBand::Poor);
        assert_eq!(ScoreBand::from_score(29), ScoreBand::VeryPoor);
        assert_eq!(ScoreBand::from_score(-3), ScoreBand::VeryPoor);
    }

    #[test]
    fn test_ranges_cover_every_score() {
        for score in 0..=100 {
            let (lo, hi) = ScoreBand::from_score(score).range();
            assert!(lo <= score && score <= hi);
        }
    }

    #[test]
    fn test_external_sharing_ceiling_is_below_good() {
        assert_eq!(
            ScoreBand::from_score(EXTERNAL_SHARING_CEILING),
            ScoreBand::Moderate
        );
    }
}
